//! One fetch, parse, probe and aggregate cycle

use crate::error::{FetchFailure, PipelineError};
use crate::proxy::fetcher::ListFetcher;
use crate::proxy::models::{EndpointDescriptor, Feed};
use crate::proxy::parser::{EntryParser, ParseStats};
use crate::proxy::probe::{ProbeEngine, RelayProber, RunOutcome};
use crate::proxy::run::RunToken;
use crate::proxy::sink::RenderSink;
use crate::Config;
use log::{error, info};
use std::sync::Arc;

/// Fetcher and probe engine wired together
pub struct Pipeline {
    fetcher: ListFetcher,
    engine: ProbeEngine,
}

impl Pipeline {
    pub fn new(fetcher: ListFetcher, engine: ProbeEngine) -> Self {
        Self { fetcher, engine }
    }

    /// Build the HTTP-backed pipeline described by `config`
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let fetcher = ListFetcher::with_config(config.fetcher.clone())?;
        let prober = RelayProber::new(&config.relay_probe_endpoint, config.fetcher.use_system_proxy)?;
        let engine = ProbeEngine::new(config.probe.clone(), Arc::new(prober));
        Ok(Self::new(fetcher, engine))
    }

    pub fn engine(&self) -> &ProbeEngine {
        &self.engine
    }

    /// Fetch a feed and parse it, without probing
    pub async fn fetch_descriptors(
        &self,
        feed: &Feed,
    ) -> Result<(Vec<EndpointDescriptor>, ParseStats), FetchFailure> {
        let text = self.fetcher.fetch_list(&feed.url).await?;
        let (descriptors, stats) = EntryParser::parse_with_stats(&text);
        info!(
            "Parsed {} from {}: {} lines, {} recognized, {} excluded, {} without host/port",
            descriptors.len(),
            feed.name,
            stats.total_lines,
            stats.recognized,
            stats.excluded,
            stats.unresolved
        );
        Ok((descriptors, stats))
    }

    /// Run the whole cycle for `feed` under `token`
    ///
    /// A fetch failure is reported to the sink and returned; every other
    /// failure only shows up in the counts.
    pub async fn run<S: RenderSink + Send>(
        &self,
        feed: &Feed,
        token: &RunToken,
        sink: &mut S,
    ) -> Result<RunOutcome, PipelineError> {
        let run_id = token.id();
        sink.status(run_id, &format!("Fetching {} list from {}...", feed.kind, feed.name));

        let descriptors = match self.fetch_descriptors(feed).await {
            Ok((descriptors, _)) => descriptors,
            Err(e) => {
                error!("Run {}: {}", run_id, e);
                if token.is_current() {
                    sink.status(run_id, &format!("Failed to fetch the {} list.", feed.kind));
                }
                return Err(e.into());
            }
        };

        if token.is_current() {
            sink.status(run_id, &format!("Checking {} endpoints...", descriptors.len()));
        }

        let outcome = self.engine.run(descriptors, token, sink).await;

        if !outcome.cancelled {
            let summary = outcome.aggregator.summary();
            let message = if summary.total == 0 {
                "No working endpoints found. Try again in a few minutes.".to_string()
            } else {
                format!("{} working endpoints found", summary.total)
            };
            sink.status(run_id, &message);
        }

        Ok(outcome)
    }
}
