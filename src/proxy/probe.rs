//! Probe engine measuring rough reachability latency
//!
//! A probe is a timing signal only: the endpoint's `http://host:port` is
//! requested through a CORS relay and the wall-clock time until the relay
//! answers is recorded. Relay latency and target latency are conflated, so
//! the number is an approximate heuristic, never a health check.

use crate::error::ProbeError;
use crate::proxy::aggregator::ResultAggregator;
use crate::proxy::fetcher::{relay_url, DEFAULT_USER_AGENT};
use crate::proxy::models::{EndpointDescriptor, LatencyThresholds, ProbeResult};
use crate::proxy::run::RunToken;
use crate::proxy::sink::{Progress, RenderSink};
use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, info};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use reqwest::header::CACHE_CONTROL;
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default timeout for a single probe in milliseconds
const DEFAULT_TIMEOUT_MS: u64 = 8_000;

/// Default number of probes in flight
const DEFAULT_CONCURRENCY: usize = 20;

/// Default number of completions between progressive renders
const DEFAULT_RENDER_BATCH: usize = 5;

/// Relay endpoint answering with a JSON envelope around the wrapped URL
pub const DEFAULT_RELAY_PROBE_ENDPOINT: &str = "https://api.allorigins.win/get?url=";

/// Network side of a probe
#[async_trait]
pub trait Prober: Send + Sync {
    /// Settle once the endpoint (or whatever stands in front of it) answered
    async fn probe(&self, host: &str, port: u16) -> Result<(), ProbeError>;
}

/// Probes `http://host:port` through a CORS relay
pub struct RelayProber {
    client: Client,
    endpoint: String,
}

impl RelayProber {
    pub fn new(endpoint: &str, use_system_proxy: bool) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder().user_agent(DEFAULT_USER_AGENT);
        if !use_system_proxy {
            builder = builder.no_proxy();
        }
        Ok(Self {
            client: builder.build()?,
            endpoint: endpoint.to_string(),
        })
    }

    /// Relay URL for a bare HTTP target
    pub fn target_url(&self, host: &str, port: u16) -> String {
        let target = if host.contains(':') {
            format!("http://[{}]:{}", host, port)
        } else {
            format!("http://{}:{}", host, port)
        };
        relay_url(&self.endpoint, &target)
    }
}

#[async_trait]
impl Prober for RelayProber {
    async fn probe(&self, host: &str, port: u16) -> Result<(), ProbeError> {
        // Any answer counts; the status code carries no signal here.
        self.client
            .get(self.target_url(host, port))
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .map(|_| ())
            .map_err(|e| ProbeError::Network(e.to_string()))
    }
}

/// Configuration for the probe engine
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Maximum number of probes in flight
    pub concurrency: usize,
    /// Hard timeout of each probe
    pub timeout: Duration,
    /// Shuffle descriptors so early results are not biased by list order
    pub shuffle: bool,
    /// Completions between progressive renders
    pub render_batch: usize,
    /// Latency tier boundaries
    pub thresholds: LatencyThresholds,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            shuffle: true,
            render_batch: DEFAULT_RENDER_BATCH,
            thresholds: LatencyThresholds::default(),
        }
    }
}

impl ProbeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_render_batch(mut self, render_batch: usize) -> Self {
        self.render_batch = render_batch;
        self
    }

    pub fn with_thresholds(mut self, thresholds: LatencyThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}

/// What a finished (or abandoned) run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: u64,
    /// Descriptors handed to the engine
    pub total: usize,
    /// Probes whose results were recorded
    pub completed: usize,
    pub aggregator: ResultAggregator,
    /// The run was superseded before it drained
    pub cancelled: bool,
}

/// Mutable state of one run, shared by its workers
struct RunState<'s, S> {
    /// Id of the run these workers belong to
    run_id: u64,
    /// Results with a latency, in completion order
    aggregator: ResultAggregator,
    /// Probes recorded so far, with or without a latency
    completed: usize,
    /// Descriptors handed to the run
    total: usize,
    /// Completions between progressive renders
    render_batch: usize,
    /// The first reached result has been rendered
    rendered_first: bool,
    /// Where renders go
    sink: &'s mut S,
}

impl<S: RenderSink> RunState<'_, S> {
    fn progress(&self) -> Progress {
        Progress {
            completed: self.completed,
            total: self.total,
        }
    }

    fn render(&mut self) {
        let progress = self.progress();
        self.sink.render(self.run_id, &self.aggregator, progress);
    }

    /// Record one completion and render per the progressive policy
    fn record(&mut self, result: ProbeResult) {
        self.completed += 1;
        let reached = self.aggregator.add(result);

        if reached && !self.rendered_first {
            self.rendered_first = true;
            self.render();
        } else if self.completed % self.render_batch == 0 {
            self.render();
        }
    }
}

/// Bounded-concurrency prober over a list of descriptors
pub struct ProbeEngine {
    config: ProbeConfig,
    prober: Arc<dyn Prober>,
}

impl ProbeEngine {
    pub fn new(config: ProbeConfig, prober: Arc<dyn Prober>) -> Self {
        Self { config, prober }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Probe a single descriptor, absorbing every failure into `elapsed_ms: None`
    pub async fn probe_one(&self, descriptor: &EndpointDescriptor) -> ProbeResult {
        let Some((host, port)) = descriptor.target() else {
            debug!("Skipping {}: {}", descriptor.raw_line, ProbeError::NoTarget);
            return ProbeResult::no_signal(descriptor.clone());
        };

        let start = Instant::now();
        let outcome = match tokio::time::timeout(self.config.timeout, self.prober.probe(host, port)).await {
            Ok(result) => result,
            // Dropping the probe future cancels the underlying request.
            Err(_) => Err(ProbeError::Timeout),
        };

        match outcome {
            Ok(()) => ProbeResult::reached(descriptor.clone(), start.elapsed().as_millis() as u64),
            Err(e) => {
                debug!("Probe {}:{} gave no signal: {}", host, port, e);
                ProbeResult::no_signal(descriptor.clone())
            }
        }
    }

    /// Probe every descriptor and feed results to the sink while `token` is current
    ///
    /// Renders right after the first successful result, then every
    /// `render_batch` completions, and once more after the pool drains. Once
    /// the token is superseded nothing more reaches the sink.
    pub async fn run<S: RenderSink + Send>(
        &self,
        mut descriptors: Vec<EndpointDescriptor>,
        token: &RunToken,
        sink: &mut S,
    ) -> RunOutcome {
        if self.config.shuffle {
            descriptors.shuffle(&mut rand::rng());
        }

        let total = descriptors.len();
        let workers = self.config.concurrency.max(1).min(total);
        info!(
            "Run {}: probing {} endpoints with {} workers",
            token.id(),
            total,
            workers
        );

        let cursor = AtomicUsize::new(0);
        let state = Mutex::new(RunState {
            run_id: token.id(),
            aggregator: ResultAggregator::new(self.config.thresholds),
            completed: 0,
            total,
            render_batch: self.config.render_batch.max(1),
            rendered_first: false,
            sink,
        });

        join_all((0..workers).map(|_| self.worker(&descriptors, &cursor, &state, token))).await;

        let mut state = state.into_inner();
        let cancelled = !token.is_current();
        if cancelled {
            info!("Run {} superseded after {} of {} probes", token.id(), state.completed, total);
        } else {
            state.render();
            let summary = state.aggregator.summary();
            info!(
                "Run {} finished: {} of {} reachable (good {}, mid {}, bad {})",
                token.id(),
                summary.total,
                total,
                summary.good,
                summary.mid,
                summary.bad
            );
        }

        RunOutcome {
            run_id: token.id(),
            total,
            completed: state.completed,
            aggregator: state.aggregator,
            cancelled,
        }
    }

    async fn worker<S: RenderSink>(
        &self,
        descriptors: &[EndpointDescriptor],
        cursor: &AtomicUsize,
        state: &Mutex<RunState<'_, S>>,
        token: &RunToken,
    ) {
        while token.is_current() {
            let index = cursor.fetch_add(1, Ordering::SeqCst);
            let Some(descriptor) = descriptors.get(index) else {
                break;
            };

            let result = self.probe_one(descriptor).await;
            if !token.is_current() {
                debug!("Run {} is stale, dropping {}", token.id(), descriptor.raw_line);
                break;
            }
            state.lock().record(result);
        }
    }
}
