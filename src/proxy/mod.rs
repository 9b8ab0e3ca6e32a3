//! Fetch-and-probe pipeline for public proxy and VPN endpoint lists
//!
//! This module provides functionality for:
//! - Fetching feed text directly or through a CORS relay
//! - Parsing Telegram proxy links and vmess/vless/trojan/ss config URIs
//! - Probing endpoints concurrently for a rough latency signal
//! - Aggregating results by latency tier for the current run

pub mod aggregator;
pub mod fetcher;
pub mod links;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod probe;
pub mod run;
pub mod sink;

pub use aggregator::{ResultAggregator, Summary};
pub use fetcher::{FetcherConfig, ListFetcher, SourceStrategy};
pub use links::{config_fingerprint, copy_text, launch_link, short_fingerprint};
pub use models::{
    EndpointDescriptor, Feed, FeedKind, LatencyThresholds, LatencyTier, PageSize, ProbeResult,
    Scheme,
};
pub use parser::{EntryParser, ParseStats};
pub use pipeline::Pipeline;
pub use probe::{ProbeConfig, ProbeEngine, Prober, RelayProber, RunOutcome};
pub use run::{RunContext, RunToken};
pub use sink::{ChannelSink, ConsoleSink, Progress, RenderSink, RunEvent};
