//! Proxy Radar - endpoint list fetcher and latency prober
//!
//! Fetches public Telegram MTProto proxy and V2Ray config lists, probes each
//! endpoint for a rough latency through a CORS relay, and presents the
//! results in a terminal UI or on the console.

pub mod database;
pub mod error;
pub mod proxy;
pub mod tui;

pub use error::{FetchFailure, PipelineError, ProbeError};
pub use proxy::*;

use proxy::fetcher::DEFAULT_RELAY_RAW_ENDPOINT;
use proxy::probe::DEFAULT_RELAY_PROBE_ENDPOINT;

/// Application result type
pub type Result<T> = anyhow::Result<T>;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL for persisted settings
    pub database_url: String,
    /// List fetching
    pub fetcher: FetcherConfig,
    /// Probing
    pub probe: ProbeConfig,
    /// Relay endpoint wrapping each probe target
    pub relay_probe_endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://proxy-radar.db".to_string(),
            fetcher: FetcherConfig::default(),
            probe: ProbeConfig::default(),
            relay_probe_endpoint: DEFAULT_RELAY_PROBE_ENDPOINT.to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database_url(mut self, database_url: String) -> Self {
        self.database_url = database_url;
        self
    }

    pub fn with_fetcher(mut self, fetcher: FetcherConfig) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_probe(mut self, probe: ProbeConfig) -> Self {
        self.probe = probe;
        self
    }

    /// Point both the list fallback and the probes at other relay endpoints
    pub fn with_relays(mut self, raw_endpoint: Option<String>, probe_endpoint: Option<String>) -> Self {
        if let Some(raw) = raw_endpoint {
            self.fetcher = self.fetcher.with_relay_endpoint(Some(raw));
        }
        if let Some(probe) = probe_endpoint {
            self.relay_probe_endpoint = probe;
        }
        self
    }
}
