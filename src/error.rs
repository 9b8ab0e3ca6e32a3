//! Error types for the fetch-and-probe pipeline

use thiserror::Error;

/// Every source strategy failed to deliver the list.
#[derive(Debug, Clone, Error)]
#[error("failed to fetch {url}: {}", attempts.join("; "))]
pub struct FetchFailure {
    /// The list URL that was requested (before cache busting)
    pub url: String,
    /// One message per strategy that was tried, in order
    pub attempts: Vec<String>,
}

/// Reasons a single probe produced no latency.
///
/// These never leave the probe engine; they are logged and turned into an
/// absent-latency result.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("descriptor has no host/port")]
    NoTarget,
}

/// Errors surfaced by a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchFailure),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
