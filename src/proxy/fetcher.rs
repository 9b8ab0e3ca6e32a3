//! List fetcher for remote endpoint feeds
//!
//! A feed is tried through an ordered list of source strategies: a direct,
//! cache-busted GET first, then the same URL routed through a CORS relay.
//! The first strategy that returns a successful response wins.

use crate::error::FetchFailure;
use chrono::Utc;
use log::{debug, info, warn};
use reqwest::Client;
use std::fmt;
use std::time::Duration;

/// Default timeout for list requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default user agent for HTTP requests
pub(crate) const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Relay endpoint returning the raw body of the wrapped URL
pub const DEFAULT_RELAY_RAW_ENDPOINT: &str = "https://api.allorigins.win/raw?url=";

/// Append a `_=<millis>` parameter so intermediaries cannot serve a stale copy
pub fn cache_bust(url: &str, millis: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}_={}", url, separator, millis)
}

/// Wrap `target` for a relay endpoint ending in `...?url=`
pub fn relay_url(endpoint: &str, target: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    format!("{}{}", endpoint, encoded)
}

/// One way of retrieving a feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStrategy {
    /// Request the URL itself
    Direct,
    /// Request the URL through a relay endpoint
    Relay(String),
}

impl SourceStrategy {
    /// The URL actually requested for a (cache-busted) feed URL
    pub fn request_url(&self, url: &str) -> String {
        match self {
            SourceStrategy::Direct => url.to_string(),
            SourceStrategy::Relay(endpoint) => relay_url(endpoint, url),
        }
    }
}

impl fmt::Display for SourceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceStrategy::Direct => write!(f, "direct"),
            SourceStrategy::Relay(endpoint) => write!(f, "relay {}", endpoint),
        }
    }
}

/// Configuration for the list fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Timeout for each HTTP request
    pub timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: String,
    /// Relay endpoint used when the direct request fails, `None` disables it
    pub relay_endpoint: Option<String>,
    /// Whether to try the direct request at all
    pub try_direct: bool,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` from the environment
    pub use_system_proxy: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            relay_endpoint: Some(DEFAULT_RELAY_RAW_ENDPOINT.to_string()),
            try_direct: true,
            use_system_proxy: true,
        }
    }
}

impl FetcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_relay_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.relay_endpoint = endpoint;
        self
    }

    pub fn with_direct(mut self, try_direct: bool) -> Self {
        self.try_direct = try_direct;
        self
    }

    pub fn with_system_proxy(mut self, use_system_proxy: bool) -> Self {
        self.use_system_proxy = use_system_proxy;
        self
    }

    /// Strategies in the order they are tried
    pub fn strategies(&self) -> Vec<SourceStrategy> {
        let mut strategies = Vec::new();
        if self.try_direct {
            strategies.push(SourceStrategy::Direct);
        }
        if let Some(endpoint) = &self.relay_endpoint {
            strategies.push(SourceStrategy::Relay(endpoint.clone()));
        }
        strategies
    }
}

/// Fetches raw feed text
pub struct ListFetcher {
    strategies: Vec<SourceStrategy>,
    client: Client,
}

impl ListFetcher {
    /// Create a new fetcher with default configuration
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(FetcherConfig::default())
    }

    /// Create a new fetcher with custom configuration
    pub fn with_config(config: FetcherConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent);
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            strategies: config.strategies(),
            client: builder.build()?,
        })
    }

    pub fn strategies(&self) -> &[SourceStrategy] {
        &self.strategies
    }

    /// Fetch the text at `url`, trying each strategy once in order
    pub async fn fetch_list(&self, url: &str) -> Result<String, FetchFailure> {
        let busted = cache_bust(url, Utc::now().timestamp_millis());
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let target = strategy.request_url(&busted);
            debug!("Fetching {} ({})", url, strategy);

            match self.fetch_text(&target).await {
                Ok(text) => {
                    info!("Fetched {} bytes from {} ({})", text.len(), url, strategy);
                    return Ok(text);
                }
                Err(e) => {
                    warn!("Fetching {} ({}) failed: {}", url, strategy, e);
                    attempts.push(format!("{}: {}", strategy, e));
                }
            }
        }

        Err(FetchFailure {
            url: url.to_string(),
            attempts,
        })
    }

    async fn fetch_text(&self, target: &str) -> Result<String, reqwest::Error> {
        let response = self.client.get(target).send().await?.error_for_status()?;
        response.text().await
    }
}
