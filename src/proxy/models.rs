//! Endpoint data models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default upper bound (inclusive) of the `good` latency tier
pub const DEFAULT_GOOD_MAX_MS: u64 = 150;

/// Default upper bound (inclusive) of the `mid` latency tier
pub const DEFAULT_MID_MAX_MS: u64 = 400;

/// URI scheme of a feed line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scheme {
    TelegramProxy,
    Vmess,
    Vless,
    Trojan,
    Shadowsocks,
    Unknown,
}

impl Scheme {
    /// Short label used in listings
    pub fn label(&self) -> &'static str {
        match self {
            Scheme::TelegramProxy => "tg",
            Scheme::Vmess => "vmess",
            Scheme::Vless => "vless",
            Scheme::Trojan => "trojan",
            Scheme::Shadowsocks => "ss",
            Scheme::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Parsed representation of one candidate endpoint line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub raw_line: String,
    pub scheme: Scheme,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl EndpointDescriptor {
    pub fn new(raw_line: String, scheme: Scheme, host: Option<String>, port: Option<u16>) -> Self {
        // An empty host carries no reachability data.
        let host = host.filter(|h| !h.is_empty());
        Self {
            raw_line,
            scheme,
            host,
            port,
        }
    }

    /// Descriptor without reachability data
    pub fn unresolved(raw_line: String, scheme: Scheme) -> Self {
        Self::new(raw_line, scheme, None, None)
    }

    /// `host:port` when both are known
    pub fn target(&self) -> Option<(&str, u16)> {
        match (&self.host, self.port) {
            (Some(host), Some(port)) => Some((host.as_str(), port)),
            _ => None,
        }
    }

    /// Get the endpoint in HOST:PORT format, `?` for unknown parts
    pub fn to_simple_string(&self) -> String {
        let host = self.host.as_deref().unwrap_or("?");
        match self.port {
            Some(port) => format!("{}:{}", host, port),
            None => format!("{}:?", host),
        }
    }
}

impl fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.scheme, self.to_simple_string())
    }
}

/// Latency class derived from a probe's elapsed time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyTier {
    Good,
    Mid,
    Bad,
}

impl fmt::Display for LatencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LatencyTier::Good => write!(f, "good"),
            LatencyTier::Mid => write!(f, "mid"),
            LatencyTier::Bad => write!(f, "bad"),
        }
    }
}

/// Fixed tier boundaries, both inclusive upper bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyThresholds {
    pub good_max_ms: u64,
    pub mid_max_ms: u64,
}

impl Default for LatencyThresholds {
    fn default() -> Self {
        Self {
            good_max_ms: DEFAULT_GOOD_MAX_MS,
            mid_max_ms: DEFAULT_MID_MAX_MS,
        }
    }
}

impl LatencyThresholds {
    pub fn classify(&self, elapsed_ms: u64) -> LatencyTier {
        if elapsed_ms <= self.good_max_ms {
            LatencyTier::Good
        } else if elapsed_ms <= self.mid_max_ms {
            LatencyTier::Mid
        } else {
            LatencyTier::Bad
        }
    }
}

/// Outcome of a single timing probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub descriptor: EndpointDescriptor,
    /// `None` means no usable signal, not that the endpoint is down
    pub elapsed_ms: Option<u64>,
}

impl ProbeResult {
    pub fn reached(descriptor: EndpointDescriptor, elapsed_ms: u64) -> Self {
        Self {
            descriptor,
            elapsed_ms: Some(elapsed_ms),
        }
    }

    pub fn no_signal(descriptor: EndpointDescriptor) -> Self {
        Self {
            descriptor,
            elapsed_ms: None,
        }
    }

    pub fn is_reached(&self) -> bool {
        self.elapsed_ms.is_some()
    }

    pub fn tier(&self, thresholds: &LatencyThresholds) -> Option<LatencyTier> {
        self.elapsed_ms.map(|ms| thresholds.classify(ms))
    }
}

/// How many leading results the presentation shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSize {
    Count(usize),
    All,
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::Count(10)
    }
}

impl PageSize {
    /// Choices offered by the UI, in cycling order
    pub const CHOICES: [PageSize; 4] = [
        PageSize::Count(10),
        PageSize::Count(20),
        PageSize::Count(50),
        PageSize::All,
    ];

    pub fn next(self) -> Self {
        let pos = Self::CHOICES.iter().position(|p| *p == self);
        match pos {
            Some(i) => Self::CHOICES[(i + 1) % Self::CHOICES.len()],
            None => Self::CHOICES[0],
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSize::Count(n) => write!(f, "{}", n),
            PageSize::All => write!(f, "all"),
        }
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(PageSize::All);
        }
        s.parse::<usize>()
            .map(PageSize::Count)
            .map_err(|_| format!("invalid page size: {} (use a number or 'all')", s))
    }
}

/// Kind of list a feed serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Telegram,
    V2ray,
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKind::Telegram => write!(f, "telegram"),
            FeedKind::V2ray => write!(f, "v2ray"),
        }
    }
}

impl FromStr for FeedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "telegram" | "tg" => Ok(FeedKind::Telegram),
            "v2ray" => Ok(FeedKind::V2ray),
            _ => Err(format!("invalid feed: {}. Use: telegram, v2ray", s)),
        }
    }
}

/// A named remote list of endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub name: String,
    pub url: String,
    pub kind: FeedKind,
}

impl Feed {
    pub fn new(name: &str, url: &str, kind: FeedKind) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            kind,
        }
    }

    /// Built-in feed for a kind
    pub fn builtin(kind: FeedKind) -> Self {
        match kind {
            FeedKind::Telegram => Feed::new(
                "SoliSpirit/mtproto",
                "https://raw.githubusercontent.com/SoliSpirit/mtproto/master/all_proxies.txt",
                FeedKind::Telegram,
            ),
            FeedKind::V2ray => Feed::new(
                "MatinGhanbari/v2ray-configs",
                "https://raw.githubusercontent.com/MatinGhanbari/v2ray-configs/main/subscriptions/v2ray/all_sub.txt",
                FeedKind::V2ray,
            ),
        }
    }

    /// A user supplied URL, named after itself
    pub fn custom(url: &str, kind: FeedKind) -> Self {
        Feed::new(url, url, kind)
    }
}
