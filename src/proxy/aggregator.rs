//! Aggregation of successful probe results for the current run

use crate::proxy::models::{LatencyThresholds, LatencyTier, PageSize, ProbeResult};
use serde::Serialize;

/// Running counts per latency tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub good: usize,
    pub mid: usize,
    pub bad: usize,
}

/// Append-only, insertion-ordered store of results that produced a latency
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    results: Vec<ProbeResult>,
    thresholds: LatencyThresholds,
    summary: Summary,
}

impl ResultAggregator {
    pub fn new(thresholds: LatencyThresholds) -> Self {
        Self {
            results: Vec::new(),
            thresholds,
            summary: Summary::default(),
        }
    }

    /// Record a result; absent-latency results are ignored
    ///
    /// Returns whether the result was kept.
    pub fn add(&mut self, result: ProbeResult) -> bool {
        let Some(tier) = result.tier(&self.thresholds) else {
            return false;
        };

        self.summary.total += 1;
        match tier {
            LatencyTier::Good => self.summary.good += 1,
            LatencyTier::Mid => self.summary.mid += 1,
            LatencyTier::Bad => self.summary.bad += 1,
        }
        self.results.push(result);
        true
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    /// Leading slice the presentation should display
    pub fn page(&self, size: PageSize) -> &[ProbeResult] {
        match size {
            PageSize::All => &self.results,
            PageSize::Count(n) => &self.results[..n.min(self.results.len())],
        }
    }

    pub fn results(&self) -> &[ProbeResult] {
        &self.results
    }

    pub fn thresholds(&self) -> &LatencyThresholds {
        &self.thresholds
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
