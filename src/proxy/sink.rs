//! Presentation sinks consuming run progress

use crate::proxy::aggregator::{ResultAggregator, Summary};
use crate::proxy::models::ProbeResult;
use log::info;
use tokio::sync::mpsc::UnboundedSender;

/// How far a run has progressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> u16 {
        if self.total == 0 {
            return 100;
        }
        (self.completed * 100 / self.total) as u16
    }

    pub fn is_done(&self) -> bool {
        self.completed >= self.total
    }
}

/// Receiver of a run's user-visible effects
///
/// Callers only invoke a sink for the run that is current at that moment.
pub trait RenderSink {
    /// A short textual status line
    fn status(&mut self, run_id: u64, message: &str);

    /// The aggregate changed enough to redraw
    fn render(&mut self, run_id: u64, aggregator: &ResultAggregator, progress: Progress);
}

/// Events sent from a running pipeline to the terminal UI
#[derive(Debug, Clone)]
pub enum RunEvent {
    Status {
        run_id: u64,
        message: String,
    },
    /// Results kept since the previous render of the same run, in order
    Render {
        run_id: u64,
        results: Vec<ProbeResult>,
        progress: Progress,
    },
    Finished {
        run_id: u64,
        error: Option<String>,
    },
}

impl RunEvent {
    pub fn run_id(&self) -> u64 {
        match self {
            RunEvent::Status { run_id, .. }
            | RunEvent::Render { run_id, .. }
            | RunEvent::Finished { run_id, .. } => *run_id,
        }
    }
}

/// Forwards run effects over a channel
///
/// Renders carry only the results the aggregator gained since the last one;
/// the receiver rebuilds the aggregate by adding them in order. One sink
/// serves one run.
pub struct ChannelSink {
    tx: UnboundedSender<RunEvent>,
    /// Results already forwarded
    sent: usize,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<RunEvent>) -> Self {
        Self { tx, sent: 0 }
    }

    pub fn finish(&self, run_id: u64, error: Option<String>) {
        // The receiver is gone when the UI has quit; nothing left to tell.
        let _ = self.tx.send(RunEvent::Finished { run_id, error });
    }
}

impl RenderSink for ChannelSink {
    fn status(&mut self, run_id: u64, message: &str) {
        let _ = self.tx.send(RunEvent::Status {
            run_id,
            message: message.to_string(),
        });
    }

    fn render(&mut self, run_id: u64, aggregator: &ResultAggregator, progress: Progress) {
        let fresh = aggregator.results().get(self.sent..).unwrap_or_default().to_vec();
        self.sent += fresh.len();
        let _ = self.tx.send(RunEvent::Render {
            run_id,
            results: fresh,
            progress,
        });
    }
}

/// Logs progress for headless runs and remembers the last status and summary
#[derive(Debug, Default)]
pub struct ConsoleSink {
    pub last_status: Option<String>,
    pub last_summary: Summary,
    pub renders: usize,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderSink for ConsoleSink {
    fn status(&mut self, run_id: u64, message: &str) {
        info!("[run {}] {}", run_id, message);
        self.last_status = Some(message.to_string());
    }

    fn render(&mut self, run_id: u64, aggregator: &ResultAggregator, progress: Progress) {
        let summary = aggregator.summary();
        info!(
            "[run {}] {}/{} checked ({}%) | working: {} | good: {} | mid: {} | bad: {}",
            run_id,
            progress.completed,
            progress.total,
            progress.percent(),
            summary.total,
            summary.good,
            summary.mid,
            summary.bad
        );
        self.last_summary = summary;
        self.renders += 1;
    }
}
