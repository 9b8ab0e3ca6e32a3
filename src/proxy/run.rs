//! Run identity and supersession
//!
//! Every refresh begins a new run with a strictly larger id. Work belonging
//! to an older run keeps executing but must check its token before touching
//! shared state, and drops its effects once the token is no longer current.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Owner of the current run id, held by whatever initiates refreshes
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    current: Arc<AtomicU64>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new run, superseding any run in flight
    pub fn begin(&self) -> RunToken {
        let id = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        RunToken {
            id,
            current: Arc::clone(&self.current),
        }
    }

    /// Id of the most recently started run, 0 before the first
    pub fn current_id(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, run_id: u64) -> bool {
        self.current_id() == run_id
    }
}

/// Handle carried by the work of one run
#[derive(Debug, Clone)]
pub struct RunToken {
    id: u64,
    current: Arc<AtomicU64>,
}

impl RunToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// False once a newer run has begun
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_increase() {
        let ctx = RunContext::new();
        assert_eq!(ctx.current_id(), 0);
        let first = ctx.begin();
        let second = ctx.begin();
        assert_eq!(first.id(), 1);
        assert_eq!(second.id(), 2);
        assert_eq!(ctx.current_id(), 2);
    }

    #[test]
    fn test_newer_run_supersedes() {
        let ctx = RunContext::new();
        let first = ctx.begin();
        assert!(first.is_current());
        let second = ctx.begin();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(!ctx.is_current(first.id()));
    }

    #[test]
    fn test_clones_share_counter() {
        let ctx = RunContext::new();
        let other = ctx.clone();
        let token = ctx.begin();
        other.begin();
        assert!(!token.is_current());
    }
}
