//! Cooperative cancellation for long searches

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Candidates scanned between cancellation checks
pub const CHECK_INTERVAL: usize = 4096;

/// Shared cancel flag plus an optional deadline.
///
/// Clones share the flag, so any clone can stop every worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` or `Err(DeadlineExceeded)` once the search must stop
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Error::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_token_passes() {
        CancelToken::new().check().unwrap();
    }

    #[test]
    fn test_cancel_is_shared_by_clones() {
        let token = CancelToken::new();
        let worker = token.clone();
        token.cancel();
        assert!(matches!(worker.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_deadline() {
        let token = CancelToken::new().with_deadline(Instant::now());
        assert!(matches!(token.check(), Err(Error::DeadlineExceeded)));

        let token = CancelToken::with_timeout(Duration::from_secs(3600));
        token.check().unwrap();
    }
}
