//! Per-call time budget tracking.

use std::future::Future;
use std::time::{Duration, Instant};

/// A fixed budget measured from the moment an extraction call starts
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    /// Start a new budget now
    pub fn new(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    /// Total budget
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time spent since the call started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Elapsed time in whole milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Budget left, zero once exhausted
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.elapsed())
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Clamp a step timeout so it never outlives the budget
    pub fn cap(&self, limit: Duration) -> Duration {
        limit.min(self.remaining())
    }
}

/// Run `fut` for at most `limit`, returning `None` if it did not finish
pub async fn within<F: Future>(limit: Duration, fut: F) -> Option<F::Output> {
    tokio::time::timeout(limit, fut).await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_never_underflows() {
        let deadline = Deadline::new(Duration::ZERO);
        assert!(deadline.is_exhausted());
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_cap_limits_to_remaining() {
        let deadline = Deadline::new(Duration::from_secs(5));
        assert!(deadline.cap(Duration::from_secs(60)) <= Duration::from_secs(5));
        assert_eq!(
            deadline.cap(Duration::from_millis(10)),
            Duration::from_millis(10)
        );
    }

    #[tokio::test]
    async fn test_within_times_out() {
        let slow = tokio::time::sleep(Duration::from_secs(5));
        assert!(within(Duration::from_millis(20), slow).await.is_none());
        assert_eq!(within(Duration::from_secs(1), async { 7 }).await, Some(7));
    }
}
