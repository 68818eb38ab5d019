//! Execution Timeout Management
//!
//! Bounded waiting for child processes. An unbounded timeout waits forever,
//! which is what a command without a timeout asks for.

use std::future::Future;
use std::time::Duration;
use tokio::time;

/// Upper bound on how long the executor waits for a child
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionTimeout {
    duration: Option<Duration>,
}

impl ExecutionTimeout {
    /// Create a bounded timeout
    ///
    /// ```
    /// use std::time::Duration;
    /// use execguard::process::ExecutionTimeout;
    ///
    /// let timeout = ExecutionTimeout::new(Duration::from_secs(30));
    /// assert_eq!(timeout.duration(), Some(Duration::from_secs(30)));
    /// ```
    pub fn new(duration: Duration) -> Self {
        Self {
            duration: Some(duration),
        }
    }

    /// Wait without a bound
    pub fn unbounded() -> Self {
        Self { duration: None }
    }

    /// Create a timeout from seconds
    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn is_bounded(&self) -> bool {
        self.duration.is_some()
    }

    /// Drive `future` to completion, or give up when the timeout expires
    ///
    /// Returns `None` on expiry. The future is dropped at that point, so any
    /// cleanup (killing a child, for instance) is the caller's job.
    pub async fn run<F>(&self, future: F) -> Option<F::Output>
    where
        F: Future,
    {
        match self.duration {
            Some(duration) => time::timeout(duration, future).await.ok(),
            None => Some(future.await),
        }
    }
}

impl From<Option<Duration>> for ExecutionTimeout {
    fn from(duration: Option<Duration>) -> Self {
        Self { duration }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_default_is_unbounded() {
        let timeout = ExecutionTimeout::default();
        assert_eq!(timeout.duration(), None);
        assert!(!timeout.is_bounded());
    }

    #[test]
    fn test_timeout_from_secs() {
        let timeout = ExecutionTimeout::from_secs(45);
        assert_eq!(timeout.duration(), Some(Duration::from_secs(45)));
        assert_eq!(ExecutionTimeout::from(Some(Duration::from_secs(45))), timeout);
    }

    #[tokio::test]
    async fn test_timeout_run_returns_value() {
        let result = ExecutionTimeout::from_secs(10).run(async { "test value" }).await;
        assert_eq!(result, Some("test value"));
    }

    #[tokio::test]
    async fn test_timeout_run_expires() {
        let result = ExecutionTimeout::new(Duration::from_millis(50))
            .run(async {
                tokio::time::sleep(Duration::from_secs(2)).await;
            })
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_unbounded_waits() {
        let result = ExecutionTimeout::unbounded()
            .run(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                7
            })
            .await;
        assert_eq!(result, Some(7));
    }
}
