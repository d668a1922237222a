//! Cancellation tokens for async composed calls.
//!
//! A token handed to [`Incanter::acall_cancellable`](crate::Incanter::acall_cancellable)
//! aborts the call at its next suspension point. Scoped resources entered so
//! far are released in reverse order with [`Exit::Cancelled`](crate::Exit::Cancelled)
//! before the call returns.

use std::time::{Duration, Instant};

use crate::error::{IncantError, IncantResult};

/// A cheaply clonable cancellation token with optional parent.
///
/// Cancelling a parent cancels every child; cancelling a child leaves the
/// parent untouched. Waiting on [`cancelled`](Self::cancelled) is woken by
/// the cancel itself, not by polling.
///
/// # Examples
///
/// ```rust
/// use ferrous_incant::CancellationToken;
///
/// let parent = CancellationToken::new();
/// let child = parent.child_token();
///
/// parent.cancel();
/// assert!(child.is_cancelled());
/// assert!(child.throw_if_cancelled().is_err());
/// ```
#[derive(Clone)]
pub struct CancellationToken {
    inner: tokio_util::sync::CancellationToken,
    has_parent: bool,
    created_at: Instant,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: tokio_util::sync::CancellationToken::new(),
            has_parent: false,
            created_at: Instant::now(),
        }
    }

    /// A token cancelled together with this one.
    pub fn child_token(&self) -> Self {
        Self {
            inner: self.inner.child_token(),
            has_parent: true,
            created_at: Instant::now(),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Fails with [`IncantError::Cancelled`] once cancelled.
    pub fn throw_if_cancelled(&self) -> IncantResult<()> {
        if self.is_cancelled() {
            Err(IncantError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Completes once the token (or an ancestor) is cancelled.
    pub async fn cancelled(&self) {
        self.inner.cancelled().await
    }

    pub fn elapsed(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// A token that cancels itself after `timeout`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_timeout(timeout: Duration) -> Self {
        let token = Self::new();
        let timer = token.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            timer.cancel();
        });
        token
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("has_parent", &self.has_parent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token_basic() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_child_token_independent_cancellation() {
        let parent = CancellationToken::new();
        let child = parent.child_token();

        child.cancel();
        assert!(!parent.is_cancelled());
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_throw_if_cancelled() {
        let token = CancellationToken::new();
        assert!(token.throw_if_cancelled().is_ok());

        token.cancel();
        assert!(matches!(token.throw_if_cancelled(), Err(IncantError::Cancelled)));
    }

    #[tokio::test]
    async fn test_timeout_cancellation() {
        let token = CancellationToken::with_timeout(Duration::from_millis(10));
        assert!(!token.is_cancelled());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_future() {
        let token = CancellationToken::new();
        let trigger = token.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .expect("token should be cancelled");
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_waiters_wake_on_parent_cancel() {
        let parent = CancellationToken::new();
        let child = parent.child_token();

        let waiter = tokio::spawn(async move {
            child.cancelled().await;
            child.is_cancelled()
        });
        tokio::task::yield_now().await;
        parent.cancel();

        let woke = tokio::time::timeout(Duration::from_millis(100), waiter)
            .await
            .expect("child waiter should wake")
            .unwrap();
        assert!(woke);
    }
}
