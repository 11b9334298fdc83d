//! Caller-supplied deadline and cancellation scope.
//!
//! Every adapter operation takes a [`CallContext`]. Waiting on I/O goes
//! through [`CallContext::run`], which returns as soon as the token is
//! cancelled or the deadline passes, whichever comes first.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context-bounded wait ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupt {
    #[error("context cancelled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// A cancellation token plus an optional absolute deadline.
///
/// Cloning shares the token. [`CallContext::with_timeout`] derives a child
/// scope: cancelling the parent cancels the child, never the reverse, and
/// the child's deadline is the earlier of the two bounds.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context with no deadline that is only cancelled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh root context that expires after `timeout`.
    ///
    /// A timeout too large to represent as an instant means no deadline.
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Wrap an externally owned token (e.g. one cancelled on Ctrl-C).
    pub fn from_token(token: CancellationToken) -> Self {
        Self { token, deadline: None }
    }

    /// Derive a child scope bounded by both `timeout` and this context.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = match (self.deadline, Instant::now().checked_add(timeout)) {
            (Some(parent), Some(candidate)) => Some(parent.min(candidate)),
            (parent, candidate) => parent.or(candidate),
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancel this scope and every child derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The interrupt that already applies, if any.
    pub fn interrupted(&self) -> Option<Interrupt> {
        if self.token.is_cancelled() {
            Some(Interrupt::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(Interrupt::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Drive `fut` until it completes or this context ends.
    ///
    /// Cancellation wins ties so an already-cancelled context never starts
    /// new work.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Interrupt>
    where
        F: Future,
    {
        let expiry = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Interrupt::Cancelled),
            _ = expiry => Err(Interrupt::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }

    /// Sleep for `delay` unless the context ends first.
    pub async fn sleep(&self, delay: Duration) -> Result<(), Interrupt> {
        self.run(tokio::time::sleep(delay)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn run_completes_before_deadline() {
        let ctx = CallContext::timeout(Duration::from_secs(5));
        let out = ctx.run(async { 42 }).await;
        assert_eq!(out, Ok(42));
    }

    #[tokio::test(start_paused = true)]
    async fn run_returns_deadline_exceeded() {
        let ctx = CallContext::timeout(Duration::from_millis(100));
        let out = ctx.run(tokio::time::sleep(Duration::from_secs(60))).await;
        assert_eq!(out, Err(Interrupt::DeadlineExceeded));
        assert_eq!(ctx.interrupted(), Some(Interrupt::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_pending_sleep() {
        let ctx = CallContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });
        let out = ctx.sleep(Duration::from_secs(3600)).await;
        assert_eq!(out, Err(Interrupt::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn child_deadline_is_the_shorter_bound() {
        let parent = CallContext::timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::from_secs(30));
        assert_eq!(child.deadline(), parent.deadline());

        let tight = parent.with_timeout(Duration::from_millis(10));
        assert!(tight.deadline().unwrap() < parent.deadline().unwrap());
    }

    #[tokio::test]
    async fn unrepresentable_timeouts_keep_the_existing_bound() {
        let root = CallContext::timeout(Duration::MAX);
        assert_eq!(root.deadline(), None);
        assert_eq!(root.with_timeout(Duration::MAX).deadline(), None);

        let parent = CallContext::timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(child.deadline(), parent.deadline());

        let narrowed = root.with_timeout(Duration::from_secs(5));
        assert!(narrowed.deadline().is_some());
    }

    #[tokio::test]
    async fn cancelling_child_leaves_parent_untouched() {
        let parent = CallContext::new();
        let child = parent.with_timeout(Duration::from_secs(5));
        child.cancel();
        assert_eq!(child.interrupted(), Some(Interrupt::Cancelled));
        assert_eq!(parent.interrupted(), None);

        let child = parent.with_timeout(Duration::from_secs(5));
        parent.cancel();
        assert_eq!(child.interrupted(), Some(Interrupt::Cancelled));
    }

    #[tokio::test]
    async fn cancelled_context_never_starts_work() {
        let ctx = CallContext::new();
        ctx.cancel();
        let out = ctx.run(async { "ran" }).await;
        assert_eq!(out, Err(Interrupt::Cancelled));
    }
}
