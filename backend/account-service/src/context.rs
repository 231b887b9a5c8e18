//! Execution context carried by every store and service operation
//!
//! An `OpContext` bundles an optional deadline with a cancellation token.
//! Child contexts never outlive their parent: the child deadline is the
//! earlier of the two and cancelling the parent cancels the child.

use crate::error::{AccountError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct OpContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Default for OpContext {
    fn default() -> Self {
        Self::background()
    }
}

impl OpContext {
    /// No deadline, never cancelled unless a child token is cancelled
    pub fn background() -> Self {
        Self {
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancel: CancellationToken::new(),
        }
    }

    /// Derive from an external cancellation source, e.g. a shutdown token
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            deadline: None,
            cancel,
        }
    }

    /// Derive a child bounded by `timeout` and by this context's own deadline
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let requested = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < requested => parent,
            _ => requested,
        };

        Self {
            deadline: Some(deadline),
            cancel: self.cancel.child_token(),
        }
    }

    pub fn child(&self) -> Self {
        Self {
            deadline: self.deadline,
            cancel: self.cancel.child_token(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail fast if the context is already done
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(AccountError::Cancelled);
        }
        if matches!(self.deadline, Some(d) if Instant::now() >= d) {
            return Err(AccountError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `fut` until it completes, the deadline passes or the context is cancelled
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let bounded = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, fut)
                    .await
                    .map_err(|_| AccountError::DeadlineExceeded)?,
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AccountError::Cancelled),
            result = bounded => result,
        }
    }
}
