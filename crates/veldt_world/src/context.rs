//! # Operation Context
//!
//! Deadline and cancellation for one request. Every long-running world
//! operation takes an `OpContext` and calls [`OpContext::check`] before it
//! commits anything.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{WorldError, WorldResult};

/// Shared cancellation flag.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Requests cancellation of every context sharing this handle.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns true once cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Deadline + cancellation for one operation.
#[derive(Clone, Debug, Default)]
pub struct OpContext {
    deadline: Option<Instant>,
    cancel: CancelHandle,
}

impl OpContext {
    /// A context that never expires and is never cancelled by itself.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires after `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            cancel: CancelHandle::default(),
        }
    }

    /// Replaces the deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Handle that cancels this context (and its clones).
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails if the operation was cancelled or is past its deadline.
    ///
    /// # Errors
    ///
    /// `WorldError::Cancelled` or `WorldError::DeadlineExceeded`.
    pub fn check(&self) -> WorldResult<()> {
        if self.cancel.is_cancelled() {
            return Err(WorldError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(WorldError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
