//! Per-call cancellation and deadline context.
//!
//! # Responsibility
//! - Carry an optional deadline and a shared cancellation flag into every
//!   repository/store call.
//! - Report why a call must stop, distinctly from storage failures.
//!
//! # Invariants
//! - Cancellation is sticky: once cancelled, a context never becomes live again.
//! - Cancellation wins over an elapsed deadline when both apply.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Reason a context stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    Cancelled,
    DeadlineExceeded,
}

impl Display for ContextError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::DeadlineExceeded => write!(f, "operation deadline exceeded"),
        }
    }
}

impl Error for ContextError {}

/// Caller-supplied context for one logical operation.
///
/// Cheap to clone; clones share the same cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

/// Handle used by the caller to cancel every clone of a context.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl Context {
    /// Context without deadline that is never cancelled unless a handle is used.
    pub fn background() -> Self {
        Self::default()
    }

    /// Context whose deadline elapses `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a handle that cancels this context and all of its clones.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `Err` when the context is cancelled or past its deadline.
    pub fn check(&self) -> Result<(), ContextError> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ContextError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    pub fn is_done(&self) -> bool {
        self.check().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::{Context, ContextError};
    use std::time::{Duration, Instant};

    #[test]
    fn background_context_is_live() {
        assert_eq!(Context::background().check(), Ok(()));
    }

    #[test]
    fn cancel_handle_reaches_every_clone() {
        let ctx = Context::with_timeout(Duration::from_secs(60));
        let clone = ctx.clone();
        ctx.cancel_handle().cancel();

        assert_eq!(ctx.check(), Err(ContextError::Cancelled));
        assert_eq!(clone.check(), Err(ContextError::Cancelled));
    }

    #[test]
    fn elapsed_deadline_is_reported() {
        let ctx = Context::with_deadline(Instant::now() - Duration::from_millis(1));
        assert_eq!(ctx.check(), Err(ContextError::DeadlineExceeded));
        assert!(ctx.is_done());
    }

    #[test]
    fn cancellation_takes_precedence_over_deadline() {
        let ctx = Context::with_deadline(Instant::now() - Duration::from_millis(1));
        ctx.cancel_handle().cancel();
        assert_eq!(ctx.check(), Err(ContextError::Cancelled));
    }
}
