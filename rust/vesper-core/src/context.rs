//! Execution context threaded through every conversion and dispatch call.
//!
//! A [`Ctx`] carries the host's cancellation and deadline signals. It is
//! never stored inside a value; the interpreter passes it down explicitly and
//! each dispatch entry point calls [`Ctx::check`] before doing any work.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::RuntimeError;

/// Default meta-method nesting limit for contexts built without a config.
pub const DEFAULT_MAX_META_DEPTH: usize = 200;

// ---------------------------------------------------------------------------
// CancelToken
// ---------------------------------------------------------------------------

/// A cooperative cancellation signal.
///
/// The token is `Send + Sync` so that a host thread can cancel a script that
/// is running on another thread; every clone observes the same flag.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Request cancellation. All clones of this token will observe `true`.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CancelToken")
            .field(&self.is_cancelled())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Ctx
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Ctx {
    cancel: CancelToken,
    deadline: Option<Instant>,
    max_meta_depth: usize,
    meta_depth: Rc<Cell<usize>>,
}

impl Ctx {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            cancel: CancelToken::new(),
            deadline: None,
            max_meta_depth: DEFAULT_MAX_META_DEPTH,
            meta_depth: Rc::new(Cell::new(0)),
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_max_meta_depth(mut self, depth: usize) -> Self {
        self.max_meta_depth = depth;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Fail fast if the host cancelled this context or its deadline passed.
    pub fn check(&self) -> Result<(), RuntimeError> {
        if self.cancel.is_cancelled() {
            return Err(RuntimeError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(RuntimeError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Enter one level of meta-method nesting. The level is released when the
    /// returned guard is dropped.
    pub(crate) fn enter_meta(&self) -> Result<MetaGuard, RuntimeError> {
        self.check()?;
        let depth = self.meta_depth.get();
        if depth >= self.max_meta_depth {
            return Err(RuntimeError::MetaDepthExceeded(self.max_meta_depth));
        }
        self.meta_depth.set(depth + 1);
        Ok(MetaGuard {
            depth: Rc::clone(&self.meta_depth),
        })
    }
}

impl Default for Ctx {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Ctx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ctx")
            .field("cancel", &self.cancel)
            .field("deadline", &self.deadline)
            .field("max_meta_depth", &self.max_meta_depth)
            .finish()
    }
}

pub(crate) struct MetaGuard {
    depth: Rc<Cell<usize>>,
}

impl Drop for MetaGuard {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}
