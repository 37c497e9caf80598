//! Error types raised by the taskarbor runtime.
//!
//! The node tree itself has no recoverable-error taxonomy: construction,
//! spawning, shutdown, join, and the query surface are total by contract, and
//! a task body that fails is still accounted as "exited" by its owning node.
//! The only fallible boundary is the OS-signal adapter, which can fail to
//! register its listeners.

use thiserror::Error;

/// Errors produced by the runtime's process-environment boundary.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Registering the OS termination-signal listeners failed.
    ///
    /// Raised by [`Node::stop_on_signals`](crate::Node::stop_on_signals) and
    /// [`Node::supervise`](crate::Node::supervise); the node tree itself is
    /// unaffected and can still be shut down and joined explicitly.
    #[error("signal registration failed: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Signal(_) => "signal_registration_failed",
        }
    }
}
