//! # OS termination-signal adapter.
//!
//! The node tree never reads process-global signal state itself: this module
//! registers OS listeners and forwards a single stop trigger into the node
//! via [`Node::trigger_stop`], where the drain loop treats it like an
//! explicit shutdown. Everything here is optional wiring around the core.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (quit signal, often used for core dumps or hard stop)
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]

use std::io;
use std::sync::Arc;

use crate::core::node::Node;
use crate::error::RuntimeError;

/// Registered termination-signal listeners.
///
/// Registration happens eagerly in [`StopSignals::register`] so failures
/// surface to the caller instead of being swallowed by a background task.
#[cfg(unix)]
pub(crate) struct StopSignals {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
    sigquit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl StopSignals {
    pub(crate) fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sigquit: signal(SignalKind::quit())?,
        })
    }

    /// Completes when any registered termination signal is received.
    pub(crate) async fn recv(&mut self) -> io::Result<()> {
        tokio::select! {
            res = tokio::signal::ctrl_c() => res,
            _ = self.sigint.recv() => Ok(()),
            _ = self.sigterm.recv() => Ok(()),
            _ = self.sigquit.recv() => Ok(()),
        }
    }
}

#[cfg(not(unix))]
pub(crate) struct StopSignals;

#[cfg(not(unix))]
impl StopSignals {
    pub(crate) fn register() -> io::Result<Self> {
        Ok(Self)
    }

    pub(crate) async fn recv(&mut self) -> io::Result<()> {
        tokio::signal::ctrl_c().await
    }
}

impl Node {
    /// Subscribes this node to OS termination signals.
    ///
    /// On receipt, one stop trigger is forwarded to the node; the join loop
    /// then performs the shutdown sequence if the node still
    /// [`should_run`](Node::should_run). The forwarding task is detached and
    /// ends when the node's cancellation fires, whichever comes first.
    pub fn stop_on_signals(self: &Arc<Self>) -> Result<&Arc<Self>, RuntimeError> {
        let mut signals = StopSignals::register()?;
        let node = self.clone();
        tokio::spawn(async move {
            let cancelled = node.cancellation_token();
            tokio::select! {
                res = signals.recv() => {
                    if res.is_ok() {
                        node.trigger_stop();
                    }
                }
                _ = cancelled.cancelled() => {}
            }
        });
        Ok(self)
    }

    /// Wires OS termination signals and joins this node.
    ///
    /// The common tail of a service main: the process keeps running until a
    /// termination signal (or an explicit shutdown elsewhere in the tree)
    /// stops the node and the whole subtree drains.
    ///
    /// # Example
    /// ```no_run
    /// use taskarbor::{Node, RuntimeError};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), RuntimeError> {
    ///     let root = Node::new();
    ///     root.spawn(|ctx| async move {
    ///         ctx.cancelled().await;
    ///     });
    ///     root.supervise().await
    /// }
    /// ```
    pub async fn supervise(self: &Arc<Self>) -> Result<(), RuntimeError> {
        self.stop_on_signals()?;
        self.join().await;
        Ok(())
    }
}
