//! Subscriber surface: the [`Subscribe`] extension trait and the optional
//! built-in [`LogWriter`].
//!
//! Subscribers are driven by detached forwarding workers created by
//! `Node::attach_subscriber`; a worker receives from the tree's shared bus
//! and calls `on_event` for each delivered event. Workers are not tracked
//! tasks: they end when the bus closes (every node of the tree dropped), so
//! they never hold up a join.

mod subscriber;

pub use subscriber::Subscribe;

#[cfg(feature = "logging")]
mod log;
#[cfg(feature = "logging")]
pub use log::LogWriter;
