//! Lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by nodes: task registration
//! and exit, shutdown requests, pre-stop, drain completion, and skipped
//! periodic ticks.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: every `Node` operation that changes lifecycle state.
//! - **Consumers**: subscriber workers attached via
//!   `Node::attach_subscriber`, or any `events().subscribe()` receiver.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
