//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom event handlers into
//! the tree. Each subscriber is driven by a dedicated detached worker fed from
//! the tree's broadcast bus.
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching) — they do not block the
//!   publishing node, only their own worker.
//! - A worker that lags behind the bus capacity skips the missed events and
//!   keeps going; delivery is best-effort.

use async_trait::async_trait;

use crate::events::Event;

/// Contract for lifecycle-event subscribers.
///
/// Called from a subscriber-dedicated worker task. Implementations should
/// avoid blocking the async runtime (prefer async I/O and cooperative waits).
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
