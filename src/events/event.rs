//! # Lifecycle events emitted by nodes.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Accounting events**: task registration and exit (spawned, exited)
//! - **Shutdown events**: cancellation flow (requested, pre-stop, drained)
//! - **Periodic events**: bounded periodic spawning (tick skipped)
//!
//! The [`Event`] struct carries the emitting node's id, a wall-clock
//! timestamp, and a globally unique sequence number.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Accounting events ===
    /// A task was registered on a node (via `spawn` or `run`).
    ///
    /// Internal bookkeeping tasks (join watcher, per-child watchers, periodic
    /// ticker and workers) are registered through the same path and emit this
    /// event too.
    TaskSpawned,

    /// A registered task finished (ran to completion, failed, or unwound).
    TaskExited,

    // === Shutdown events ===
    /// Shutdown was requested on this node (explicitly, via an ancestor's
    /// sweep, or by an external stop trigger). Emitted once per node.
    ShutdownRequested,

    /// The node's cancellation fired and its pre-stop hook is about to run.
    PreStop,

    /// The node's join loop consumed the last exit notification.
    Drained,

    // === Periodic events ===
    /// A periodic tick found all workers busy and the buffer full; the tick
    /// was dropped rather than queued.
    TickSkipped,
}

/// A single lifecycle event.
///
/// Carries no task identity: tasks on a node are anonymous, so events
/// identify only the owning node. Cheap to copy; the bus clones per receiver.
#[derive(Debug, Clone, Copy)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// Id of the node the event belongs to.
    pub node: u64,
    /// Wall-clock timestamp taken at publish time.
    pub at: SystemTime,
    /// Globally monotonic sequence number.
    pub seq: u64,
}

impl Event {
    /// Creates an event stamped with the current time and the next global
    /// sequence number.
    pub fn now(kind: EventKind, node: u64) -> Self {
        Self {
            kind,
            node,
            at: SystemTime::now(),
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
        }
    }
}
