//! # taskarbor
//!
//! **Taskarbor** is a structured-concurrency supervisor for Tokio: a tree of
//! lifecycle-tracking nodes, each owning a set of concurrently running tasks,
//! with coordinated cancellation, leak-free shutdown, and blocking join
//! semantics across an entire subtree.
//!
//! Tokio gives no built-in guarantee that a cancelled parent's tasks actually
//! terminate, or that "wait for everything to finish" is expressible across a
//! dynamic set of tasks. Taskarbor provides exactly that accounting layer —
//! and nothing more: no scheduling, no restart policies, no result
//! propagation.
//!
//! ## Architecture
//! ```text
//!                      ┌────────────────────────────┐
//!                      │  root Node                 │
//!                      │  - CancellationToken       │
//!                      │  - running-task counter    │
//!                      │  - exit notifications      │
//!                      │  - join slot (one drainer) │
//!                      └───────┬───────────┬────────┘
//!               child_token()  │           │  spawn()/run()
//!                  ┌───────────┴──┐     ┌──┴──────────────┐
//!                  ▼              ▼     ▼                 ▼
//!           ┌────────────┐ ┌────────────┐ task…────── task…
//!           │ child Node │ │ child Node │   (tracked bodies observing
//!           └─────┬──────┘ └────────────┘    the node's stop signal)
//!                 ▼
//!              task…
//!
//! shutdown(): ended-flag sweep over the subtree, then token cancellation
//! join():     drain exit notifications until the running count is zero —
//!             child watchers make a parent's join cover the whole subtree
//! ```
//!
//! ## Cooperative cancellation
//! A task body receives its node's [`CancellationToken`] and may either poll
//! [`Node::should_run`] in a loop or block on [`Node::exit_signal`] /
//! `token.cancelled()`. The ended flag is set on every node of a subtree
//! before the cancellation signal fires, so a body that wakes from the signal
//! always observes `should_run() == false`.
//!
//! ## Features
//! | Area            | Description                                            | Key types / methods                         |
//! |-----------------|--------------------------------------------------------|---------------------------------------------|
//! | **Tree**        | Root and child supervisors, parent-driven detachment.  | [`Node::new`], [`Node::with_parent`]        |
//! | **Accounting**  | Tracked tasks, exit notifications, aggregate counts.   | [`Node::spawn`], [`Node::run`], [`Node::active_task_count`] |
//! | **Cancellation**| Flag + wakeup signal, cascading over the subtree.      | [`Node::shutdown`], [`Node::should_run`], [`Node::exit_signal`] |
//! | **Join**        | Single-slot subtree drain with pre-stop/stopped hooks. | [`Node::join`], [`Node::on_pre_stop`], [`Node::on_stopped`] |
//! | **Periodic**    | Fixed-period spawning with a bounded concurrent burst. | [`Node::spawn_periodic`]                    |
//! | **Signals**     | Optional OS termination-signal wiring.                 | [`Node::stop_on_signals`], [`Node::supervise`] |
//! | **Events**      | Lifecycle event bus + subscriber hooks.                | [`Event`], [`Bus`], [`Subscribe`]           |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use taskarbor::Node;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let root = Node::new();
//!     let pool = Node::with_parent(&root);
//!
//!     let served = Arc::new(AtomicU32::new(0));
//!     for _ in 0..4 {
//!         let served = served.clone();
//!         pool.spawn(move |ctx| async move {
//!             // a worker that runs until the tree stops
//!             ctx.cancelled().await;
//!             served.fetch_add(1, Ordering::SeqCst);
//!         });
//!     }
//!
//!     // stopping the root sweeps the whole subtree...
//!     root.shutdown().await;
//!     // ...and joining it waits for every task, including the pool's
//!     root.join().await;
//!     assert_eq!(served.load(Ordering::SeqCst), 4);
//! }
//! ```
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

mod core;
mod error;
mod events;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::Node;
pub use crate::error::RuntimeError;
pub use crate::events::{Bus, Event, EventKind};
pub use crate::subscribers::Subscribe;

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use crate::subscribers::LogWriter;
