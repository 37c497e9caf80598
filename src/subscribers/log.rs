//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [spawned] node=3
//! [exited] node=3
//! [shutdown-requested] node=1
//! [pre-stop] node=1
//! [drained] node=1
//! [tick-skipped] node=2
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Not intended for production use —
/// implement a custom [`Subscribe`] for structured logging or metrics
/// collection.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::TaskSpawned => println!("[spawned] node={}", e.node),
            EventKind::TaskExited => println!("[exited] node={}", e.node),
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested] node={}", e.node)
            }
            EventKind::PreStop => println!("[pre-stop] node={}", e.node),
            EventKind::Drained => println!("[drained] node={}", e.node),
            EventKind::TickSkipped => println!("[tick-skipped] node={}", e.node),
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
