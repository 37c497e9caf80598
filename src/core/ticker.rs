//! # Bounded periodic spawning.
//!
//! [`Node::spawn_periodic`] fires at a fixed period and executes at most
//! `burst` invocations of the body concurrently. Ticks are not queued: one
//! tick may sit in the buffer, and a tick that arrives while the buffer is
//! full and every worker is busy is dropped. A slow body therefore skips
//! ticks instead of building a backlog — bounded, lossy, self-throttling
//! periodic execution.
//!
//! ```text
//! ticker task ──try_send──► [deadline, cap 1] ──► worker 1 ─┐
//!      │ (drop when full)                        worker 2 ─┼─ run(proc)
//!      └─ stops on series/node cancellation      worker N ─┘  one at a time
//! ```
//!
//! Every invocation goes through [`Node::run`], so periodic work is accounted
//! like any other tracked task and a join waits for in-flight invocations.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::core::node::Node;
use crate::events::{Event, EventKind};

impl Node {
    /// Spawns a periodic series: one ticking task plus `burst` workers, all
    /// tracked on this node.
    ///
    /// The body receives the series' cancellation token (cancel it to stop
    /// the whole series early) and the tick's nominal deadline — the tick
    /// instant plus one period — so callers can detect drift against the
    /// schedule rather than the literal fire time.
    ///
    /// The series also stops when this node's cancellation fires. With
    /// `burst == 0` nothing is spawned and `None` is returned (documented
    /// degenerate input, not a fault).
    ///
    /// # Example
    /// ```rust
    /// use std::time::Duration;
    /// use taskarbor::Node;
    ///
    /// #[tokio::main(flavor = "current_thread")]
    /// async fn main() {
    ///     let root = Node::new();
    ///     let series = root
    ///         .spawn_periodic(
    ///             |series, _deadline| async move {
    ///                 // stop the series from inside an invocation
    ///                 series.cancel();
    ///             },
    ///             Duration::from_millis(10),
    ///             1,
    ///         )
    ///         .expect("burst >= 1");
    ///     series.cancelled().await;
    ///     root.shutdown().await;
    ///     root.join().await;
    /// }
    /// ```
    pub fn spawn_periodic<F, Fut>(
        self: &Arc<Self>,
        proc: F,
        period: Duration,
        burst: usize,
    ) -> Option<CancellationToken>
    where
        F: Fn(CancellationToken, Instant) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if burst == 0 {
            return None;
        }

        let series = self.cancellation_token().child_token();
        let (tick_tx, tick_rx) = mpsc::channel::<Instant>(1);

        let ticker_series = series.clone();
        let bus = self.events().clone();
        let node_id = self.id();
        self.spawn(move |_ctx| async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // interval yields immediately once; the series starts one period in
            ticker.tick().await;
            loop {
                tokio::select! {
                    at = ticker.tick() => {
                        match tick_tx.try_send(at + period) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                bus.publish(Event::now(EventKind::TickSkipped, node_id));
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => return,
                        }
                    }
                    _ = ticker_series.cancelled() => return,
                }
            }
        });

        let ticks = Arc::new(Mutex::new(tick_rx));
        let proc = Arc::new(proc);
        for _ in 0..burst {
            let ticks = ticks.clone();
            let series = series.clone();
            let proc = proc.clone();
            let node = self.clone();
            self.spawn(move |_ctx| async move {
                loop {
                    let deadline = {
                        let mut ticks = ticks.lock().await;
                        tokio::select! {
                            tick = ticks.recv() => match tick {
                                Some(deadline) => deadline,
                                None => return,
                            },
                            _ = series.cancelled() => return,
                        }
                    };
                    let proc = proc.clone();
                    let series = series.clone();
                    node.run(move |_ctx| (*proc)(series, deadline)).await;
                }
            });
        }

        Some(series)
    }
}
