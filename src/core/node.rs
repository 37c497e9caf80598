//! # Node: lifecycle tree, exit accounting, and subtree-wide join.
//!
//! A [`Node`] supervises a set of concurrently running tasks and a set of
//! child nodes. It owns a cancellation signal, a running-task counter, and an
//! exit-notification queue; shutting a node down cancels every descendant,
//! and joining a node blocks until every task registered anywhere in its
//! subtree has exited.
//!
//! ## High-level architecture
//! ```text
//! Node::new() ──► root (fresh CancellationToken, detached auto-join)
//!     │
//!     ├─ Node::with_parent(&root) ──► child (token = root token's child)
//!     │        └─ root.spawn(watcher): child.join() → force-end → detach
//!     │
//!     ├─ spawn(proc) ──► running += 1, tokio::spawn(body + exit guard)
//!     ├─ run(proc)   ──► running += 1, body inline, exit guard
//!     │
//!     ├─ shutdown() ──► (a) ended sweep over the subtree
//!     │                 (b) token.cancel()  → cascades to child tokens
//!     │
//!     └─ join() ──► single-slot drain loop:
//!            watcher: exit_signal() → pre-stop hook
//!            select: exit notification → running -= 1 (stop at zero)
//!                    stop trigger      → shutdown sequence if still running
//!            then: stopped hook
//! ```
//!
//! ## Rules
//! - `running` is incremented exactly once per registration and decremented
//!   exactly once per consumed exit notification — only a drain loop
//!   decrements, exactly one drain loop runs per node at a time.
//! - `ended` is monotonic: once true, never reset.
//! - The ended sweep over a subtree completes before the corresponding token
//!   cancellation, so a task that observes its exit signal firing and then
//!   polls [`Node::should_run`] sees `false`.
//! - A child lives in its parent's children map exactly from construction to
//!   the completion of its own join; the parent removes the entry, never the
//!   child.
//! - Task registration is always accepted, including after shutdown; it is
//!   the body's responsibility to observe the stop signal and return.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Global sequence for node ids (children-map keys, event payloads).
static NODE_SEQ: AtomicU64 = AtomicU64::new(1);

/// Ring-buffer capacity of the tree-wide event bus.
const BUS_CAPACITY: usize = 1024;

type Hook = Box<dyn FnOnce() + Send + 'static>;

/// Receivers consumed exclusively by the node's drain loop.
///
/// Owning them inside the join mutex is what makes the mutex a single-slot
/// exclusivity token: whoever holds the slot is the only possible consumer.
struct JoinSlot {
    exit_rx: mpsc::UnboundedReceiver<()>,
    stop_rx: mpsc::UnboundedReceiver<()>,
}

/// Posts the owning node's exit notification when dropped.
///
/// Lives inside every registered task body, so a body that runs to
/// completion, returns early, or unwinds still notifies exactly once.
struct ExitGuard {
    exit_tx: mpsc::UnboundedSender<()>,
    bus: Bus,
    node: u64,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.bus.publish(Event::now(EventKind::TaskExited, self.node));
        let _ = self.exit_tx.send(());
    }
}

/// A lifecycle-tracking supervisor over tasks and child nodes.
///
/// Nodes are handled through `Arc`: constructors return `Arc<Node>`, and the
/// registration methods take `self: &Arc<Self>` so bodies can be wired to the
/// node they run on. Constructors must be called from within a Tokio runtime.
///
/// # Example
/// ```rust
/// use taskarbor::Node;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let root = Node::new();
///     root.spawn(|ctx| async move {
///         // cooperative body: block on the exit signal
///         ctx.cancelled().await;
///     });
///     root.shutdown().await;
///     root.join().await;
///     assert_eq!(root.active_task_count(), 0);
/// }
/// ```
pub struct Node {
    id: u64,
    token: CancellationToken,
    ended: AtomicBool,
    running: AtomicI32,
    exit_tx: mpsc::UnboundedSender<()>,
    stop_tx: mpsc::UnboundedSender<()>,
    children: StdMutex<HashMap<u64, Arc<Node>>>,
    parent: Weak<Node>,
    join_slot: Mutex<JoinSlot>,
    pre_stop: StdMutex<Option<Hook>>,
    stopped: StdMutex<Option<Hook>>,
    bus: Bus,
}

impl Node {
    /// Creates a root node with a fresh cancellation signal.
    ///
    /// The root spawns a detached background task that runs its own join loop
    /// to completion, so any observer can join the root later without the
    /// creator orchestrating it.
    pub fn new() -> Arc<Self> {
        Self::build(None)
    }

    /// Creates a node attached to `parent`.
    ///
    /// The child's cancellation signal is derived from the parent's: it fires
    /// whenever the parent's fires, in addition to its own explicit trigger.
    /// If the parent is already shutting down at construction time, the child
    /// starts with [`Node::should_run`] already `false`.
    ///
    /// The parent registers a watcher task that blocks until the child's join
    /// loop completes, force-sets the child's ended flag (covers the race
    /// where signal propagation has not been observed yet), then removes the
    /// child from the parent's children map.
    pub fn with_parent(parent: &Arc<Node>) -> Arc<Self> {
        Self::build(Some(parent))
    }

    fn build(parent: Option<&Arc<Node>>) -> Arc<Self> {
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = mpsc::unbounded_channel();

        let token = match parent {
            Some(p) => p.token.child_token(),
            None => CancellationToken::new(),
        };
        let bus = match parent {
            Some(p) => p.bus.clone(),
            None => Bus::new(BUS_CAPACITY),
        };

        let node = Arc::new(Self {
            id: NODE_SEQ.fetch_add(1, Ordering::Relaxed),
            ended: AtomicBool::new(token.is_cancelled()),
            running: AtomicI32::new(0),
            token,
            exit_tx,
            stop_tx,
            children: StdMutex::new(HashMap::new()),
            parent: parent.map(Arc::downgrade).unwrap_or_default(),
            join_slot: Mutex::new(JoinSlot { exit_rx, stop_rx }),
            pre_stop: StdMutex::new(None),
            stopped: StdMutex::new(None),
            bus,
        });

        match parent {
            Some(p) => {
                p.children.lock().unwrap().insert(node.id, node.clone());
                let child = node.clone();
                let owner = p.clone();
                p.spawn(move |_ctx| async move {
                    child.join().await;
                    child.ended.store(true, Ordering::SeqCst);
                    owner.children.lock().unwrap().remove(&child.id);
                });
            }
            None => {
                let root = node.clone();
                tokio::spawn(async move {
                    root.join().await;
                });
            }
        }

        node
    }

    /// Returns this node's unique id (stable for its lifetime, used in
    /// events).
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Registers `proc` on this node and launches it as a separate task.
    ///
    /// The body receives this node's cancellation token and should observe it
    /// to stop cooperatively. The running count is incremented before launch
    /// and an exit notification is posted when the body finishes — including
    /// when it unwinds. Never blocks the caller; returns the node for fluent
    /// chaining.
    ///
    /// Registration is accepted even after shutdown: the body still runs and
    /// is expected to notice the fired signal and return promptly.
    pub fn spawn<F, Fut>(self: &Arc<Self>, proc: F) -> &Arc<Self>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let guard = self.register();
        let body = proc(self.token.clone());
        tokio::spawn(async move {
            let _guard = guard;
            body.await;
        });
        self
    }

    /// Registers `proc` on this node and executes it in the caller's task,
    /// blocking the caller until it returns.
    ///
    /// Accounting is identical to [`Node::spawn`]; the exit notification is
    /// posted even if the body unwinds. Shutdown itself is accounted through
    /// this path, so tearing the tree down is itself a tracked task.
    pub async fn run<F, Fut>(self: &Arc<Self>, proc: F) -> &Arc<Self>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()>,
    {
        let _guard = self.register();
        proc(self.token.clone()).await;
        self
    }

    /// Increments the running count and arms the exit notification.
    fn register(&self) -> ExitGuard {
        self.running.fetch_add(1, Ordering::SeqCst);
        self.bus.publish(Event::now(EventKind::TaskSpawned, self.id));
        ExitGuard {
            exit_tx: self.exit_tx.clone(),
            bus: self.bus.clone(),
            node: self.id,
        }
    }

    /// Returns `true` while no shutdown has been requested on this node or
    /// any ancestor.
    ///
    /// Task bodies poll this in loops as the cooperative stop signal. A task
    /// polling concurrently with an in-flight shutdown may observe either
    /// state; a task that saw its exit signal fire always observes `false`.
    pub fn should_run(&self) -> bool {
        !self.ended.load(Ordering::SeqCst)
    }

    /// Returns a future that completes when this node's cancellation fires
    /// (own shutdown or an ancestor's). Fires exactly once; an alternative to
    /// polling [`Node::should_run`].
    pub fn exit_signal(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Returns this node's cancellation signal as a reusable token, for
    /// interop with APIs that expect one. Derived tokens created from it are
    /// cancelled along with the node.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Requests shutdown of this node and, transitively, every descendant.
    ///
    /// Performs a fast top-down sweep flipping [`Node::should_run`] to
    /// `false` across the subtree, then triggers the cancellation signal
    /// (which cascades through the derived child tokens). Accounted as a
    /// [`Node::run`] task. Idempotent: repeated calls flip nothing new.
    pub async fn shutdown(self: &Arc<Self>) {
        let me = self.clone();
        self.run(move |_ctx| async move {
            me.do_shutdown();
        })
        .await;
    }

    /// The unaccounted shutdown sequence, also used by the drain loop when an
    /// external stop trigger arrives.
    fn do_shutdown(&self) {
        self.fast_shutdown();
        self.token.cancel();
    }

    /// Sets the ended flag on this node and every current descendant before
    /// any cancellation is triggered.
    fn fast_shutdown(&self) {
        if !self.ended.swap(true, Ordering::SeqCst) {
            self.bus
                .publish(Event::now(EventKind::ShutdownRequested, self.id));
        }
        let children: Vec<Arc<Node>> = {
            let children = self.children.lock().unwrap();
            children.values().cloned().collect()
        };
        for child in children {
            child.fast_shutdown();
        }
    }

    /// Posts one externally-delivered termination trigger.
    ///
    /// Consumed by the drain loop, where it initiates the same sequence as an
    /// explicit [`Node::shutdown`] if the node is still running. This is the
    /// caller-wired entry point used by the OS-signal adapter; triggers
    /// posted while no join is draining are buffered until one is.
    pub fn trigger_stop(&self) {
        let _ = self.stop_tx.send(());
    }

    /// Waits until every task registered anywhere in this node's subtree has
    /// exited.
    ///
    /// At most one join loop drains a node at a time: concurrent callers
    /// block behind the in-flight one, then re-evaluate against the quiesced
    /// node and return. A quiesced node (shut down, drained, no tasks) is a
    /// no-op. Otherwise the loop consumes exit notifications until the
    /// running count reaches zero, reacting to buffered stop triggers along
    /// the way, and invokes the pre-stop hook when cancellation fires and the
    /// stopped hook once draining completes.
    ///
    /// A live node's join blocks until the node is shut down *and* drained —
    /// join never initiates shutdown by itself.
    pub async fn join(self: &Arc<Self>) {
        let mut slot = self.join_slot.lock().await;
        let slot = &mut *slot;

        if self.running.load(Ordering::SeqCst) <= 0 && !self.should_run() {
            return;
        }

        let me = self.clone();
        self.spawn(move |ctx| async move {
            ctx.cancelled().await;
            me.bus.publish(Event::now(EventKind::PreStop, me.id));
            let hook = me.pre_stop.lock().unwrap().take();
            if let Some(hook) = hook {
                hook();
            }
        });

        let mut remaining = self.running.load(Ordering::SeqCst);
        while remaining > 0 {
            tokio::select! {
                Some(()) = slot.exit_rx.recv() => {
                    remaining = self.running.fetch_sub(1, Ordering::SeqCst) - 1;
                }
                Some(()) = slot.stop_rx.recv() => {
                    if self.should_run() {
                        self.do_shutdown();
                    }
                }
                else => break,
            }
        }

        self.bus.publish(Event::now(EventKind::Drained, self.id));
        let hook = self.stopped.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
    }

    /// Returns the number of not-yet-exited tasks in this node's subtree.
    ///
    /// Excludes the bookkeeping tasks: the in-flight join's watcher on each
    /// node, and the parent-side watcher registered per child. Advisory and
    /// eventually consistent — it races with concurrent spawns and exits by
    /// design.
    pub fn active_task_count(&self) -> i32 {
        let mut n = self.running.load(Ordering::SeqCst);
        if n > 0 && self.join_slot.try_lock().is_err() {
            n -= 1;
        }
        let children: Vec<Arc<Node>> = {
            let children = self.children.lock().unwrap();
            children.values().cloned().collect()
        };
        for child in children {
            n += child.active_task_count() - 1;
        }
        n
    }

    /// Installs the pre-stop hook, invoked when cancellation fires and before
    /// draining completes. Last write wins; invoked at most once per node.
    pub fn on_pre_stop(self: &Arc<Self>, hook: impl FnOnce() + Send + 'static) -> &Arc<Self> {
        *self.pre_stop.lock().unwrap() = Some(Box::new(hook));
        self
    }

    /// Installs the stopped hook, invoked after the join loop's draining
    /// completes. Last write wins; invoked at most once per node.
    pub fn on_stopped(self: &Arc<Self>, hook: impl FnOnce() + Send + 'static) -> &Arc<Self> {
        *self.stopped.lock().unwrap() = Some(Box::new(hook));
        self
    }

    /// Returns the tree-wide event bus (shared by every node of the tree).
    pub fn events(&self) -> &Bus {
        &self.bus
    }

    /// Attaches a subscriber, driven by a detached forwarding worker.
    ///
    /// The worker receives from the tree's bus and calls
    /// [`Subscribe::on_event`] per event; it skips over lagged stretches and
    /// ends when the bus closes. It is not a tracked task, so it never holds
    /// up a join.
    pub fn attach_subscriber(self: &Arc<Self>, sub: Arc<dyn Subscribe>) -> &Arc<Self> {
        let mut rx = self.bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => sub.on_event(&ev).await,
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        });
        self
    }

    /// Returns the id of this node's parent, if the parent is still alive.
    ///
    /// The back-reference is non-owning; the parent exclusively drives the
    /// child's membership in the tree.
    pub fn parent_id(&self) -> Option<u64> {
        self.parent.upgrade().map(|p| p.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_root_starts_running() {
        let root = Node::new();
        assert!(root.should_run());
        assert_eq!(root.active_task_count(), 0);
    }

    #[tokio::test]
    async fn test_child_records_parent() {
        let root = Node::new();
        let child = Node::with_parent(&root);
        assert_eq!(child.parent_id(), Some(root.id()));
        assert!(child.should_run());
    }

    #[tokio::test]
    async fn test_child_of_shut_parent_starts_ended() {
        let root = Node::new();
        root.shutdown().await;
        assert!(!root.should_run());

        let child = Node::with_parent(&root);
        assert!(!child.should_run());
    }

    #[tokio::test]
    async fn test_registration_accepted_after_shutdown() {
        let root = Node::new();
        root.shutdown().await;

        let (tx, rx) = tokio::sync::oneshot::channel();
        root.spawn(move |ctx| async move {
            // post-shutdown bodies still execute and see the fired signal
            ctx.cancelled().await;
            let _ = tx.send(());
        });
        tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .expect("post-shutdown body should run")
            .unwrap();
        root.join().await;
    }

    #[tokio::test]
    async fn test_exit_guard_notifies_on_unwind() {
        let root = Node::new();
        root.spawn(|_ctx| async move {
            panic!("task body failure");
        });
        // the drain must still consume the failed task's notification
        root.shutdown().await;
        tokio::time::timeout(Duration::from_secs(1), root.join())
            .await
            .expect("join should drain past a panicked body");
        assert_eq!(root.active_task_count(), 0);
    }
}
