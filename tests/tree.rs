//! Lifecycle-tree behavior: construction, accounting, shutdown propagation,
//! join semantics, and hooks.

use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use taskarbor::Node;

const DRAIN_DEADLINE: Duration = Duration::from_secs(5);

/// Spawns `n` tasks that block on the node's exit signal, running `on_exit`
/// just before returning.
fn spawn_blocked(node: &Arc<Node>, n: u32, on_exit: impl Fn() + Send + Sync + 'static) {
    let on_exit = Arc::new(on_exit);
    for _ in 0..n {
        let on_exit = on_exit.clone();
        node.spawn(move |ctx| async move {
            ctx.cancelled().await;
            (*on_exit)();
        });
    }
}

#[tokio::test]
async fn test_new_root_is_running() {
    let root = Node::new();
    assert!(root.should_run());
}

#[tokio::test]
async fn test_new_child_of_live_parent_is_running() {
    let parent = Node::new();
    assert!(parent.should_run());

    let child = Node::with_parent(&parent);
    assert!(child.should_run());
    assert_eq!(child.parent_id(), Some(parent.id()));
}

#[tokio::test]
async fn test_new_child_of_shut_parent_is_ended() {
    let parent = Node::new();
    parent.shutdown().await;
    assert!(!parent.should_run());

    let child = Node::with_parent(&parent);
    assert!(!child.should_run());
}

#[tokio::test]
async fn test_exit_accounting_reaches_zero() {
    let root = Node::new();

    let pending = Arc::new(AtomicI32::new(10));
    let counter = pending.clone();
    spawn_blocked(&root, 10, move || {
        counter.fetch_sub(1, Ordering::SeqCst);
    });

    root.shutdown().await;
    timeout(DRAIN_DEADLINE, root.join()).await.expect("join should drain");

    assert_eq!(pending.load(Ordering::SeqCst), 0, "every task must have exited");
    assert_eq!(root.active_task_count(), 0);
}

#[tokio::test]
async fn test_tree_aggregate_counts() {
    let root = Node::new();
    let left = Node::with_parent(&root);
    let right = Node::with_parent(&root);

    spawn_blocked(&root, 10, || {});
    spawn_blocked(&left, 9, || {});
    spawn_blocked(&right, 11, || {});

    // advisory counts: own tasks plus descendants, bookkeeping excluded
    assert_eq!(left.active_task_count(), 9);
    assert_eq!(right.active_task_count(), 11);
    assert_eq!(root.active_task_count(), 30);

    assert!(left.should_run());
    assert!(right.should_run());
    root.shutdown().await;
    // the sweep flips every descendant before any join observes it
    assert!(!left.should_run());
    assert!(!right.should_run());

    timeout(DRAIN_DEADLINE, root.join()).await.expect("root join");
    timeout(DRAIN_DEADLINE, left.join()).await.expect("left join");
    timeout(DRAIN_DEADLINE, right.join()).await.expect("right join");

    assert_eq!(root.active_task_count(), 0);
    assert_eq!(left.active_task_count(), 0);
    assert_eq!(right.active_task_count(), 0);
}

#[tokio::test]
async fn test_concurrent_spawns_count_then_drain() {
    let root = Node::new();
    let release = CancellationToken::new();

    for _ in 0..16 {
        let release = release.clone();
        root.spawn(move |_ctx| async move {
            release.cancelled().await;
        });
    }
    assert_eq!(root.active_task_count(), 16);

    release.cancel();
    root.shutdown().await;
    timeout(DRAIN_DEADLINE, root.join()).await.expect("join should drain");
    assert_eq!(root.active_task_count(), 0);
}

#[tokio::test]
async fn test_join_waits_for_late_registrations() {
    let root = Node::new();
    let late_done = Arc::new(AtomicU32::new(0));

    // the first task registers another one while the drain is in progress
    let handle = root.clone();
    let done = late_done.clone();
    root.spawn(move |ctx| async move {
        ctx.cancelled().await;
        handle.spawn(move |_ctx| async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            done.store(1, Ordering::SeqCst);
        });
    });

    root.shutdown().await;
    timeout(DRAIN_DEADLINE, root.join()).await.expect("join should drain");
    assert_eq!(
        late_done.load(Ordering::SeqCst),
        1,
        "join must wait for tasks registered during the drain"
    );
}

#[tokio::test]
async fn test_hooks_fire_once_in_order() {
    let root = Node::new();
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let pre = order.clone();
    let post = order.clone();
    root.on_pre_stop(move || pre.lock().unwrap().push("pre-stop"))
        .on_stopped(move || post.lock().unwrap().push("stopped"));

    spawn_blocked(&root, 10, || {});

    root.shutdown().await;
    timeout(DRAIN_DEADLINE, root.join()).await.expect("first join");
    // a second join observes the quiesced node and must not re-run hooks
    timeout(DRAIN_DEADLINE, root.join()).await.expect("second join");

    assert_eq!(*order.lock().unwrap(), vec!["pre-stop", "stopped"]);
}

#[tokio::test]
async fn test_trigger_stop_initiates_shutdown() {
    let root = Node::new();

    let pending = Arc::new(AtomicI32::new(5));
    let counter = pending.clone();
    spawn_blocked(&root, 5, move || {
        counter.fetch_sub(1, Ordering::SeqCst);
    });

    assert!(root.should_run());
    root.trigger_stop();

    timeout(DRAIN_DEADLINE, root.join()).await.expect("join should drain");
    assert!(!root.should_run(), "trigger must act like an explicit shutdown");
    assert_eq!(pending.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let root = Node::new();
    spawn_blocked(&root, 3, || {});

    root.shutdown().await;
    root.shutdown().await;
    assert!(!root.should_run());

    timeout(DRAIN_DEADLINE, root.join()).await.expect("join should drain");
    assert_eq!(root.active_task_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_joins_all_return() {
    let root = Node::new();
    spawn_blocked(&root, 8, || {});
    root.shutdown().await;

    let (a, b, c) = (root.clone(), root.clone(), root.clone());
    let joins = async move {
        tokio::join!(a.join(), b.join(), c.join());
    };
    timeout(DRAIN_DEADLINE, joins).await.expect("all joins should return");
    assert_eq!(root.active_task_count(), 0);
}

#[tokio::test]
async fn test_subtree_join_through_root_only() {
    let root = Node::new();
    let child = Node::with_parent(&root);
    let grandchild = Node::with_parent(&child);

    let pending = Arc::new(AtomicI32::new(6));
    for node in [&child, &grandchild] {
        let counter = pending.clone();
        spawn_blocked(node, 3, move || {
            counter.fetch_sub(1, Ordering::SeqCst);
        });
    }

    root.shutdown().await;
    // joining the root alone must cover the whole subtree
    timeout(DRAIN_DEADLINE, root.join()).await.expect("root join");
    assert_eq!(pending.load(Ordering::SeqCst), 0);
    assert!(!grandchild.should_run());
}

#[tokio::test]
async fn test_exit_signal_fires_after_flag_flips() {
    let root = Node::new();

    let observed = Arc::new(AtomicU32::new(u32::MAX));
    let seen = observed.clone();
    let handle = root.clone();
    root.spawn(move |ctx| async move {
        ctx.cancelled().await;
        // flag-set happens-before the wakeup
        seen.store(handle.should_run() as u32, Ordering::SeqCst);
    });

    root.shutdown().await;
    timeout(DRAIN_DEADLINE, root.join()).await.expect("join should drain");
    assert_eq!(observed.load(Ordering::SeqCst), 0);
}
