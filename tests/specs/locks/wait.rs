//! Wait set specs
//!
//! Verify wait, notify and wait timeouts.

use crate::prelude::*;

fn wait(cluster: &Cluster, lock: &str, node: &str, thread: u64, timeout: Option<Duration>) {
    cluster
        .coordinator
        .wait(&LockId::new(lock), &ThreadContext::new(node, thread), timeout)
        .passes();
}

#[test]
fn wait_without_holding_is_rejected() {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, WRITE).passes();

    let err = cluster
        .coordinator
        .wait(&LockId::new("L1"), &ThreadContext::new("B", 1), None)
        .fails();

    assert!(matches!(err, LockError::NotHolder { .. }));
}

#[test]
fn timed_out_wait_reports_then_reacquires() {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, WRITE).passes();
    wait(&cluster, "L1", "A", 1, Some(Duration::from_secs(2)));
    cluster.responses();

    cluster.coordinator.clock().advance(Duration::from_secs(2));
    assert_eq!(cluster.coordinator.tick(), 1);

    assert_eq!(
        cluster.responses(),
        vec![
            LockEvent::wait_timeout(LockId::new("L1"), &ThreadContext::new("A", 1), WRITE),
            award("L1", "A", 1, WRITE, true),
        ]
    );
}

#[test]
fn timed_out_waiter_queues_behind_the_current_holder() {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, WRITE).passes();
    wait(&cluster, "L1", "A", 1, Some(Duration::from_secs(1)));
    cluster.request("L1", "B", 1, WRITE).passes();
    cluster.responses();

    cluster.coordinator.clock().advance(Duration::from_secs(1));
    cluster.coordinator.tick();

    assert_eq!(
        cluster.responses(),
        vec![LockEvent::wait_timeout(
            LockId::new("L1"),
            &ThreadContext::new("A", 1),
            WRITE
        )]
    );
    assert_eq!(cluster.pending("L1"), vec![ThreadContext::new("A", 1)]);
}

#[test]
fn notify_all_wakes_waiters_in_wait_order() {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, WRITE).passes();
    wait(&cluster, "L1", "A", 1, None);
    cluster.request("L1", "A", 2, WRITE).passes();
    wait(&cluster, "L1", "A", 2, Some(Duration::from_secs(60)));
    cluster.request("L1", "B", 1, WRITE).passes();

    let woken = cluster
        .coordinator
        .notify(&LockId::new("L1"), &ThreadContext::new("B", 1), true)
        .passes();

    assert_eq!(woken, vec![ThreadContext::new("A", 1), ThreadContext::new("A", 2)]);
    assert_eq!(cluster.pending("L1"), woken);
    assert_eq!(cluster.coordinator.armed_timers(), 0);
}

#[test]
fn notified_waiter_is_granted_after_the_notifier_unlocks() {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, WRITE).passes();
    wait(&cluster, "L1", "A", 1, Some(Duration::from_secs(30)));
    cluster.request("L1", "B", 1, WRITE).passes();
    cluster
        .coordinator
        .notify(&LockId::new("L1"), &ThreadContext::new("B", 1), false)
        .passes();
    cluster.responses();

    cluster.unlock_thread("L1", "B", 1);

    assert_eq!(cluster.responses(), vec![award("L1", "A", 1, WRITE, true)]);
}

#[test]
fn interrupted_waiter_rejoins_the_queue() {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, WRITE).passes();
    wait(&cluster, "L1", "A", 1, None);
    cluster.request("L1", "B", 1, WRITE).passes();

    cluster
        .coordinator
        .interrupt(&LockId::new("L1"), &ThreadContext::new("A", 1));

    assert_eq!(cluster.pending("L1"), vec![ThreadContext::new("A", 1)]);
}

#[test]
fn notified_reader_under_its_node_read_grant_is_not_granted_twice() {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, READ).passes();
    wait(&cluster, "L1", "A", 1, None);
    cluster.request("L1", "A", 2, READ).passes();
    cluster.responses();

    cluster
        .coordinator
        .notify(&LockId::new("L1"), &ThreadContext::new("A", 2), false)
        .passes();

    assert!(cluster.responses().is_empty());
    assert_eq!(cluster.holders("L1"), vec![(Holder::greedy("A"), READ)]);
    assert!(cluster.pending("L1").is_empty());
}

#[test]
fn wait_timeout_too_large_for_the_clock_waits_indefinitely() {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, WRITE).passes();

    wait(&cluster, "L1", "A", 1, Some(Duration::MAX));
    cluster.coordinator.clock().advance(Duration::from_secs(86_400));

    assert_eq!(cluster.coordinator.tick(), 0);
    assert_eq!(cluster.coordinator.armed_timers(), 0);
}
