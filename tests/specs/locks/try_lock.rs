//! Try-lock specs
//!
//! Verify requests that give up instead of queueing forever.

use crate::prelude::*;

#[test]
fn free_lock_is_granted_to_a_try_lock() {
    let cluster = Cluster::started();

    cluster.try_request("L1", "A", 1, WRITE, Duration::ZERO).passes();

    assert_eq!(cluster.responses(), vec![award("L1", "A", 1, WRITE, true)]);
}

#[test]
fn busy_lock_refuses_a_try_lock_at_once_but_still_recalls() {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, WRITE).passes();
    cluster.responses();

    cluster.try_request("L1", "B", 1, WRITE, Duration::ZERO).passes();

    assert_eq!(
        cluster.responses(),
        vec![recall("L1", "A", WRITE), cannot_award("L1", "B", 1, WRITE)]
    );
    assert!(cluster.pending("L1").is_empty());
}

#[test]
fn try_lock_granted_within_its_timeout() {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, WRITE).passes();
    cluster.try_request("L1", "B", 1, WRITE, Duration::from_secs(5)).passes();
    cluster.responses();

    cluster.coordinator.clock().advance(Duration::from_secs(2));
    cluster.unlock_node("L1", "A");
    cluster.coordinator.clock().advance(Duration::from_secs(5));

    assert_eq!(cluster.coordinator.tick(), 0);
    assert_eq!(cluster.responses(), vec![award("L1", "B", 1, WRITE, true)]);
}

#[test]
fn try_lock_refused_when_its_timeout_runs_out() {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, WRITE).passes();
    cluster.try_request("L1", "B", 1, WRITE, Duration::from_secs(5)).passes();
    cluster.request("L1", "C", 1, WRITE).passes();
    cluster.responses();

    cluster.coordinator.clock().advance(Duration::from_secs(5));
    assert_eq!(cluster.coordinator.tick(), 1);

    assert_eq!(cluster.responses(), vec![cannot_award("L1", "B", 1, WRITE)]);
    assert_eq!(cluster.pending("L1"), vec![ThreadContext::new("C", 1)]);
}

#[test]
fn departed_node_takes_its_try_lock_timer_with_it() {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, WRITE).passes();
    cluster.try_request("L1", "B", 1, WRITE, Duration::from_secs(5)).passes();

    cluster.coordinator.clear_all_locks_for(&NodeId::new("B"));

    assert_eq!(cluster.coordinator.armed_timers(), 0);
}
