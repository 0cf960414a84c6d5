//! Lifecycle specs
//!
//! Verify the Recovering → Started → Stopped progression.

use crate::prelude::*;
use dlm_adapters::StaticNodeResolver;

#[test]
fn stop_freezes_handoff() {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, WRITE).passes();
    cluster.request("L1", "B", 1, WRITE).passes();
    cluster.responses();

    cluster.coordinator.stop().unwrap();
    cluster.unlock_node("L1", "A");
    cluster.request("L2", "C", 1, WRITE).passes();

    assert!(cluster.responses().is_empty());
    assert_eq!(cluster.pending("L1"), vec![ThreadContext::new("B", 1)]);
    assert_eq!(cluster.pending("L2"), vec![ThreadContext::new("C", 1)]);
}

#[test]
fn stopped_coordinator_cannot_restart() {
    let cluster = Cluster::started();
    cluster.coordinator.stop().unwrap();

    assert!(cluster.coordinator.start().is_err());
    assert_eq!(cluster.coordinator.lifecycle(), Lifecycle::Stopped);
}

#[test]
fn requests_during_recovery_are_answered_at_start() {
    let cluster = Cluster::recovering();
    cluster.request("L1", "A", 1, READ).passes();
    assert!(cluster.responses().is_empty());

    cluster.coordinator.start().unwrap();

    assert_eq!(cluster.responses(), vec![award("L1", "A", 1, READ, true)]);
}

#[test]
fn wait_and_notify_need_a_started_coordinator() {
    let cluster = Cluster::recovering();
    cluster
        .coordinator
        .reestablish_lock(&LockId::new("L1"), &Holder::greedy("A"), WRITE)
        .passes();

    let wait = cluster
        .coordinator
        .wait(&LockId::new("L1"), &ThreadContext::new("A", 1), None)
        .fails();
    let notify = cluster
        .coordinator
        .notify(&LockId::new("L1"), &ThreadContext::new("A", 1), true)
        .fails();

    assert!(matches!(wait, LockError::WrongLifecycle { .. }));
    assert!(matches!(notify, LockError::WrongLifecycle { .. }));
}

#[test]
fn snapshot_after_stop_renders_as_json() {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, WRITE).passes();
    cluster.request("L1", "B", 2, READ).passes();
    cluster.coordinator.stop().unwrap();

    let resolver = StaticNodeResolver::new().with_node("A", "10.0.0.1:9510");
    let json = serde_json::to_value(cluster.coordinator.snapshot(&resolver)).unwrap();

    assert_eq!(json[0]["lock_id"], "L1");
    assert_eq!(json[0]["holders"][0]["level"], "WRITE");
    assert_eq!(json[0]["holders"][0]["address"], "10.0.0.1:9510");
    assert!(json[0]["holders"][0]["thread"].is_null());
    assert_eq!(json[0]["pending"][0]["address"], "<unresolved>");
    assert_eq!(json[0]["pending"][0]["thread"], 2);
}
