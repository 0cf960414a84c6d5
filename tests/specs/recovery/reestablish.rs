//! Reestablishment specs
//!
//! Verify which reported grants and waits the coordinator accepts.

use crate::prelude::*;

fn reestablish(cluster: &Cluster, lock: &str, holder: Holder, level: LockLevel) -> Result<(), LockError> {
    cluster
        .coordinator
        .reestablish_lock(&LockId::new(lock), &holder, level)
}

#[test]
fn two_writers_cannot_both_be_reestablished() {
    let cluster = Cluster::recovering();
    reestablish(&cluster, "L1", Holder::greedy("A"), WRITE).passes();

    let err = reestablish(&cluster, "L1", Holder::greedy("B"), WRITE).fails();

    assert!(matches!(err, LockError::ReestablishConflict { .. }));
    assert_eq!(err.node(), &NodeId::new("B"));
    assert_eq!(cluster.holders("L1"), vec![(Holder::greedy("A"), WRITE)]);
}

#[test]
fn readers_on_several_nodes_are_reestablished() {
    let cluster = Cluster::recovering();
    reestablish(&cluster, "L1", Holder::greedy("A"), READ).passes();
    reestablish(&cluster, "L1", Holder::per_thread("B", 3), READ).passes();

    assert_eq!(cluster.holders("L1").len(), 2);
    assert!(cluster.responses().is_empty());
}

#[test]
fn reporting_the_same_grant_twice_is_rejected() {
    let cluster = Cluster::recovering();
    reestablish(&cluster, "L1", Holder::per_thread("A", 1), READ).passes();

    let err = reestablish(&cluster, "L1", Holder::per_thread("A", 1), READ).fails();

    assert!(matches!(err, LockError::DuplicateReestablish { .. }));
}

#[test]
fn reestablish_after_start_is_rejected() {
    let cluster = Cluster::started();

    let hold = reestablish(&cluster, "L1", Holder::greedy("A"), READ).fails();
    let wait = cluster
        .coordinator
        .reestablish_wait(&LockId::new("L1"), &ThreadContext::new("A", 1), READ, None)
        .fails();

    assert!(matches!(hold, LockError::WrongLifecycle { .. }));
    assert!(matches!(wait, LockError::WrongLifecycle { .. }));
    assert_eq!(cluster.coordinator.lock_count(), 0);
}

#[test]
fn reestablished_wait_restarts_its_timer_at_recovery() {
    let cluster = Cluster::recovering();
    cluster
        .coordinator
        .reestablish_wait(
            &LockId::new("L1"),
            &ThreadContext::new("A", 1),
            READ,
            Some(Duration::from_secs(10)),
        )
        .passes();
    cluster.coordinator.start().unwrap();

    cluster.coordinator.clock().advance(Duration::from_secs(9));
    assert_eq!(cluster.coordinator.tick(), 0);
    cluster.coordinator.clock().advance(Duration::from_secs(1));
    assert_eq!(cluster.coordinator.tick(), 1);
}
