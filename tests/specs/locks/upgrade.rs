//! Upgrade specs
//!
//! Verify that holding a lock never turns into holding it harder.

use crate::prelude::*;

#[test]
fn read_to_write_upgrade_is_rejected_and_changes_nothing() {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, READ).passes();
    cluster.responses();
    let resolver: HashMap<NodeId, String> = HashMap::new();
    let before = cluster.coordinator.snapshot(&resolver);

    let err = cluster.request("L1", "A", 1, WRITE).fails();

    assert!(matches!(err, LockError::UpgradeNotSupported { .. }));
    assert_eq!(err.node(), &NodeId::new("A"));
    assert!(cluster.responses().is_empty());
    assert_eq!(cluster.coordinator.snapshot(&resolver), before);
}

#[test]
fn per_thread_upgrade_is_rejected() {
    let cluster = Cluster::altruistic();
    cluster.request("L1", "A", 1, READ).passes();

    let err = cluster.request("L1", "A", 1, LockLevel::SynchronousWrite).fails();

    assert!(matches!(err, LockError::UpgradeNotSupported { .. }));
}

#[test]
fn asking_again_for_a_held_lock_is_rejected() {
    let cluster = Cluster::altruistic();
    cluster.request("L1", "A", 1, WRITE).passes();

    let err = cluster.request("L1", "A", 1, WRITE).fails();

    assert_eq!(
        err,
        LockError::AlreadyHeld {
            lock_id: LockId::new("L1"),
            holder: Holder::per_thread("A", 1),
        }
    );
}

#[test]
fn read_request_under_a_node_write_grant_is_served_locally() {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, WRITE).passes();
    cluster.responses();

    cluster.request("L1", "A", 1, READ).passes();

    assert!(cluster.responses().is_empty());
}

#[test]
fn upgrade_against_a_reestablished_grant_is_rejected_during_recovery() {
    let cluster = Cluster::recovering();
    cluster
        .coordinator
        .reestablish_lock(&LockId::new("L1"), &Holder::per_thread("A", 1), READ)
        .passes();

    let err = cluster.request("L1", "A", 1, WRITE).fails();
    assert!(matches!(err, LockError::UpgradeNotSupported { .. }));

    cluster.coordinator.start().unwrap();
    assert!(cluster.responses().is_empty());
    assert_eq!(cluster.holders("L1"), vec![(Holder::per_thread("A", 1), READ)]);
    assert!(cluster.pending("L1").is_empty());
}
