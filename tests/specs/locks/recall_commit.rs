//! Recall commit specs
//!
//! Verify how a recalled node-wide grant is turned back into per-thread state.

use crate::prelude::*;

fn recalled_write(cluster: &Cluster) {
    cluster.request("L1", "A", 1, WRITE).passes();
    cluster.request("L1", "B", 1, WRITE).passes();
    assert_eq!(
        cluster.responses(),
        vec![award("L1", "A", 1, WRITE, true), recall("L1", "A", WRITE)]
    );
}

#[test]
fn idle_node_gives_the_lock_straight_to_the_next_request() {
    let cluster = Cluster::started();
    recalled_write(&cluster);

    cluster.recall_commit("L1", "A", RecallCommit::new()).passes();

    assert_eq!(cluster.responses(), vec![award("L1", "B", 1, WRITE, true)]);
    assert_eq!(cluster.holders("L1"), vec![(Holder::greedy("B"), WRITE)]);
}

#[test]
fn committed_local_state_queues_behind_the_recalling_request() {
    let cluster = Cluster::started();
    recalled_write(&cluster);
    let commit = RecallCommit::new()
        .with_hold(1, WRITE)
        .with_wait(2, WRITE, None)
        .with_pending(3, READ);

    cluster.recall_commit("L1", "A", commit).passes();

    assert!(cluster.responses().is_empty());
    assert_eq!(cluster.holders("L1"), vec![(Holder::per_thread("A", 1), WRITE)]);
    assert_eq!(
        cluster.pending("L1"),
        vec![ThreadContext::new("B", 1), ThreadContext::new("A", 3)]
    );

    cluster.unlock_thread("L1", "A", 1);
    assert_eq!(cluster.responses(), vec![award("L1", "B", 1, WRITE, false)]);
}

#[test]
fn commit_from_a_node_without_a_grant_is_rejected() {
    let cluster = Cluster::started();
    recalled_write(&cluster);

    let err = cluster.recall_commit("L1", "B", RecallCommit::new()).fails();

    assert!(matches!(err, LockError::NoNodeGrant { .. }));
    assert_eq!(err.node(), &NodeId::new("B"));
    assert_eq!(cluster.holders("L1"), vec![(Holder::greedy("A"), WRITE)]);
}

#[test]
fn inconsistent_commit_is_rejected_and_changes_nothing() {
    let cluster = Cluster::started();
    recalled_write(&cluster);
    let commit = RecallCommit::new().with_hold(1, WRITE).with_hold(2, WRITE);

    let err = cluster.recall_commit("L1", "A", commit).fails();

    assert!(matches!(err, LockError::InvalidRecallCommit { .. }));
    assert_eq!(cluster.holders("L1"), vec![(Holder::greedy("A"), WRITE)]);
    assert_eq!(cluster.pending("L1"), vec![ThreadContext::new("B", 1)]);
}

#[test]
fn commit_is_not_accepted_while_recovering() {
    let cluster = Cluster::recovering();
    cluster
        .coordinator
        .reestablish_lock(&LockId::new("L1"), &Holder::greedy("A"), WRITE)
        .passes();

    let err = cluster.recall_commit("L1", "A", RecallCommit::new()).fails();

    assert!(matches!(err, LockError::WrongLifecycle { .. }));
}
