//! Grant specs
//!
//! Verify who receives an uncontended lock and in what form.

use crate::prelude::*;
use yare::parameterized;

#[test]
fn write_on_a_fresh_lock_is_one_greedy_award() {
    let cluster = Cluster::started();

    cluster.request("L1", "A", 1, WRITE).passes();

    assert_eq!(cluster.responses(), vec![award("L1", "A", 1, WRITE, true)]);
    assert_eq!(cluster.holders("L1"), vec![(Holder::greedy("A"), WRITE)]);
}

#[test]
fn readers_on_two_nodes_each_get_a_node_grant() {
    let cluster = Cluster::started();

    cluster.request("L1", "A", 1, READ).passes();
    cluster.request("L1", "B", 1, READ).passes();

    assert_eq!(
        cluster.responses(),
        vec![award("L1", "A", 1, READ, true), award("L1", "B", 1, READ, true)]
    );
    assert_eq!(
        cluster.holders("L1"),
        vec![(Holder::greedy("A"), READ), (Holder::greedy("B"), READ)]
    );
}

#[test]
fn other_threads_of_a_granted_node_get_no_response() {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, WRITE).passes();
    cluster.responses();

    cluster.request("L1", "A", 2, READ).passes();

    assert!(cluster.responses().is_empty());
    assert_eq!(cluster.holders("L1").len(), 1);
}

#[test]
fn altruistic_grants_belong_to_the_thread() {
    let cluster = Cluster::altruistic();

    cluster.request("L1", "A", 1, READ).passes();
    cluster.request("L1", "A", 2, READ).passes();

    assert_eq!(
        cluster.responses(),
        vec![award("L1", "A", 1, READ, false), award("L1", "A", 2, READ, false)]
    );
    assert_eq!(
        cluster.holders("L1"),
        vec![(Holder::per_thread("A", 1), READ), (Holder::per_thread("A", 2), READ)]
    );
}

#[test]
fn concurrent_level_is_awarded_but_never_held() {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, WRITE).passes();
    cluster.responses();

    cluster.request("L1", "B", 1, LockLevel::Concurrent).passes();

    assert_eq!(
        cluster.responses(),
        vec![award("L1", "B", 1, LockLevel::Concurrent, false)]
    );
    assert_eq!(cluster.holders("L1"), vec![(Holder::greedy("A"), WRITE)]);
}

#[test]
fn released_lock_is_forgotten() {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, WRITE).passes();

    cluster.unlock_node("L1", "A");

    assert_eq!(cluster.coordinator.lock_count(), 0);
    assert!(cluster.holders("L1").is_empty());
}

#[parameterized(
    read_after_read = { READ, READ, false },
    write_after_read = { READ, WRITE, true },
    read_after_write = { WRITE, READ, true },
    sync_write_after_read = { READ, LockLevel::SynchronousWrite, true },
    read_after_sync_write = { LockLevel::SynchronousWrite, READ, true },
)]
fn second_node_queues_only_on_conflict(held: LockLevel, requested: LockLevel, queued: bool) {
    let cluster = Cluster::started();
    cluster.request("L1", "A", 1, held).passes();

    cluster.request("L1", "B", 1, requested).passes();

    assert_eq!(cluster.pending("L1").len(), usize::from(queued));
    assert_eq!(cluster.holders("L1").len(), if queued { 1 } else { 2 });
}
