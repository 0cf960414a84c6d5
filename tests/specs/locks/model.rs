//! Reference model specs
//!
//! Without contention the coordinator's holders match a plain map of who
//! asked for what.

use crate::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeMap;

const LOCKS: [&str; 3] = ["L0", "L1", "L2"];
const NODES: [&str; 3] = ["A", "B", "C"];

#[derive(Clone, Debug)]
enum Op {
    Request { lock: usize, node: usize, write: bool },
    Unlock { lock: usize, node: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..LOCKS.len(), 0..NODES.len(), any::<bool>())
            .prop_map(|(lock, node, write)| Op::Request { lock, node, write }),
        (0..LOCKS.len(), 0..NODES.len()).prop_map(|(lock, node)| Op::Unlock { lock, node }),
    ]
}

type Model = BTreeMap<&'static str, BTreeMap<&'static str, LockLevel>>;

/// Whether the model can grant without anyone queueing
fn uncontended(held: Option<&BTreeMap<&'static str, LockLevel>>, node: &str, level: LockLevel) -> bool {
    match held {
        None => true,
        Some(holders) if holders.is_empty() => true,
        Some(holders) => {
            level.is_read() && !holders.contains_key(node) && holders.values().all(|l| l.is_read())
        }
    }
}

fn run(cluster: &Cluster, greedy: bool, ops: &[Op]) -> Model {
    let mut model = Model::new();
    for op in ops {
        match *op {
            Op::Request { lock, node, write } => {
                let (lock, node) = (LOCKS[lock], NODES[node]);
                let level = if write { WRITE } else { READ };
                if !uncontended(model.get(lock), node, level) {
                    continue;
                }
                cluster.request(lock, node, 1, level).passes();
                model.entry(lock).or_default().insert(node, level);
            }
            Op::Unlock { lock, node } => {
                let (lock, node) = (LOCKS[lock], NODES[node]);
                let Some(holders) = model.get_mut(lock) else {
                    continue;
                };
                if holders.remove(node).is_none() {
                    continue;
                }
                if greedy {
                    cluster.unlock_node(lock, node);
                } else {
                    cluster.unlock_thread(lock, node, 1);
                }
            }
        }
    }
    model
}

fn check(cluster: &Cluster, greedy: bool, model: &Model) {
    for lock in LOCKS {
        let expected: Vec<(Holder, LockLevel)> = model
            .get(lock)
            .into_iter()
            .flatten()
            .map(|(node, level)| {
                let holder = if greedy {
                    Holder::greedy(*node)
                } else {
                    Holder::per_thread(*node, 1)
                };
                (holder, *level)
            })
            .collect();
        assert_eq!(cluster.holders(lock), expected, "holders of {lock}");
        assert!(cluster.pending(lock).is_empty(), "nothing queued on {lock}");
    }
}

proptest! {
    #[test]
    fn greedy_holders_match_the_model(ops in proptest::collection::vec(op(), 0..40)) {
        let cluster = Cluster::started();
        let model = run(&cluster, true, &ops);
        check(&cluster, true, &model);
        prop_assert!(cluster.responses().iter().all(|e| e.is_award()));
    }

    #[test]
    fn per_thread_holders_match_the_model(ops in proptest::collection::vec(op(), 0..40)) {
        let cluster = Cluster::altruistic();
        let model = run(&cluster, false, &ops);
        check(&cluster, false, &model);
        prop_assert!(cluster.responses().iter().all(|e| e.is_award()));
    }
}
