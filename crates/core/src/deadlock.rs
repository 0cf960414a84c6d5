// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deadlock detection over the wait-for graph
//!
//! Vertices are grant keys. A queued request points at every holder of the
//! lock it waits for. A recalled node-wide grant points at every queued
//! request from the same node: until its recall commit arrives the grant is
//! taken to be in use by the node's blocked threads. A grant that has not
//! been recalled is given back on demand and does not pass through. Waiters
//! in a wait set are not blocked on a grant and are not part of the graph.

use crate::lock::{Holder, Lock, LockId, NodeId, ThreadContext};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One thread in a cycle and the lock it is queued on
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DeadlockLink {
    pub waiter: ThreadContext,
    pub waiting_on: LockId,
}

/// A closed cycle of queued threads.
///
/// Each link's lock is held, directly or through its node's grant, by the
/// thread of the next link; the last link wraps around to the first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeadlockChain {
    links: Vec<DeadlockLink>,
}

impl DeadlockChain {
    pub fn links(&self) -> &[DeadlockLink] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// The link after `index`, wrapping around
    pub fn next(&self, index: usize) -> Option<&DeadlockLink> {
        if self.links.is_empty() {
            return None;
        }
        self.links.get((index + 1) % self.links.len())
    }

    /// Every link once, starting at `index`
    pub fn walk_from(&self, index: usize) -> impl Iterator<Item = &DeadlockLink> {
        self.links.iter().cycle().skip(index).take(self.links.len())
    }

    /// Whether `waiter` appears in the chain queued on `lock_id`
    pub fn contains(&self, waiter: &ThreadContext, lock_id: &LockId) -> bool {
        self.links
            .iter()
            .any(|link| link.waiter == *waiter && link.waiting_on == *lock_id)
    }
}

impl fmt::Display for DeadlockChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for link in &self.links {
            write!(f, "{} on {} -> ", link.waiter, link.waiting_on)?;
        }
        match self.links.first() {
            Some(first) => write!(f, "{}", first.waiter),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Edge {
    to: Holder,
    /// Lock a queued request waits on; `None` for node-wide pass-through edges
    via: Option<LockId>,
}

struct Frame {
    vertex: Holder,
    next_edge: usize,
    via: Option<LockId>,
}

fn wait_for_graph(locks: &[Lock]) -> BTreeMap<Holder, Vec<Edge>> {
    let mut edges: BTreeMap<Holder, BTreeSet<Edge>> = BTreeMap::new();
    let mut queued_by_node: BTreeMap<NodeId, BTreeSet<Holder>> = BTreeMap::new();
    let mut node_grants: BTreeSet<Holder> = BTreeSet::new();

    for lock in locks {
        for (holder, hold) in lock.holders() {
            if holder.is_greedy() && hold.recalled {
                node_grants.insert(holder.clone());
            }
        }
        for request in lock.pending() {
            let from = request.context.holder();
            queued_by_node
                .entry(request.context.node.clone())
                .or_default()
                .insert(from.clone());
            for (holder, _) in lock.holders() {
                let own_node_grant = holder.is_greedy() && holder.node() == &request.context.node;
                if *holder == from || own_node_grant {
                    continue;
                }
                edges.entry(from.clone()).or_default().insert(Edge {
                    to: holder.clone(),
                    via: Some(lock.id().clone()),
                });
            }
        }
    }

    for grant in node_grants {
        let Some(queued) = queued_by_node.get(grant.node()) else {
            continue;
        };
        let out = edges.entry(grant).or_default();
        for request in queued {
            out.insert(Edge {
                to: request.clone(),
                via: None,
            });
        }
    }

    edges
        .into_iter()
        .map(|(vertex, out)| (vertex, out.into_iter().collect()))
        .collect()
}

/// Turn a cycle of vertices into links, rotated so the smallest waiter leads
fn chain_from_cycle(cycle: &[(Holder, Option<LockId>)]) -> Option<DeadlockChain> {
    let mut links: Vec<DeadlockLink> = cycle
        .iter()
        .filter_map(|(vertex, via)| match (vertex, via) {
            (Holder::PerThread(node, thread), Some(lock)) => Some(DeadlockLink {
                waiter: ThreadContext {
                    node: node.clone(),
                    thread: *thread,
                },
                waiting_on: lock.clone(),
            }),
            _ => None,
        })
        .collect();
    let start = links
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(index, _)| index)?;
    links.rotate_left(start);
    Some(DeadlockChain { links })
}

/// Every distinct deadlock among `locks`, in deterministic order
pub fn find_deadlocks(locks: &[Lock]) -> Vec<DeadlockChain> {
    let graph = wait_for_graph(locks);
    let mut done: BTreeSet<Holder> = BTreeSet::new();
    let mut seen: BTreeSet<Vec<DeadlockLink>> = BTreeSet::new();
    let mut chains = Vec::new();

    for start in graph.keys() {
        if done.contains(start) {
            continue;
        }

        let mut stack = vec![Frame {
            vertex: start.clone(),
            next_edge: 0,
            via: None,
        }];
        let mut on_path: BTreeMap<Holder, usize> = BTreeMap::new();
        on_path.insert(start.clone(), 0);

        while let Some(frame) = stack.last_mut() {
            let out = graph.get(&frame.vertex).map(Vec::as_slice).unwrap_or_default();
            let Some(edge) = out.get(frame.next_edge) else {
                if let Some(finished) = stack.pop() {
                    on_path.remove(&finished.vertex);
                    done.insert(finished.vertex);
                }
                continue;
            };
            frame.next_edge += 1;
            frame.via = edge.via.clone();

            if let Some(&position) = on_path.get(&edge.to) {
                let cycle: Vec<(Holder, Option<LockId>)> = stack[position..]
                    .iter()
                    .map(|f| (f.vertex.clone(), f.via.clone()))
                    .collect();
                if let Some(chain) = chain_from_cycle(&cycle) {
                    if seen.insert(chain.links.clone()) {
                        chains.push(chain);
                    }
                }
            } else if !done.contains(&edge.to) {
                on_path.insert(edge.to.clone(), stack.len());
                stack.push(Frame {
                    vertex: edge.to.clone(),
                    next_edge: 0,
                    via: None,
                });
            }
        }
    }

    chains
}

#[cfg(test)]
#[path = "deadlock_tests.rs"]
mod tests;
