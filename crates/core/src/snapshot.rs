// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Management view of the lock table

use crate::adapters::NodeResolver;
use crate::lock::{Holder, Lock, LockId, LockLevel, NodeId, ThreadContext, ThreadId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// State of one lock at the moment of the snapshot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSnapshot {
    pub lock_id: LockId,
    pub holders: Vec<HolderSnapshot>,
    pub pending: Vec<PendingSnapshot>,
    pub waiters: Vec<WaiterSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderSnapshot {
    pub level: LockLevel,
    pub node: NodeId,
    pub address: String,
    /// `None` for a node-wide grant
    pub thread: Option<ThreadId>,
    pub greedy: bool,
    pub acquired_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSnapshot {
    pub level: LockLevel,
    pub node: NodeId,
    pub address: String,
    pub thread: ThreadId,
    pub requested_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaiterSnapshot {
    /// Human-readable timeout, e.g. "5s" or "indefinite"
    pub timer: String,
    pub level: LockLevel,
    pub node: NodeId,
    pub address: String,
    pub thread: ThreadId,
    pub started_at: DateTime<Utc>,
}

impl LockSnapshot {
    /// Describe `lock`, resolving node addresses through `resolver`
    pub fn capture(lock: &Lock, resolver: &impl NodeResolver, unresolved: &str) -> Self {
        let address =
            |node: &NodeId| resolver.address(node).unwrap_or_else(|| unresolved.to_string());

        let holders = lock
            .holders()
            .map(|(holder, hold)| HolderSnapshot {
                level: hold.level,
                node: holder.node().clone(),
                address: address(holder.node()),
                thread: holder.thread(),
                greedy: matches!(holder, Holder::Greedy(_)),
                acquired_at: hold.since,
            })
            .collect();

        let pending = lock
            .pending()
            .map(|request| PendingSnapshot {
                level: request.level,
                node: request.context.node.clone(),
                address: address(&request.context.node),
                thread: request.context.thread,
                requested_at: request.since,
            })
            .collect();

        let waiters = lock
            .waiters()
            .map(|waiter| WaiterSnapshot {
                timer: describe_timeout(waiter.timeout),
                level: waiter.level,
                node: waiter.context.node.clone(),
                address: address(&waiter.context.node),
                thread: waiter.context.thread,
                started_at: waiter.since,
            })
            .collect();

        Self {
            lock_id: lock.id().clone(),
            holders,
            pending,
            waiters,
        }
    }

    /// Whether `context` holds this lock, per-thread or through its node
    pub fn is_held_by(&self, context: &ThreadContext) -> bool {
        self.holders
            .iter()
            .any(|h| h.node == context.node && h.thread.map_or(true, |t| t == context.thread))
    }
}

fn describe_timeout(timeout: Option<Duration>) -> String {
    match timeout {
        Some(duration) => humantime::format_duration(duration).to_string(),
        None => "indefinite".to_string(),
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
