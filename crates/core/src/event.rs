// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Responses the coordinator sends back to client nodes

use crate::lock::{Holder, LockId, LockLevel, NodeId, ThreadContext};
use serde::{Deserialize, Serialize};

/// A response addressed to a holder of one lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEvent {
    pub lock_id: LockId,
    /// Awards, refusals and wait timeouts address a thread; recalls address a
    /// whole node
    pub recipient: Holder,
    pub kind: LockEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LockEventKind {
    /// The lock was granted. A greedy award belongs to the node, not the thread.
    Award { level: LockLevel, greedy: bool },
    /// The node must give back its node-wide grant held at `level`
    Recall { level: LockLevel },
    /// A timed wait expired before any notify
    WaitTimeout { level: LockLevel },
    /// A try-lock could not be granted within its timeout
    CannotAward { level: LockLevel },
}

impl LockEvent {
    pub fn award(lock_id: LockId, context: &ThreadContext, level: LockLevel, greedy: bool) -> Self {
        Self {
            lock_id,
            recipient: context.holder(),
            kind: LockEventKind::Award { level, greedy },
        }
    }

    pub fn recall(lock_id: LockId, node: NodeId, level: LockLevel) -> Self {
        Self {
            lock_id,
            recipient: Holder::Greedy(node),
            kind: LockEventKind::Recall { level },
        }
    }

    pub fn wait_timeout(lock_id: LockId, context: &ThreadContext, level: LockLevel) -> Self {
        Self {
            lock_id,
            recipient: context.holder(),
            kind: LockEventKind::WaitTimeout { level },
        }
    }

    pub fn cannot_award(lock_id: LockId, context: &ThreadContext, level: LockLevel) -> Self {
        Self {
            lock_id,
            recipient: context.holder(),
            kind: LockEventKind::CannotAward { level },
        }
    }

    /// Node the response must be delivered to
    pub fn node(&self) -> &NodeId {
        self.recipient.node()
    }

    /// Get the event name for logging and routing
    pub fn name(&self) -> &'static str {
        match self.kind {
            LockEventKind::Award { greedy: true, .. } => "lock:award:greedy",
            LockEventKind::Award { greedy: false, .. } => "lock:award",
            LockEventKind::Recall { .. } => "lock:recall",
            LockEventKind::WaitTimeout { .. } => "lock:wait_timeout",
            LockEventKind::CannotAward { .. } => "lock:cannot_award",
        }
    }

    pub fn level(&self) -> LockLevel {
        match self.kind {
            LockEventKind::Award { level, .. }
            | LockEventKind::Recall { level }
            | LockEventKind::WaitTimeout { level }
            | LockEventKind::CannotAward { level } => level,
        }
    }

    pub fn is_award(&self) -> bool {
        matches!(self.kind, LockEventKind::Award { .. })
    }

    pub fn is_recall(&self) -> bool {
        matches!(self.kind, LockEventKind::Recall { .. })
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
