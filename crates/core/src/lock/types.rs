// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identities and levels shared by every lock operation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cluster-wide identifier of a lock
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockId(pub String);

impl LockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a client node connected to the coordinator
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Thread number, unique within its node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub u64);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single thread on a single node
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThreadContext {
    pub node: NodeId,
    pub thread: ThreadId,
}

impl ThreadContext {
    pub fn new(node: impl Into<String>, thread: u64) -> Self {
        Self {
            node: NodeId::new(node),
            thread: ThreadId(thread),
        }
    }

    /// Holder key this thread uses for a per-thread grant
    pub fn holder(&self) -> Holder {
        Holder::PerThread(self.node.clone(), self.thread)
    }
}

impl fmt::Display for ThreadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.node, self.thread)
    }
}

/// Key under which a grant is recorded.
///
/// A greedy grant belongs to a whole node and is keyed by the node alone, so a
/// node can never hold both a greedy and a per-thread grant under one key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Holder {
    Greedy(NodeId),
    PerThread(NodeId, ThreadId),
}

impl Holder {
    pub fn greedy(node: impl Into<String>) -> Self {
        Holder::Greedy(NodeId::new(node))
    }

    pub fn per_thread(node: impl Into<String>, thread: u64) -> Self {
        Holder::PerThread(NodeId::new(node), ThreadId(thread))
    }

    pub fn node(&self) -> &NodeId {
        match self {
            Holder::Greedy(node) | Holder::PerThread(node, _) => node,
        }
    }

    /// Thread number, `None` for a node-wide grant
    pub fn thread(&self) -> Option<ThreadId> {
        match self {
            Holder::Greedy(_) => None,
            Holder::PerThread(_, thread) => Some(*thread),
        }
    }

    pub fn is_greedy(&self) -> bool {
        matches!(self, Holder::Greedy(_))
    }
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Holder::Greedy(node) => write!(f, "{}/*", node),
            Holder::PerThread(node, thread) => write!(f, "{}/{}", node, thread),
        }
    }
}

/// Requested or granted access level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockLevel {
    Read,
    Write,
    SynchronousWrite,
    /// Advisory only, never recorded
    Concurrent,
}

impl LockLevel {
    pub fn is_read(self) -> bool {
        matches!(self, LockLevel::Read)
    }

    /// Both write flavours exclude every other holder
    pub fn is_write(self) -> bool {
        matches!(self, LockLevel::Write | LockLevel::SynchronousWrite)
    }

    pub fn is_concurrent(self) -> bool {
        matches!(self, LockLevel::Concurrent)
    }

    /// Only READ shares with READ
    pub fn is_compatible_with(self, other: LockLevel) -> bool {
        self.is_read() && other.is_read()
    }

    /// Whether a grant at this level already satisfies a request at `requested`
    pub fn covers(self, requested: LockLevel) -> bool {
        self.is_write() || (self.is_read() && requested.is_read())
    }
}

impl fmt::Display for LockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LockLevel::Read => "READ",
            LockLevel::Write => "WRITE",
            LockLevel::SynchronousWrite => "SYNCHRONOUS_WRITE",
            LockLevel::Concurrent => "CONCURRENT",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
