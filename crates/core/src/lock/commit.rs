// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State a node hands back when it gives up a recalled node-wide grant

use super::types::{LockLevel, ThreadId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A thread still using the lock locally
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedHold {
    pub thread: ThreadId,
    pub level: LockLevel,
}

/// A thread in the node's local wait set
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedWait {
    pub thread: ThreadId,
    pub level: LockLevel,
    /// `None` waits indefinitely
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

/// A thread queued locally behind the node's grant
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedRequest {
    pub thread: ThreadId,
    pub level: LockLevel,
    /// Set for try-locks: how long the thread is still willing to wait
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub try_timeout: Option<Duration>,
}

/// Everything a recalled node was doing under its node-wide grant.
///
/// Once committed, the grant becomes per-thread holds, waiters and queued
/// requests on the coordinator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecallCommit {
    #[serde(default)]
    pub holds: Vec<CommittedHold>,
    #[serde(default)]
    pub waits: Vec<CommittedWait>,
    #[serde(default)]
    pub pending: Vec<CommittedRequest>,
}

impl RecallCommit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hold(mut self, thread: u64, level: LockLevel) -> Self {
        self.holds.push(CommittedHold {
            thread: ThreadId(thread),
            level,
        });
        self
    }

    pub fn with_wait(mut self, thread: u64, level: LockLevel, timeout: Option<Duration>) -> Self {
        self.waits.push(CommittedWait {
            thread: ThreadId(thread),
            level,
            timeout,
        });
        self
    }

    pub fn with_pending(mut self, thread: u64, level: LockLevel) -> Self {
        self.pending.push(CommittedRequest {
            thread: ThreadId(thread),
            level,
            try_timeout: None,
        });
        self
    }

    pub fn with_try_pending(mut self, thread: u64, level: LockLevel, timeout: Duration) -> Self {
        self.pending.push(CommittedRequest {
            thread: ThreadId(thread),
            level,
            try_timeout: Some(timeout),
        });
        self
    }

    /// Every thread the commit mentions, in listing order
    pub fn threads(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.holds
            .iter()
            .map(|h| h.thread)
            .chain(self.waits.iter().map(|w| w.thread))
            .chain(self.pending.iter().map(|p| p.thread))
    }
}
