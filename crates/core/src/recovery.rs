// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rebuilding the lock table from reconnecting clients
//!
//! After a restart the coordinator knows nothing. Each client that reconnects
//! reports what it holds and what it waits for; the coordinator records that
//! state while `Recovering` and starts once every client has reported.

use crate::adapters::{HandshakeSource, ResponseSink};
use crate::clock::Clock;
use crate::coordinator::LockCoordinator;
use crate::error::{HandshakeError, LockError, RecoveryError};
use crate::id::IdGen;
use crate::lock::{Holder, LockId, LockLevel, NodeId, ThreadContext, ThreadId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Everything one client reports when it reconnects
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientHandshake {
    pub node: NodeId,
    #[serde(default)]
    pub holds: Vec<HeldLock>,
    #[serde(default)]
    pub waits: Vec<WaitingLock>,
}

/// A grant the client holds. No thread means a node-wide grant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldLock {
    pub lock_id: LockId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<ThreadId>,
    pub level: LockLevel,
}

/// A thread parked in a lock's wait set
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingLock {
    pub lock_id: LockId,
    pub thread: ThreadId,
    pub level: LockLevel,
    /// No timeout means an indefinite wait
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

impl ClientHandshake {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: NodeId::new(node),
            holds: Vec::new(),
            waits: Vec::new(),
        }
    }

    pub fn with_hold(mut self, lock_id: &str, thread: u64, level: LockLevel) -> Self {
        self.holds.push(HeldLock {
            lock_id: LockId::new(lock_id),
            thread: Some(ThreadId(thread)),
            level,
        });
        self
    }

    pub fn with_node_hold(mut self, lock_id: &str, level: LockLevel) -> Self {
        self.holds.push(HeldLock {
            lock_id: LockId::new(lock_id),
            thread: None,
            level,
        });
        self
    }

    pub fn with_wait(
        mut self,
        lock_id: &str,
        thread: u64,
        level: LockLevel,
        timeout: Option<Duration>,
    ) -> Self {
        self.waits.push(WaitingLock {
            lock_id: LockId::new(lock_id),
            thread: ThreadId(thread),
            level,
            timeout,
        });
        self
    }

    /// Parse a handshake; `origin` names it in errors
    pub fn from_json(origin: &str, json: &str) -> Result<Self, HandshakeError> {
        serde_json::from_str(json).map_err(|e| HandshakeError::Malformed {
            origin: origin.to_string(),
            message: e.to_string(),
        })
    }

    fn holder(&self, held: &HeldLock) -> Holder {
        match held.thread {
            Some(thread) => Holder::PerThread(self.node.clone(), thread),
            None => Holder::Greedy(self.node.clone()),
        }
    }
}

/// Outcome of a recovery pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoverySummary {
    pub clients: usize,
    pub holds: usize,
    pub waits: usize,
    /// Clients whose state was refused, with the first violation found
    pub rejected: Vec<(NodeId, LockError)>,
}

/// Record one client's reported state
pub fn reestablish_client<S: ResponseSink, C: Clock, G: IdGen>(
    coordinator: &LockCoordinator<S, C, G>,
    handshake: &ClientHandshake,
) -> Result<(), RecoveryError> {
    let inconsistent = |source| RecoveryError::Inconsistent {
        node: handshake.node.clone(),
        source,
    };

    for held in &handshake.holds {
        coordinator
            .reestablish_lock(&held.lock_id, &handshake.holder(held), held.level)
            .map_err(inconsistent)?;
    }
    for waiting in &handshake.waits {
        let context = ThreadContext {
            node: handshake.node.clone(),
            thread: waiting.thread,
        };
        coordinator
            .reestablish_wait(&waiting.lock_id, &context, waiting.level, waiting.timeout)
            .map_err(inconsistent)?;
    }
    Ok(())
}

/// Replay every handshake from `source` into a recovering coordinator.
///
/// A client whose report is inconsistent is dropped from the table and
/// listed in the summary; the others are kept. Does not start the
/// coordinator.
pub async fn recover<S, C, G, H>(
    coordinator: &LockCoordinator<S, C, G>,
    source: &H,
) -> Result<RecoverySummary, RecoveryError>
where
    S: ResponseSink,
    C: Clock,
    G: IdGen,
    H: HandshakeSource,
{
    let handshakes = source.handshakes().await?;
    let mut summary = RecoverySummary::default();

    for handshake in &handshakes {
        match reestablish_client(coordinator, handshake) {
            Ok(()) => {
                summary.clients += 1;
                summary.holds += handshake.holds.len();
                summary.waits += handshake.waits.len();
            }
            Err(RecoveryError::Inconsistent { node, source }) => {
                warn!(%node, error = %source, "refusing inconsistent client state");
                coordinator.clear_all_locks_for(&node);
                summary.rejected.push((node, source));
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        clients = summary.clients,
        holds = summary.holds,
        waits = summary.waits,
        rejected = summary.rejected.len(),
        "recovered lock state"
    );
    Ok(summary)
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
