// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the lock coordinator

use crate::coordinator::Lifecycle;
use crate::lock::{Holder, LockId, LockLevel, NodeId, ThreadContext};
use std::path::PathBuf;
use thiserror::Error;

/// A client broke the locking protocol.
///
/// Every variant names the node at fault; the caller decides whether to
/// disconnect it. The table is left exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    #[error("{holder} holds {lock_id} at READ and asked for {requested}: upgrades are not supported")]
    UpgradeNotSupported {
        lock_id: LockId,
        holder: Holder,
        requested: LockLevel,
    },

    #[error("{holder} already holds {lock_id}")]
    AlreadyHeld { lock_id: LockId, holder: Holder },

    #[error("{context} is already waiting on {lock_id}")]
    AlreadyWaiting {
        lock_id: LockId,
        context: ThreadContext,
    },

    #[error("{context} does not hold {lock_id}")]
    NotHolder {
        lock_id: LockId,
        context: ThreadContext,
    },

    #[error("{holder} reestablished {lock_id} twice")]
    DuplicateReestablish { lock_id: LockId, holder: Holder },

    #[error("cannot reestablish {holder} on {lock_id} at {level}: {reason}")]
    ReestablishConflict {
        lock_id: LockId,
        holder: Holder,
        level: LockLevel,
        reason: &'static str,
    },

    #[error("{node} holds no node-wide grant on {lock_id}")]
    NoNodeGrant { lock_id: LockId, node: NodeId },

    #[error("recall commit from {node} for {lock_id} rejected: {reason}")]
    InvalidRecallCommit {
        lock_id: LockId,
        node: NodeId,
        reason: &'static str,
    },

    #[error("{operation} from {node} is only valid while {expected}, coordinator is {actual}")]
    WrongLifecycle {
        operation: &'static str,
        node: NodeId,
        expected: Lifecycle,
        actual: Lifecycle,
    },
}

impl LockError {
    /// Node whose request broke the protocol
    pub fn node(&self) -> &NodeId {
        match self {
            LockError::UpgradeNotSupported { holder, .. }
            | LockError::AlreadyHeld { holder, .. }
            | LockError::DuplicateReestablish { holder, .. }
            | LockError::ReestablishConflict { holder, .. } => holder.node(),
            LockError::AlreadyWaiting { context, .. } | LockError::NotHolder { context, .. } => {
                &context.node
            }
            LockError::NoNodeGrant { node, .. }
            | LockError::InvalidRecallCommit { node, .. }
            | LockError::WrongLifecycle { node, .. } => node,
        }
    }
}

/// Coordinator lifecycle transitions requested out of order
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {operation} a coordinator that is {actual}")]
pub struct LifecycleError {
    pub operation: &'static str,
    pub actual: Lifecycle,
}

/// Errors loading coordinator configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors reading client handshakes
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed handshake {origin}: {message}")]
    Malformed { origin: String, message: String },
}

/// Errors replaying client state during recovery
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("node {node} reported inconsistent lock state: {source}")]
    Inconsistent {
        node: NodeId,
        #[source]
        source: LockError,
    },

    #[error("handshake source failed: {0}")]
    Source(#[from] HandshakeError),
}
