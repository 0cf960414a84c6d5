// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collaborator traits the coordinator talks through

use crate::error::HandshakeError;
use crate::event::LockEvent;
use crate::lock::NodeId;
use crate::recovery::ClientHandshake;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

// =============================================================================
// Response sink
// =============================================================================

/// Outbound channel for lock responses.
///
/// `push` is called while the originating lock is held, so it must hand the
/// event off without blocking. Events for one lock arrive in the order the
/// coordinator produced them.
pub trait ResponseSink: Send + Sync {
    fn push(&self, event: LockEvent);
}

impl<S: ResponseSink + ?Sized> ResponseSink for Arc<S> {
    fn push(&self, event: LockEvent) {
        (**self).push(event)
    }
}

// =============================================================================
// Node resolver
// =============================================================================

/// Maps node ids to printable network addresses for diagnostics
pub trait NodeResolver: Send + Sync {
    fn address(&self, node: &NodeId) -> Option<String>;
}

impl NodeResolver for HashMap<NodeId, String> {
    fn address(&self, node: &NodeId) -> Option<String> {
        self.get(node).cloned()
    }
}

impl<R: NodeResolver + ?Sized> NodeResolver for Arc<R> {
    fn address(&self, node: &NodeId) -> Option<String> {
        (**self).address(node)
    }
}

// =============================================================================
// Handshake source
// =============================================================================

/// Supplies the lock state each reconnecting client reports during recovery
#[async_trait]
pub trait HandshakeSource: Send + Sync {
    async fn handshakes(&self) -> Result<Vec<ClientHandshake>, HandshakeError>;
}
