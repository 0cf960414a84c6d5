// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake collaborators for testing

use super::traits::*;
use crate::error::HandshakeError;
use crate::event::LockEvent;
use crate::lock::NodeId;
use crate::recovery::ClientHandshake;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Records every pushed event
#[derive(Clone, Default)]
pub struct FakeResponseSink {
    events: Arc<Mutex<Vec<LockEvent>>>,
}

impl FakeResponseSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events pushed so far
    pub fn events(&self) -> Vec<LockEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Drain the recorded events
    pub fn take(&self) -> Vec<LockEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Events addressed to one node
    pub fn events_for(&self, node: &NodeId) -> Vec<LockEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.node() == node)
            .collect()
    }
}

impl ResponseSink for FakeResponseSink {
    fn push(&self, event: LockEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

/// Serves a fixed set of handshakes, or a fixed failure
#[derive(Clone, Default)]
pub struct FakeHandshakeSource {
    handshakes: Vec<ClientHandshake>,
    fail_with: Option<String>,
}

impl FakeHandshakeSource {
    pub fn new(handshakes: Vec<ClientHandshake>) -> Self {
        Self {
            handshakes,
            fail_with: None,
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            handshakes: Vec::new(),
            fail_with: Some(message.into()),
        }
    }
}

#[async_trait]
impl HandshakeSource for FakeHandshakeSource {
    async fn handshakes(&self) -> Result<Vec<ClientHandshake>, HandshakeError> {
        match &self.fail_with {
            Some(message) => Err(HandshakeError::Malformed {
                origin: "fake".to_string(),
                message: message.clone(),
            }),
            None => Ok(self.handshakes.clone()),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
