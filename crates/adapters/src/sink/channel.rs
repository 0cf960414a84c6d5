// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Response sink backed by an unbounded tokio channel

use dlm_core::{LockEvent, ResponseSink};
use tokio::sync::mpsc;

/// Hands responses to an async consumer.
///
/// The channel is unbounded so `push` never blocks while the coordinator
/// holds a lock's mutex.
#[derive(Clone)]
pub struct ChannelResponseSink {
    tx: mpsc::UnboundedSender<LockEvent>,
}

/// A sink and the receiving end its responses arrive on
pub fn channel() -> (ChannelResponseSink, mpsc::UnboundedReceiver<LockEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelResponseSink { tx }, rx)
}

impl ResponseSink for ChannelResponseSink {
    fn push(&self, event: LockEvent) {
        if let Err(mpsc::error::SendError(event)) = self.tx.send(event) {
            tracing::warn!(
                lock = %event.lock_id,
                recipient = %event.recipient,
                "response dropped, receiver closed"
            );
        }
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
