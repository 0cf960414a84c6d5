// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use async_trait::async_trait;
use dlm_core::{
    ClientHandshake, HandshakeError, HandshakeSource, LockEvent, NodeId, NodeResolver,
    ResponseSink,
};
use tracing::Instrument;

/// Wrapper that logs every response before handing it on
#[derive(Clone)]
pub struct TracedResponseSink<S> {
    inner: S,
}

impl<S> TracedResponseSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: ResponseSink> ResponseSink for TracedResponseSink<S> {
    fn push(&self, event: LockEvent) {
        tracing::info!(
            lock = %event.lock_id,
            recipient = %event.recipient,
            level = %event.level(),
            "{}",
            event.name()
        );
        self.inner.push(event);
    }
}

/// Wrapper that adds tracing to any HandshakeSource
#[derive(Clone)]
pub struct TracedHandshakeSource<H> {
    inner: H,
}

impl<H> TracedHandshakeSource<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<H: HandshakeSource> HandshakeSource for TracedHandshakeSource<H> {
    async fn handshakes(&self) -> Result<Vec<ClientHandshake>, HandshakeError> {
        let span = tracing::info_span!("handshake.load");

        async {
            tracing::info!("loading client handshakes");

            let start = std::time::Instant::now();
            let result = self.inner.handshakes().await;
            let elapsed = start.elapsed();

            match &result {
                Ok(handshakes) => {
                    let holds: usize = handshakes.iter().map(|h| h.holds.len()).sum();
                    let waits: usize = handshakes.iter().map(|h| h.waits.len()).sum();
                    tracing::info!(
                        clients = handshakes.len(),
                        holds,
                        waits,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "handshakes loaded"
                    );
                }
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "handshake load failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that logs nodes with no known address
#[derive(Clone)]
pub struct TracedNodeResolver<R> {
    inner: R,
}

impl<R> TracedNodeResolver<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: NodeResolver> NodeResolver for TracedNodeResolver<R> {
    fn address(&self, node: &NodeId) -> Option<String> {
        let address = self.inner.address(node);
        if address.is_none() {
            tracing::debug!(%node, "no address for node");
        }
        address
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
