// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handshake source for a cold start.

use async_trait::async_trait;
use dlm_core::{ClientHandshake, HandshakeError, HandshakeSource};

/// No client has anything to report
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHandshakes;

#[async_trait]
impl HandshakeSource for NoHandshakes {
    async fn handshakes(&self) -> Result<Vec<ClientHandshake>, HandshakeError> {
        Ok(Vec::new())
    }
}
