// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op response sink for when nobody listens.

use dlm_core::{LockEvent, ResponseSink};

/// Response sink that discards every event.
///
/// Used for dry runs that only replay handshakes and report the table.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpResponseSink;

impl NoOpResponseSink {
    pub fn new() -> Self {
        Self
    }
}

impl ResponseSink for NoOpResponseSink {
    fn push(&self, _event: LockEvent) {}
}
