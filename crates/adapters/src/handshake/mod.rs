// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sources of client handshakes for recovery

mod dir;
mod noop;

pub use dir::DirHandshakeSource;
pub use noop::NoHandshakes;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::write_handshake;
