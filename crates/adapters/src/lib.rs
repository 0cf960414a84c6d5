// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters connecting the lock coordinator to real I/O

pub mod handshake;
pub mod resolver;
pub mod sink;
pub mod traced;

pub use handshake::{DirHandshakeSource, NoHandshakes};
pub use resolver::{NoOpNodeResolver, StaticNodeResolver};
pub use sink::{channel, ChannelResponseSink, NoOpResponseSink};
pub use traced::{TracedHandshakeSource, TracedNodeResolver, TracedResponseSink};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use handshake::write_handshake;
