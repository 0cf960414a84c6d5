// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collaborators of the coordinator: response delivery, address lookup and
//! recovery handshakes

pub mod fake;
pub mod traits;

pub use traits::{HandshakeSource, NodeResolver, ResponseSink};

pub use fake::{FakeHandshakeSource, FakeResponseSink};
