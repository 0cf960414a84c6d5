// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Response delivery adapters

mod channel;
mod noop;

pub use channel::{channel, ChannelResponseSink};
pub use noop::NoOpResponseSink;
