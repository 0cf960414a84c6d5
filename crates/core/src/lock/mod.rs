// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock grant state
//!
//! This module provides:
//! - **types** - Identities of locks, nodes, threads and grant keys
//! - **RecallCommit** - State a node returns with a recalled grant
//! - **Lock** - Holders, FIFO pending queue and wait set of one lock
//! - **LockTable** - Concurrent map of live locks

pub mod commit;
pub mod state;
pub mod table;
pub mod types;

pub use commit::{CommittedHold, CommittedRequest, CommittedWait, RecallCommit};
pub use state::{GrantMode, Hold, Lock, PendingRequest, Waiter};
pub use table::{DeferredRequest, LockTable};
pub use types::{Holder, LockId, LockLevel, NodeId, ThreadContext, ThreadId};
