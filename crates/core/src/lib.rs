// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dlm-core: lock coordination for a cluster of client nodes
//!
//! This crate provides:
//! - Per-lock state machines returning effects instead of doing I/O
//! - A coordinator owning the lock table, wait timers and lifecycle
//! - Recovery from client handshakes after a coordinator restart
//! - Deadlock detection and table snapshots for operators

pub mod clock;
pub mod config;
pub mod error;
pub mod id;

pub mod adapters;

// State machines (order matters for dependencies)
pub mod event;
pub mod effect;
pub mod lock;
pub mod scheduler;

pub mod coordinator;
pub mod deadlock;
pub mod driver;
pub mod recovery;
pub mod snapshot;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{CoordinatorConfig, LockPolicy};
pub use effect::Effect;
pub use error::{ConfigError, HandshakeError, LifecycleError, LockError, RecoveryError};
pub use event::{LockEvent, LockEventKind};
pub use id::{IdGen, SequentialIdGen, TimerId, UuidIdGen};
pub use lock::{
    CommittedHold, CommittedRequest, CommittedWait, Holder, Lock, LockId, LockLevel, NodeId,
    RecallCommit, ThreadContext, ThreadId,
};

pub use adapters::{
    FakeHandshakeSource, FakeResponseSink, HandshakeSource, NodeResolver, ResponseSink,
};

pub use coordinator::{Lifecycle, LockCoordinator};
pub use deadlock::{find_deadlocks, DeadlockChain, DeadlockLink};
pub use driver::{spawn_timer_driver, LockStats};
pub use recovery::{
    reestablish_client, recover, ClientHandshake, HeldLock, RecoverySummary, WaitingLock,
};
pub use snapshot::{HolderSnapshot, LockSnapshot, PendingSnapshot, WaiterSnapshot};
