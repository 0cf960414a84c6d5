//! Shared harness for the behavioral specs
#![allow(dead_code)]

use std::fmt::Debug;

pub use dlm_core::{
    ClientHandshake, CoordinatorConfig, FakeClock, FakeResponseSink, Holder, Lifecycle,
    LockCoordinator, LockError, LockEvent, LockEventKind, LockId, LockLevel, LockPolicy, NodeId,
    RecallCommit, SequentialIdGen, ThreadContext,
};
pub use std::collections::HashMap;
pub use std::time::Duration;

pub const READ: LockLevel = LockLevel::Read;
pub const WRITE: LockLevel = LockLevel::Write;

pub type TestCoordinator = LockCoordinator<FakeResponseSink, FakeClock, SequentialIdGen>;

/// A coordinator plus the clients talking to it
pub struct Cluster {
    pub coordinator: TestCoordinator,
}

impl Cluster {
    /// A fresh coordinator still accepting reestablished state
    pub fn recovering() -> Self {
        Self::with_config(CoordinatorConfig::default())
    }

    /// A fresh coordinator that is already granting
    pub fn started() -> Self {
        let cluster = Self::recovering();
        cluster.coordinator.start().unwrap();
        cluster
    }

    pub fn altruistic() -> Self {
        let cluster =
            Self::with_config(CoordinatorConfig::default().with_lock_policy(LockPolicy::Altruistic));
        cluster.coordinator.start().unwrap();
        cluster
    }

    pub fn with_config(config: CoordinatorConfig) -> Self {
        Self {
            coordinator: LockCoordinator::new(
                config,
                FakeResponseSink::new(),
                FakeClock::new(),
                SequentialIdGen::default(),
            ),
        }
    }

    pub fn request(&self, lock: &str, node: &str, thread: u64, level: LockLevel) -> Result<(), LockError> {
        self.coordinator
            .request_lock(&LockId::new(lock), &ThreadContext::new(node, thread), level)
    }

    pub fn try_request(
        &self,
        lock: &str,
        node: &str,
        thread: u64,
        level: LockLevel,
        timeout: Duration,
    ) -> Result<(), LockError> {
        self.coordinator.try_request_lock(
            &LockId::new(lock),
            &ThreadContext::new(node, thread),
            level,
            timeout,
        )
    }

    pub fn recall_commit(&self, lock: &str, node: &str, commit: RecallCommit) -> Result<(), LockError> {
        self.coordinator
            .recall_commit(&LockId::new(lock), &NodeId::new(node), &commit)
    }

    pub fn unlock_node(&self, lock: &str, node: &str) {
        self.coordinator.unlock(&LockId::new(lock), &Holder::greedy(node));
    }

    pub fn unlock_thread(&self, lock: &str, node: &str, thread: u64) {
        self.coordinator
            .unlock(&LockId::new(lock), &Holder::per_thread(node, thread));
    }

    /// Responses pushed since the last call
    pub fn responses(&self) -> Vec<LockEvent> {
        self.coordinator.sink().take()
    }

    /// Holders of `lock` with their levels, in key order
    pub fn holders(&self, lock: &str) -> Vec<(Holder, LockLevel)> {
        self.coordinator
            .inspect(&LockId::new(lock))
            .map(|l| l.holders().map(|(h, hold)| (h.clone(), hold.level)).collect())
            .unwrap_or_default()
    }

    /// Threads queued on `lock`, front first
    pub fn pending(&self, lock: &str) -> Vec<ThreadContext> {
        self.coordinator
            .inspect(&LockId::new(lock))
            .map(|l| l.pending().map(|p| p.context.clone()).collect())
            .unwrap_or_default()
    }
}

pub fn award(lock: &str, node: &str, thread: u64, level: LockLevel, greedy: bool) -> LockEvent {
    LockEvent::award(LockId::new(lock), &ThreadContext::new(node, thread), level, greedy)
}

pub fn recall(lock: &str, node: &str, level: LockLevel) -> LockEvent {
    LockEvent::recall(LockId::new(lock), NodeId::new(node), level)
}

pub fn cannot_award(lock: &str, node: &str, thread: u64, level: LockLevel) -> LockEvent {
    LockEvent::cannot_award(LockId::new(lock), &ThreadContext::new(node, thread), level)
}

/// Fluent assertions on operation results
pub trait Outcome<T> {
    fn passes(self) -> T;
    fn fails(self) -> LockError;
}

impl<T: Debug> Outcome<T> for Result<T, LockError> {
    fn passes(self) -> T {
        match self {
            Ok(value) => value,
            Err(e) => panic!("expected success, got: {e}"),
        }
    }

    fn fails(self) -> LockError {
        match self {
            Ok(value) => panic!("expected a protocol violation, got: {value:?}"),
            Err(e) => e,
        }
    }
}
