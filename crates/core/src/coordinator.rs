// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock coordinator
//!
//! The single entry point client-facing transport calls into. It owns the
//! lock table, the wait-timer queue and the response sink, and drives the
//! Recovering → Started → Stopped lifecycle.
//!
//! Lock ordering: table guard, then a lock's mutex, then the timer queue.
//! Responses are pushed while the lock's mutex is held, so responses for one
//! lock reach the sink in the order they were produced.

use crate::adapters::{NodeResolver, ResponseSink};
use crate::clock::{Clock, SystemClock};
use crate::config::CoordinatorConfig;
use crate::deadlock::{find_deadlocks, DeadlockChain};
use crate::driver::LockStats;
use crate::effect::Effect;
use crate::error::{LifecycleError, LockError};
use crate::id::{IdGen, UuidIdGen};
use crate::lock::{
    DeferredRequest, GrantMode, Holder, Lock, LockId, LockLevel, LockTable, NodeId, RecallCommit,
    ThreadContext,
};
use crate::scheduler::Scheduler;
use crate::snapshot::LockSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Coordinator lifecycle. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Accepting reestablished state from reconnecting clients
    Recovering,
    /// Granting normally
    Started,
    /// Table frozen for handoff
    Stopped,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifecycle::Recovering => "recovering",
            Lifecycle::Started => "started",
            Lifecycle::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

pub struct LockCoordinator<S, C = SystemClock, G = UuidIdGen> {
    config: CoordinatorConfig,
    table: LockTable,
    timers: Mutex<Scheduler>,
    sink: S,
    clock: C,
    ids: G,
}

impl<S: ResponseSink, C: Clock, G: IdGen> LockCoordinator<S, C, G> {
    /// A coordinator with an empty table, in the `Recovering` state
    pub fn new(config: CoordinatorConfig, sink: S, clock: C, ids: G) -> Self {
        Self {
            config,
            table: LockTable::new(),
            timers: Mutex::new(Scheduler::new()),
            sink,
            clock,
            ids,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.table.lifecycle()
    }

    /// Number of locks with any holder, pending request or waiter
    pub fn lock_count(&self) -> usize {
        self.table.len()
    }

    pub fn has_pending(&self, lock_id: &LockId) -> bool {
        self.table
            .with_lock(lock_id, |_, lock| lock.has_pending())
            .unwrap_or(false)
    }

    /// Copy of one lock's state
    pub fn inspect(&self, lock_id: &LockId) -> Option<Lock> {
        self.table.with_lock(lock_id, |_, lock| lock.clone())
    }

    /// Number of armed wait and try-lock timers
    pub fn armed_timers(&self) -> usize {
        self.timers().len()
    }

    // === Client operations ===

    /// Ask for a lock on behalf of a thread.
    ///
    /// The outcome arrives through the sink; `Ok` only means the request was
    /// accepted. Requests received while recovering are checked against the
    /// reestablished state, held back, and replayed in arrival order when the
    /// coordinator starts.
    pub fn request_lock(
        &self,
        lock_id: &LockId,
        context: &ThreadContext,
        level: LockLevel,
    ) -> Result<(), LockError> {
        self.submit("request_lock", lock_id, context, level, None)
    }

    /// Ask for a lock, giving up after `timeout`.
    ///
    /// A refusal arrives through the sink as a cannot-award response. Held
    /// back like [`Self::request_lock`] while recovering; the timeout then
    /// runs from the replay.
    pub fn try_request_lock(
        &self,
        lock_id: &LockId,
        context: &ThreadContext,
        level: LockLevel,
        timeout: Duration,
    ) -> Result<(), LockError> {
        self.submit("try_request_lock", lock_id, context, level, Some(timeout))
    }

    /// Give back the grant recorded under `holder`.
    ///
    /// Unknown holders are logged and ignored.
    pub fn unlock(&self, lock_id: &LockId, holder: &Holder) {
        if self.table.lifecycle() == Lifecycle::Recovering {
            warn!(lock = %lock_id, %holder, "unlock while recovering, ignoring");
            return;
        }

        let released = self.table.with_lock(lock_id, |lifecycle, lock| {
            let effects = lock.release(holder, self.grant_mode(lifecycle), &self.clock)?;
            self.apply(effects);
            Some(())
        });
        match released {
            Some(Some(())) => debug!(lock = %lock_id, %holder, "released"),
            Some(None) => warn!(lock = %lock_id, %holder, "unlock by a non-holder, ignoring"),
            None => warn!(lock = %lock_id, %holder, "unlock of an unknown lock, ignoring"),
        }
    }

    /// Withdraw a request that is still queued
    pub fn cancel_request(&self, lock_id: &LockId, context: &ThreadContext) {
        let withdrawn = self.table.with_lock(lock_id, |lifecycle, lock| {
            let effects = lock.withdraw(context, self.grant_mode(lifecycle), &self.clock)?;
            self.apply(effects);
            Some(())
        });
        if withdrawn.flatten().is_none() {
            debug!(lock = %lock_id, %context, "no queued request to withdraw");
        }
    }

    /// Release the caller's grant and wait for a notify or the timeout.
    ///
    /// `None` waits indefinitely.
    pub fn wait(
        &self,
        lock_id: &LockId,
        context: &ThreadContext,
        timeout: Option<Duration>,
    ) -> Result<(), LockError> {
        self.table
            .with_lock(lock_id, |lifecycle, lock| {
                self.require(Lifecycle::Started, "wait", &context.node, lifecycle)?;
                let effects = lock.wait(
                    context,
                    timeout,
                    self.ids.next(),
                    self.grant_mode(lifecycle),
                    &self.clock,
                )?;
                self.apply(effects);
                Ok(())
            })
            .unwrap_or_else(|| self.missing_lock("wait", lock_id, context))
            .map_err(|e| self.reject("wait", lock_id, e))
    }

    /// Wake one waiter, or all of them. Returns the threads woken.
    pub fn notify(
        &self,
        lock_id: &LockId,
        context: &ThreadContext,
        all: bool,
    ) -> Result<Vec<ThreadContext>, LockError> {
        self.table
            .with_lock(lock_id, |lifecycle, lock| {
                self.require(Lifecycle::Started, "notify", &context.node, lifecycle)?;
                let (woken, effects) =
                    lock.notify(context, all, self.grant_mode(lifecycle), &self.clock)?;
                self.apply(effects);
                Ok(woken)
            })
            .unwrap_or_else(|| self.missing_lock("notify", lock_id, context).map(|()| Vec::new()))
            .map_err(|e| self.reject("notify", lock_id, e))
    }

    /// End a thread's wait early, as if notified. Ignored unless started.
    pub fn interrupt(&self, lock_id: &LockId, context: &ThreadContext) {
        let lifecycle = self.table.lifecycle();
        if lifecycle != Lifecycle::Started {
            warn!(lock = %lock_id, %context, %lifecycle, "interrupt while not started, ignoring");
            return;
        }

        let interrupted = self.table.with_lock(lock_id, |lifecycle, lock| {
            let effects = lock.interrupt(context, self.grant_mode(lifecycle), &self.clock)?;
            self.apply(effects);
            Some(())
        });
        if interrupted.flatten().is_none() {
            warn!(lock = %lock_id, %context, "interrupt of a thread that is not waiting, ignoring");
        }
    }

    /// Forget everything a departed node held, requested or waited for
    pub fn clear_all_locks_for(&self, node: &NodeId) {
        let mut state = self.table.exclusive();
        let mode = self.grant_mode(state.lifecycle);
        state.for_each_lock(|lock| {
            let effects = lock.clear_node(node, mode, &self.clock);
            self.apply(effects);
        });
        state.retain_deferred(|request| request.context.node != *node);
        info!(%node, locks = state.len(), "cleared node from lock table");
    }

    /// Take back a recalled node-wide grant along with the node's local
    /// holders, waiters and queued requests
    pub fn recall_commit(
        &self,
        lock_id: &LockId,
        node: &NodeId,
        commit: &RecallCommit,
    ) -> Result<(), LockError> {
        self.table
            .with_lock(lock_id, |lifecycle, lock| {
                self.require(Lifecycle::Started, "recall_commit", node, lifecycle)?;
                let effects =
                    lock.recall_commit(node, commit, &self.ids, self.grant_mode(lifecycle), &self.clock)?;
                self.apply(effects);
                info!(lock = %lock_id, %node, holds = commit.holds.len(), "recall committed");
                Ok(())
            })
            .unwrap_or_else(|| {
                self.require(Lifecycle::Started, "recall_commit", node, self.table.lifecycle())?;
                Err(LockError::NoNodeGrant {
                    lock_id: lock_id.clone(),
                    node: node.clone(),
                })
            })
            .map_err(|e| self.reject("recall_commit", lock_id, e))
    }

    // === Recovery ===

    /// Record a grant a reconnecting client already holds
    pub fn reestablish_lock(
        &self,
        lock_id: &LockId,
        holder: &Holder,
        level: LockLevel,
    ) -> Result<(), LockError> {
        self.table
            .with_lock_or_create(lock_id, |lifecycle, lock| {
                self.require(Lifecycle::Recovering, "reestablish_lock", holder.node(), lifecycle)?;
                lock.reestablish_hold(holder.clone(), level, &self.clock)
            })
            .map_err(|e| self.reject("reestablish_lock", lock_id, e))
    }

    /// Record a wait a reconnecting client is blocked in.
    ///
    /// The timer restarts from now but cannot fire before `start`.
    pub fn reestablish_wait(
        &self,
        lock_id: &LockId,
        context: &ThreadContext,
        level: LockLevel,
        timeout: Option<Duration>,
    ) -> Result<(), LockError> {
        self.table
            .with_lock_or_create(lock_id, |lifecycle, lock| {
                self.require(Lifecycle::Recovering, "reestablish_wait", &context.node, lifecycle)?;
                let effects =
                    lock.reestablish_waiter(context, level, timeout, self.ids.next(), &self.clock)?;
                self.apply(effects);
                Ok(())
            })
            .map_err(|e| self.reject("reestablish_wait", lock_id, e))
    }

    // === Lifecycle ===

    /// Leave recovery: replay held-back requests, then fire any wait timers
    /// that expired in the meantime
    pub fn start(&self) -> Result<(), LifecycleError> {
        {
            let mut state = self.table.exclusive();
            if state.lifecycle != Lifecycle::Recovering {
                return Err(LifecycleError {
                    operation: "start",
                    actual: state.lifecycle,
                });
            }
            state.lifecycle = Lifecycle::Started;

            let deferred = state.take_deferred();
            info!(locks = state.len(), deferred = deferred.len(), "lock coordinator started");

            let mode = self.grant_mode(Lifecycle::Started);
            for request in deferred {
                let result = state.with_lock_or_create(&request.lock_id, |lock| {
                    self.acquire(lock, &request.context, request.level, request.try_timeout, mode)
                        .map(|effects| self.apply(effects))
                });
                if let Err(e) = result {
                    self.reject("request_lock", &request.lock_id, e);
                }
            }
        }

        let fired = self.tick();
        if fired > 0 {
            info!(fired, "fired waits that expired during recovery");
        }
        Ok(())
    }

    /// Freeze the table. Nothing is granted or timed out afterwards.
    pub fn stop(&self) -> Result<(), LifecycleError> {
        let mut state = self.table.exclusive();
        if state.lifecycle != Lifecycle::Started {
            return Err(LifecycleError {
                operation: "stop",
                actual: state.lifecycle,
            });
        }
        state.lifecycle = Lifecycle::Stopped;
        info!(locks = state.len(), "lock coordinator stopped");
        Ok(())
    }

    /// Fire every wait and try-lock timer that is due. Returns how many
    /// fired against a live waiter or request.
    pub fn tick(&self) -> usize {
        if self.table.lifecycle() != Lifecycle::Started {
            return 0;
        }

        let due = self.timers().poll(self.clock.now());
        let mut fired = 0;
        for timer in due {
            let expired = self.table.with_lock(&timer.lock_id, |lifecycle, lock| {
                if lifecycle != Lifecycle::Started {
                    return false;
                }
                let effects = lock.expire(&timer.id, self.grant_mode(lifecycle), &self.clock);
                let expired = !effects.is_empty();
                self.apply(effects);
                expired
            });
            if expired == Some(true) {
                debug!(lock = %timer.lock_id, timer = %timer.id, "timer fired");
                fired += 1;
            }
        }
        fired
    }

    // === Diagnostics ===

    /// Find cycles of threads waiting on each other, on a consistent copy of
    /// the table
    pub fn scan_for_deadlocks(&self) -> Vec<DeadlockChain> {
        let locks = self.table.exclusive().copy_locks();
        let chains = find_deadlocks(&locks);
        for chain in &chains {
            warn!(%chain, "deadlock detected");
        }
        chains
    }

    /// Counts across the whole table
    pub fn stats(&self) -> LockStats {
        let locks = self.table.exclusive().copy_locks();
        LockStats::collect(&locks, self.armed_timers())
    }

    /// Every live lock, sorted by id
    pub fn snapshot(&self, resolver: &impl NodeResolver) -> Vec<LockSnapshot> {
        let locks = self.table.exclusive().copy_locks();
        locks
            .iter()
            .map(|lock| LockSnapshot::capture(lock, resolver, &self.config.unresolved_address))
            .collect()
    }

    fn submit(
        &self,
        operation: &'static str,
        lock_id: &LockId,
        context: &ThreadContext,
        level: LockLevel,
        try_timeout: Option<Duration>,
    ) -> Result<(), LockError> {
        if self.table.lifecycle() == Lifecycle::Recovering {
            let checked = self
                .table
                .with_lock(lock_id, |_, lock| lock.validate_request(context, level));
            if let Some(Err(e)) = checked {
                return Err(self.reject(operation, lock_id, e));
            }
            let request = DeferredRequest {
                lock_id: lock_id.clone(),
                context: context.clone(),
                level,
                try_timeout,
            };
            if self.table.defer(request).is_ok() {
                debug!(lock = %lock_id, %context, %level, "request held until start");
                return Ok(());
            }
        }

        self.table
            .with_lock_or_create(lock_id, |lifecycle, lock| {
                let effects =
                    self.acquire(lock, context, level, try_timeout, self.grant_mode(lifecycle))?;
                self.apply(effects);
                Ok(())
            })
            .map_err(|e| self.reject(operation, lock_id, e))
    }

    fn acquire(
        &self,
        lock: &mut Lock,
        context: &ThreadContext,
        level: LockLevel,
        try_timeout: Option<Duration>,
        mode: GrantMode,
    ) -> Result<Vec<Effect>, LockError> {
        match try_timeout {
            None => lock.request(context, level, mode, &self.clock),
            Some(timeout) => {
                lock.try_request(context, level, timeout, self.ids.next(), mode, &self.clock)
            }
        }
    }

    fn grant_mode(&self, lifecycle: Lifecycle) -> GrantMode {
        match lifecycle {
            Lifecycle::Started => GrantMode::Live(self.config.lock_policy),
            Lifecycle::Recovering | Lifecycle::Stopped => GrantMode::Frozen,
        }
    }

    fn apply(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Emit(event) => {
                    debug!(
                        lock = %event.lock_id,
                        recipient = %event.recipient,
                        level = %event.level(),
                        "{}",
                        event.name()
                    );
                    self.sink.push(event);
                }
                Effect::SetTimer { id, lock_id, fire_at } => {
                    self.timers().schedule(id, lock_id, fire_at);
                }
                Effect::CancelTimer { id } => {
                    self.timers().cancel(&id);
                }
            }
        }
    }

    fn timers(&self) -> MutexGuard<'_, Scheduler> {
        self.timers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn require(
        &self,
        expected: Lifecycle,
        operation: &'static str,
        node: &NodeId,
        actual: Lifecycle,
    ) -> Result<(), LockError> {
        if actual == expected {
            return Ok(());
        }
        Err(LockError::WrongLifecycle {
            operation,
            node: node.clone(),
            expected,
            actual,
        })
    }

    fn missing_lock(
        &self,
        operation: &'static str,
        lock_id: &LockId,
        context: &ThreadContext,
    ) -> Result<(), LockError> {
        self.require(Lifecycle::Started, operation, &context.node, self.table.lifecycle())?;
        Err(LockError::NotHolder {
            lock_id: lock_id.clone(),
            context: context.clone(),
        })
    }

    fn reject(&self, operation: &'static str, lock_id: &LockId, error: LockError) -> LockError {
        warn!(operation, lock = %lock_id, node = %error.node(), %error, "protocol violation");
        error
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
