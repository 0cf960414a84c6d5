// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Grant state of a single lock
//!
//! A [`Lock`] owns its holders, its FIFO queue of pending requests, and its
//! wait set. Every transition mutates the lock in place and returns the
//! effects (responses, timer changes) the caller must apply.
//!
//! A node holding a node-wide grant serves its own threads locally, so the
//! coordinator never records a per-thread grant or queued request that the
//! node-wide grant already covers.

use super::commit::RecallCommit;
use super::types::{Holder, LockId, LockLevel, NodeId, ThreadContext};
use crate::clock::Clock;
use crate::config::LockPolicy;
use crate::effect::Effect;
use crate::error::LockError;
use crate::event::LockEvent;
use crate::id::{IdGen, TimerId};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

/// How a transition may hand out grants
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrantMode {
    /// Grants flow normally under the given policy
    Live(LockPolicy),
    /// Requests queue but nothing is granted or promoted
    Frozen,
}

/// A recorded grant
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hold {
    pub level: LockLevel,
    pub since: DateTime<Utc>,
    /// Set once a recall has been sent for this grant
    pub recalled: bool,
}

/// A request that could not be granted on arrival
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRequest {
    pub context: ThreadContext,
    pub level: LockLevel,
    pub since: DateTime<Utc>,
    /// Set for try-locks; firing it refuses the request
    pub timer: Option<TimerId>,
}

/// A thread that released the lock to wait for a notify
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Waiter {
    pub context: ThreadContext,
    /// Level to re-acquire once the wait ends
    pub level: LockLevel,
    pub timeout: Option<Duration>,
    pub deadline: Option<Instant>,
    pub timer: Option<TimerId>,
    pub since: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct Lock {
    id: LockId,
    holders: BTreeMap<Holder, Hold>,
    pending: VecDeque<PendingRequest>,
    waiters: VecDeque<Waiter>,
}

impl Lock {
    pub fn new(id: LockId) -> Self {
        Self {
            id,
            holders: BTreeMap::new(),
            pending: VecDeque::new(),
            waiters: VecDeque::new(),
        }
    }

    pub fn id(&self) -> &LockId {
        &self.id
    }

    /// No holders, no pending requests and no waiters
    pub fn is_empty(&self) -> bool {
        self.holders.is_empty() && self.pending.is_empty() && self.waiters.is_empty()
    }

    pub fn holders(&self) -> impl Iterator<Item = (&Holder, &Hold)> {
        self.holders.iter()
    }

    pub fn hold(&self, holder: &Holder) -> Option<&Hold> {
        self.holders.get(holder)
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingRequest> {
        self.pending.iter()
    }

    pub fn waiters(&self) -> impl Iterator<Item = &Waiter> {
        self.waiters.iter()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn is_pending(&self, context: &ThreadContext) -> bool {
        self.pending.iter().any(|p| p.context == *context)
    }

    pub fn is_waiting(&self, context: &ThreadContext) -> bool {
        self.waiters.iter().any(|w| w.context == *context)
    }

    /// Ask for the lock on behalf of a thread
    pub fn request(
        &mut self,
        context: &ThreadContext,
        level: LockLevel,
        mode: GrantMode,
        clock: &impl Clock,
    ) -> Result<Vec<Effect>, LockError> {
        self.acquire(context, level, None, mode, clock)
    }

    /// Ask for the lock, giving up after `timeout`.
    ///
    /// A contended request with a zero timeout is refused at once; otherwise
    /// it queues under `timer` and is refused if the timer fires first.
    pub fn try_request(
        &mut self,
        context: &ThreadContext,
        level: LockLevel,
        timeout: Duration,
        timer: TimerId,
        mode: GrantMode,
        clock: &impl Clock,
    ) -> Result<Vec<Effect>, LockError> {
        self.acquire(context, level, Some((timeout, timer)), mode, clock)
    }

    /// Reject a request that can never be served for this thread
    pub fn validate_request(&self, context: &ThreadContext, level: LockLevel) -> Result<(), LockError> {
        if level.is_concurrent() {
            return Ok(());
        }

        if self.is_waiting(context) {
            return Err(LockError::AlreadyWaiting {
                lock_id: self.id.clone(),
                context: context.clone(),
            });
        }

        let node_grant = Holder::Greedy(context.node.clone());
        if let Some(hold) = self.holders.get(&node_grant) {
            if hold.level.covers(level) {
                return Ok(());
            }
            return Err(LockError::UpgradeNotSupported {
                lock_id: self.id.clone(),
                holder: node_grant,
                requested: level,
            });
        }

        let key = context.holder();
        if let Some(hold) = self.holders.get(&key) {
            if hold.level.is_read() && level.is_write() {
                return Err(LockError::UpgradeNotSupported {
                    lock_id: self.id.clone(),
                    holder: key,
                    requested: level,
                });
            }
            return Err(LockError::AlreadyHeld {
                lock_id: self.id.clone(),
                holder: key,
            });
        }
        Ok(())
    }

    fn acquire(
        &mut self,
        context: &ThreadContext,
        level: LockLevel,
        try_timer: Option<(Duration, TimerId)>,
        mode: GrantMode,
        clock: &impl Clock,
    ) -> Result<Vec<Effect>, LockError> {
        if level.is_concurrent() {
            return Ok(match mode {
                GrantMode::Live(_) => vec![self.award(context, level, false)],
                GrantMode::Frozen => Vec::new(),
            });
        }

        self.validate_request(context, level)?;
        // Served locally by the node's grant, or already queued
        if self.covered_by_node_grant(context, level) || self.is_pending(context) {
            return Ok(Vec::new());
        }

        let policy = match mode {
            GrantMode::Live(policy) => policy,
            GrantMode::Frozen => {
                self.enqueue(context, level, None, clock);
                return Ok(Vec::new());
            }
        };

        let grantable = self.pending.is_empty()
            && (self.holders.is_empty() || (level.is_read() && self.all_read()));
        if grantable {
            let greedy = policy.is_greedy()
                && !self.node_holds(&context.node)
                && (level.is_read() || self.waiters.is_empty());
            return Ok(vec![self.grant(context, level, greedy, clock)]);
        }

        let mut effects = self.recall_conflicting(level);
        match try_timer {
            None => self.enqueue(context, level, None, clock),
            Some((timeout, timer)) => {
                effects.extend(self.enqueue_try(context, level, timeout, timer, clock));
            }
        }
        Ok(effects)
    }

    /// Drop the grant recorded under `holder` and hand the lock on.
    ///
    /// Returns `None` when no such grant exists.
    pub fn release(
        &mut self,
        holder: &Holder,
        mode: GrantMode,
        clock: &impl Clock,
    ) -> Option<Vec<Effect>> {
        self.holders.remove(holder)?;
        Some(self.promote(mode, clock))
    }

    /// Remove a queued request that is no longer wanted
    pub fn withdraw(
        &mut self,
        context: &ThreadContext,
        mode: GrantMode,
        clock: &impl Clock,
    ) -> Option<Vec<Effect>> {
        let index = self.pending.iter().position(|p| p.context == *context)?;
        let request = self.pending.remove(index)?;
        let mut effects: Vec<Effect> = request.timer.map(|id| Effect::CancelTimer { id }).into_iter().collect();
        effects.extend(self.promote(mode, clock));
        Some(effects)
    }

    /// Release the caller's grant and park it in the wait set
    pub fn wait(
        &mut self,
        context: &ThreadContext,
        timeout: Option<Duration>,
        timer: TimerId,
        mode: GrantMode,
        clock: &impl Clock,
    ) -> Result<Vec<Effect>, LockError> {
        if self.is_waiting(context) {
            return Err(LockError::AlreadyWaiting {
                lock_id: self.id.clone(),
                context: context.clone(),
            });
        }
        let key = self.grant_key(context).ok_or_else(|| LockError::NotHolder {
            lock_id: self.id.clone(),
            context: context.clone(),
        })?;
        let Some(hold) = self.holders.remove(&key) else {
            return Ok(Vec::new());
        };

        let mut effects = self.park(context, hold.level, timeout, timer, clock);
        effects.extend(self.promote(mode, clock));
        Ok(effects)
    }

    /// Move one (or every) waiter to the back of the pending queue.
    ///
    /// Returns the threads that were woken.
    pub fn notify(
        &mut self,
        context: &ThreadContext,
        all: bool,
        mode: GrantMode,
        clock: &impl Clock,
    ) -> Result<(Vec<ThreadContext>, Vec<Effect>), LockError> {
        if self.is_waiting(context) {
            return Err(LockError::AlreadyWaiting {
                lock_id: self.id.clone(),
                context: context.clone(),
            });
        }
        if self.grant_key(context).is_none() {
            return Err(LockError::NotHolder {
                lock_id: self.id.clone(),
                context: context.clone(),
            });
        }

        let count = if all { self.waiters.len() } else { self.waiters.len().min(1) };
        let mut woken = Vec::with_capacity(count);
        let mut effects = Vec::new();
        for _ in 0..count {
            let Some(waiter) = self.waiters.pop_front() else {
                break;
            };
            woken.push(waiter.context.clone());
            effects.extend(self.unpark(waiter, clock));
        }
        effects.extend(self.promote(mode, clock));
        Ok((woken, effects))
    }

    /// Wake a specific waiter early. Returns `None` if it is not waiting.
    pub fn interrupt(
        &mut self,
        context: &ThreadContext,
        mode: GrantMode,
        clock: &impl Clock,
    ) -> Option<Vec<Effect>> {
        let index = self.waiters.iter().position(|w| w.context == *context)?;
        let waiter = self.waiters.remove(index)?;
        let mut effects = self.unpark(waiter, clock);
        effects.extend(self.promote(mode, clock));
        Some(effects)
    }

    /// A wait or try-lock timer fired. Stale timers produce no effects.
    pub fn expire(&mut self, timer: &TimerId, mode: GrantMode, clock: &impl Clock) -> Vec<Effect> {
        if let Some(index) = self.waiters.iter().position(|w| w.timer.as_ref() == Some(timer)) {
            let Some(waiter) = self.waiters.remove(index) else {
                return Vec::new();
            };
            let mut effects = vec![Effect::Emit(LockEvent::wait_timeout(
                self.id.clone(),
                &waiter.context,
                waiter.level,
            ))];
            effects.extend(self.reacquire(&waiter.context, waiter.level, mode, clock));
            return effects;
        }

        let Some(index) = self.pending.iter().position(|p| p.timer.as_ref() == Some(timer)) else {
            return Vec::new();
        };
        let Some(request) = self.pending.remove(index) else {
            return Vec::new();
        };
        let mut effects = vec![Effect::Emit(LockEvent::cannot_award(
            self.id.clone(),
            &request.context,
            request.level,
        ))];
        effects.extend(self.promote(mode, clock));
        effects
    }

    /// Forget everything a node holds, wants, or waits for
    pub fn clear_node(&mut self, node: &NodeId, mode: GrantMode, clock: &impl Clock) -> Vec<Effect> {
        self.holders.retain(|holder, _| holder.node() != node);

        let mut effects = Vec::new();
        self.pending.retain(|p| {
            if p.context.node != *node {
                return true;
            }
            if let Some(id) = &p.timer {
                effects.push(Effect::CancelTimer { id: id.clone() });
            }
            false
        });
        self.waiters.retain(|w| {
            if w.context.node != *node {
                return true;
            }
            if let Some(id) = &w.timer {
                effects.push(Effect::CancelTimer { id: id.clone() });
            }
            false
        });

        effects.extend(self.promote(mode, clock));
        effects
    }

    /// Turn a recalled node-wide grant into the per-thread state the node
    /// reports: its local holders keep the lock, its local waiters join the
    /// wait set and its local requests join the back of the queue.
    pub fn recall_commit(
        &mut self,
        node: &NodeId,
        commit: &RecallCommit,
        ids: &impl IdGen,
        mode: GrantMode,
        clock: &impl Clock,
    ) -> Result<Vec<Effect>, LockError> {
        let grant = Holder::Greedy(node.clone());
        let Some(granted) = self.holders.get(&grant).map(|hold| hold.level) else {
            return Err(LockError::NoNodeGrant {
                lock_id: self.id.clone(),
                node: node.clone(),
            });
        };
        self.check_commit(node, granted, commit)?;
        self.holders.remove(&grant);

        let context = |thread| ThreadContext {
            node: node.clone(),
            thread,
        };
        for committed in &commit.holds {
            self.holders.insert(
                context(committed.thread).holder(),
                Hold {
                    level: committed.level,
                    since: clock.wall(),
                    recalled: false,
                },
            );
        }

        let mut effects = Vec::new();
        for committed in &commit.waits {
            let waiter = context(committed.thread);
            if self.is_waiting(&waiter) || self.is_pending(&waiter) {
                continue;
            }
            effects.extend(self.park(&waiter, committed.level, committed.timeout, ids.next(), clock));
        }
        for committed in &commit.pending {
            let requester = context(committed.thread);
            if self.is_waiting(&requester) || self.is_pending(&requester) {
                continue;
            }
            match committed.try_timeout {
                None => self.enqueue(&requester, committed.level, None, clock),
                Some(timeout) => {
                    let timer = ids.next();
                    effects.extend(self.enqueue_try(&requester, committed.level, timeout, timer, clock));
                }
            }
        }

        effects.extend(self.promote(mode, clock));
        if let Some(level) = self.pending.front().map(|p| p.level) {
            effects.extend(self.recall_conflicting(level));
        }
        Ok(effects)
    }

    /// Record a grant a client reported after a coordinator restart
    pub fn reestablish_hold(
        &mut self,
        holder: Holder,
        level: LockLevel,
        clock: &impl Clock,
    ) -> Result<(), LockError> {
        if level.is_concurrent() {
            return Ok(());
        }
        let conflict = |reason| LockError::ReestablishConflict {
            lock_id: self.id.clone(),
            holder: holder.clone(),
            level,
            reason,
        };

        if self.holders.contains_key(&holder) {
            return Err(LockError::DuplicateReestablish {
                lock_id: self.id.clone(),
                holder,
            });
        }
        if level.is_write() && !self.holders.is_empty() {
            return Err(conflict("lock already has a holder"));
        }
        if self.holders.values().any(|h| h.level.is_write()) {
            return Err(conflict("lock is held for write"));
        }
        let node = holder.node();
        let mixed = self.holders.keys().any(|h| h.node() == node && h.is_greedy() != holder.is_greedy());
        if mixed {
            return Err(conflict("node mixes greedy and per-thread grants"));
        }
        if let Holder::PerThread(node, thread) = &holder {
            let waiting = self
                .waiters
                .iter()
                .any(|w| w.context.node == *node && w.context.thread == *thread);
            if waiting {
                return Err(conflict("thread is also waiting"));
            }
        }

        self.holders.insert(
            holder,
            Hold {
                level,
                since: clock.wall(),
                recalled: false,
            },
        );
        Ok(())
    }

    /// Record a wait a client reported after a coordinator restart.
    ///
    /// The timer restarts from now.
    pub fn reestablish_waiter(
        &mut self,
        context: &ThreadContext,
        level: LockLevel,
        timeout: Option<Duration>,
        timer: TimerId,
        clock: &impl Clock,
    ) -> Result<Vec<Effect>, LockError> {
        if self.is_waiting(context) {
            return Err(LockError::AlreadyWaiting {
                lock_id: self.id.clone(),
                context: context.clone(),
            });
        }
        if self.holders.contains_key(&context.holder()) {
            return Err(LockError::ReestablishConflict {
                lock_id: self.id.clone(),
                holder: context.holder(),
                level,
                reason: "thread also holds the lock",
            });
        }
        Ok(self.park(context, level, timeout, timer, clock))
    }

    fn check_commit(&self, node: &NodeId, granted: LockLevel, commit: &RecallCommit) -> Result<(), LockError> {
        let invalid = |reason| LockError::InvalidRecallCommit {
            lock_id: self.id.clone(),
            node: node.clone(),
            reason,
        };

        let mut seen = HashSet::new();
        if !commit.threads().all(|thread| seen.insert(thread)) {
            return Err(invalid("thread listed more than once"));
        }

        let levels = || {
            commit
                .holds
                .iter()
                .map(|h| h.level)
                .chain(commit.waits.iter().map(|w| w.level))
                .chain(commit.pending.iter().map(|p| p.level))
        };
        if levels().any(|level| level.is_concurrent()) {
            return Err(invalid("concurrent level in commit"));
        }

        let writes = commit.holds.iter().filter(|h| h.level.is_write()).count();
        if writes > 0 && granted.is_read() {
            return Err(invalid("write hold under a read grant"));
        }
        if writes > 0 && commit.holds.len() > 1 {
            return Err(invalid("write hold shared with other holds"));
        }

        let held_elsewhere = commit.holds.iter().any(|h| {
            let context = ThreadContext {
                node: node.clone(),
                thread: h.thread,
            };
            self.is_waiting(&context) || self.is_pending(&context)
        });
        if held_elsewhere {
            return Err(invalid("held thread is also waiting or queued"));
        }
        Ok(())
    }

    fn all_read(&self) -> bool {
        self.holders.values().all(|h| h.level.is_read())
    }

    fn node_holds(&self, node: &NodeId) -> bool {
        self.holders.keys().any(|h| h.node() == node)
    }

    /// The thread's node holds a node-wide grant strong enough for `level`
    fn covered_by_node_grant(&self, context: &ThreadContext, level: LockLevel) -> bool {
        self.holders
            .get(&Holder::Greedy(context.node.clone()))
            .is_some_and(|hold| hold.level.covers(level))
    }

    /// Key of the grant that lets `context` act as holder
    fn grant_key(&self, context: &ThreadContext) -> Option<Holder> {
        let own = context.holder();
        if self.holders.contains_key(&own) {
            return Some(own);
        }
        let node = Holder::Greedy(context.node.clone());
        self.holders.contains_key(&node).then_some(node)
    }

    fn award(&self, context: &ThreadContext, level: LockLevel, greedy: bool) -> Effect {
        Effect::Emit(LockEvent::award(self.id.clone(), context, level, greedy))
    }

    fn grant(
        &mut self,
        context: &ThreadContext,
        level: LockLevel,
        greedy: bool,
        clock: &impl Clock,
    ) -> Effect {
        let key = if greedy {
            Holder::Greedy(context.node.clone())
        } else {
            context.holder()
        };
        self.holders.insert(
            key,
            Hold {
                level,
                since: clock.wall(),
                recalled: false,
            },
        );
        self.award(context, level, greedy)
    }

    fn enqueue(
        &mut self,
        context: &ThreadContext,
        level: LockLevel,
        timer: Option<TimerId>,
        clock: &impl Clock,
    ) {
        self.pending.push_back(PendingRequest {
            context: context.clone(),
            level,
            since: clock.wall(),
            timer,
        });
    }

    /// Queue a try-lock behind a timer, or refuse it when no time is left.
    /// A deadline past what the clock can represent queues without a timer.
    fn enqueue_try(
        &mut self,
        context: &ThreadContext,
        level: LockLevel,
        timeout: Duration,
        timer: TimerId,
        clock: &impl Clock,
    ) -> Vec<Effect> {
        if timeout.is_zero() {
            return vec![Effect::Emit(LockEvent::cannot_award(self.id.clone(), context, level))];
        }
        let mut effects = Vec::new();
        let timer = clock.now().checked_add(timeout).map(|fire_at| {
            effects.push(Effect::SetTimer {
                id: timer.clone(),
                lock_id: self.id.clone(),
                fire_at,
            });
            timer
        });
        self.enqueue(context, level, timer, clock);
        effects
    }

    /// Ask every node-wide holder that blocks `level` to give its grant back.
    /// Each grant is recalled at most once.
    fn recall_conflicting(&mut self, level: LockLevel) -> Vec<Effect> {
        let mut effects = Vec::new();
        for (holder, hold) in self.holders.iter_mut() {
            let Holder::Greedy(node) = holder else {
                continue;
            };
            if hold.recalled || hold.level.is_compatible_with(level) {
                continue;
            }
            hold.recalled = true;
            effects.push(Effect::Emit(LockEvent::recall(
                self.id.clone(),
                node.clone(),
                hold.level,
            )));
        }
        effects
    }

    /// Grant queued requests from the front while they fit.
    ///
    /// A lone promoted request becomes a node-wide grant when nothing else is
    /// queued or waiting. Requests a node-wide grant now covers leave the
    /// queue without a grant.
    fn promote(&mut self, mode: GrantMode, clock: &impl Clock) -> Vec<Effect> {
        let GrantMode::Live(policy) = mode else {
            return Vec::new();
        };

        let mut effects = Vec::new();
        let mut promoted: Vec<PendingRequest> = Vec::new();
        while let Some(front) = self.pending.front() {
            let covered = self.covered_by_node_grant(&front.context, front.level);
            let fits = covered
                || (self.holders.is_empty() && promoted.is_empty())
                || (front.level.is_read()
                    && self.all_read()
                    && promoted.iter().all(|p| p.level.is_read()));
            if !fits {
                break;
            }
            let Some(request) = self.pending.pop_front() else {
                break;
            };
            if let Some(id) = request.timer.clone() {
                effects.push(Effect::CancelTimer { id });
            }
            if !covered {
                promoted.push(request);
            }
        }

        let greedy = policy.is_greedy()
            && promoted.len() == 1
            && self.holders.is_empty()
            && self.pending.is_empty()
            && self.waiters.is_empty();

        for request in &promoted {
            effects.push(self.grant(&request.context, request.level, greedy, clock));
        }
        effects
    }

    /// A waiter whose wait ended goes back into contention
    fn reacquire(
        &mut self,
        context: &ThreadContext,
        level: LockLevel,
        mode: GrantMode,
        clock: &impl Clock,
    ) -> Vec<Effect> {
        if self.covered_by_node_grant(context, level) {
            return Vec::new();
        }
        match mode {
            GrantMode::Live(policy) if self.holders.is_empty() && self.pending.is_empty() => {
                let greedy = policy.is_greedy() && (level.is_read() || self.waiters.is_empty());
                vec![self.grant(context, level, greedy, clock)]
            }
            _ => {
                let effects = self.recall_conflicting(level);
                self.enqueue(context, level, None, clock);
                effects
            }
        }
    }

    fn park(
        &mut self,
        context: &ThreadContext,
        level: LockLevel,
        timeout: Option<Duration>,
        timer: TimerId,
        clock: &impl Clock,
    ) -> Vec<Effect> {
        // A deadline the clock cannot represent never fires
        let deadline = timeout.and_then(|t| clock.now().checked_add(t));
        let mut effects = Vec::new();
        if let Some(fire_at) = deadline {
            effects.push(Effect::SetTimer {
                id: timer.clone(),
                lock_id: self.id.clone(),
                fire_at,
            });
        }
        self.waiters.push_back(Waiter {
            context: context.clone(),
            level,
            timeout,
            deadline,
            timer: deadline.map(|_| timer),
            since: clock.wall(),
        });
        effects
    }

    fn unpark(&mut self, waiter: Waiter, clock: &impl Clock) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(id) = waiter.timer {
            effects.push(Effect::CancelTimer { id });
        }
        if self.covered_by_node_grant(&waiter.context, waiter.level) {
            return effects;
        }
        effects.extend(self.recall_conflicting(waiter.level));
        self.enqueue(&waiter.context, waiter.level, None, clock);
        effects
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
