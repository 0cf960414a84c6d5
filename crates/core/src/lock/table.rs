// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrent table of live locks
//!
//! Lock ordering: table guard, then a lock's mutex. Per-lock work runs under
//! the shared guard so unrelated locks proceed in parallel; creating,
//! evicting, and whole-table passes take the exclusive guard.

use super::state::Lock;
use super::types::{LockId, LockLevel, ThreadContext};
use crate::coordinator::Lifecycle;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// A lock request that arrived before the coordinator started
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeferredRequest {
    pub lock_id: LockId,
    pub context: ThreadContext,
    pub level: LockLevel,
    /// Set for try-locks
    pub try_timeout: Option<Duration>,
}

pub struct TableState {
    pub lifecycle: Lifecycle,
    locks: HashMap<LockId, Arc<Mutex<Lock>>>,
    deferred: Mutex<Vec<DeferredRequest>>,
}

impl TableState {
    /// Run `f` against the lock, creating it if needed and evicting it if it
    /// ends up empty
    pub fn with_lock_or_create<R>(&mut self, id: &LockId, f: impl FnOnce(&mut Lock) -> R) -> R {
        let entry = Arc::clone(
            self.locks
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(Lock::new(id.clone())))),
        );
        let mut lock = entry.lock().unwrap_or_else(|e| e.into_inner());
        let result = f(&mut lock);
        if lock.is_empty() {
            drop(lock);
            self.locks.remove(id);
        }
        result
    }

    /// Visit every lock in id order, evicting the ones left empty
    pub fn for_each_lock(&mut self, mut f: impl FnMut(&mut Lock)) {
        let mut ids: Vec<LockId> = self.locks.keys().cloned().collect();
        ids.sort();
        for id in ids {
            let Some(entry) = self.locks.get(&id).cloned() else {
                continue;
            };
            let mut lock = entry.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut lock);
            if lock.is_empty() {
                drop(lock);
                self.locks.remove(&id);
            }
        }
    }

    /// Copies of every lock, sorted by id
    pub fn copy_locks(&self) -> Vec<Lock> {
        let mut locks: Vec<Lock> = self
            .locks
            .values()
            .map(|entry| entry.lock().unwrap_or_else(|e| e.into_inner()).clone())
            .collect();
        locks.sort_by(|a, b| a.id().cmp(b.id()));
        locks
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn retain_deferred(&mut self, f: impl FnMut(&DeferredRequest) -> bool) {
        self.deferred
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .retain(f);
    }

    pub fn take_deferred(&mut self) -> Vec<DeferredRequest> {
        std::mem::take(self.deferred.get_mut().unwrap_or_else(|e| e.into_inner()))
    }
}

pub struct LockTable {
    state: RwLock<TableState>,
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LockTable {
    /// An empty table in the `Recovering` state
    pub fn new() -> Self {
        Self {
            state: RwLock::new(TableState {
                lifecycle: Lifecycle::Recovering,
                locks: HashMap::new(),
                deferred: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.read().lifecycle
    }

    /// Number of live locks
    pub fn len(&self) -> usize {
        self.read().locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` against an existing lock. Returns `None` if no such lock exists.
    pub fn with_lock<R>(&self, id: &LockId, f: impl FnOnce(Lifecycle, &mut Lock) -> R) -> Option<R> {
        let (result, emptied) = {
            let state = self.read();
            let entry = state.locks.get(id)?;
            let mut lock = entry.lock().unwrap_or_else(|e| e.into_inner());
            let result = f(state.lifecycle, &mut lock);
            (result, lock.is_empty())
        };
        if emptied {
            self.evict_if_empty(id);
        }
        Some(result)
    }

    /// Run `f` against a lock, creating it first if it does not exist
    pub fn with_lock_or_create<R>(
        &self,
        id: &LockId,
        f: impl FnOnce(Lifecycle, &mut Lock) -> R,
    ) -> R {
        {
            let state = self.read();
            if let Some(entry) = state.locks.get(id) {
                let mut lock = entry.lock().unwrap_or_else(|e| e.into_inner());
                let result = f(state.lifecycle, &mut lock);
                let emptied = lock.is_empty();
                drop(lock);
                drop(state);
                if emptied {
                    self.evict_if_empty(id);
                }
                return result;
            }
        }

        let mut state = self.write();
        let lifecycle = state.lifecycle;
        state.with_lock_or_create(id, |lock| f(lifecycle, lock))
    }

    /// Hold a request back until the coordinator starts.
    ///
    /// Hands the request back if the coordinator is no longer recovering.
    pub fn defer(&self, request: DeferredRequest) -> Result<(), DeferredRequest> {
        let state = self.read();
        if state.lifecycle != Lifecycle::Recovering {
            return Err(request);
        }
        state
            .deferred
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        Ok(())
    }

    /// Exclusive access for lifecycle changes and whole-table passes
    pub fn exclusive(&self) -> RwLockWriteGuard<'_, TableState> {
        self.write()
    }

    fn evict_if_empty(&self, id: &LockId) {
        let mut state = self.write();
        let empty = state
            .locks
            .get(id)
            .is_some_and(|entry| entry.lock().unwrap_or_else(|e| e.into_inner()).is_empty());
        if empty {
            state.locks.remove(id);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, TableState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, TableState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
