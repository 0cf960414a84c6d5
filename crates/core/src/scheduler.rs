// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deadline queue for wait timers

use crate::id::TimerId;
use crate::lock::LockId;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::time::Instant;

/// Heap size below which cancelled entries are left for `poll` to drop
const COMPACT_MIN: usize = 64;

/// An armed wait timer
#[derive(Debug, Clone)]
pub struct ScheduledTimer {
    pub id: TimerId,
    pub lock_id: LockId,
    pub fire_at: Instant,
    /// Breaks deadline ties in arming order
    seq: u64,
}

impl PartialEq for ScheduledTimer {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl Eq for ScheduledTimer {}

impl PartialOrd for ScheduledTimer {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTimer {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Min-heap: earliest first
        Reverse((self.fire_at, self.seq)).cmp(&Reverse((other.fire_at, other.seq)))
    }
}

/// Pending wait timers, earliest deadline first.
///
/// Cancellation is lazy: a cancelled timer stays in the heap until its
/// deadline and is dropped when polled, or until cancelled entries outnumber
/// armed ones and the heap is compacted. Each timer is yielded or cancelled
/// at most once.
#[derive(Default)]
pub struct Scheduler {
    items: BinaryHeap<ScheduledTimer>,
    armed: HashSet<TimerId>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot timer
    pub fn schedule(&mut self, id: TimerId, lock_id: LockId, fire_at: Instant) {
        self.armed.insert(id.clone());
        self.items.push(ScheduledTimer {
            id,
            lock_id,
            fire_at,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    /// Disarm a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: &TimerId) -> bool {
        let removed = self.armed.remove(id);
        if removed && self.items.len() > COMPACT_MIN && self.items.len() > 2 * self.armed.len() {
            self.items.retain(|item| self.armed.contains(&item.id));
        }
        removed
    }

    /// Take every armed timer due at or before `now`, in deadline order
    pub fn poll(&mut self, now: Instant) -> Vec<ScheduledTimer> {
        let mut ready = Vec::new();

        while let Some(item) = self.items.peek() {
            if item.fire_at > now {
                break;
            }

            let Some(item) = self.items.pop() else {
                break;
            };

            if self.armed.remove(&item.id) {
                ready.push(item);
            }
        }

        ready
    }

    /// Number of armed timers
    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }

    /// Earliest deadline among armed timers
    pub fn next_fire_time(&self) -> Option<Instant> {
        self.items
            .iter()
            .filter(|item| self.armed.contains(&item.id))
            .map(|item| item.fire_at)
            .min()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
