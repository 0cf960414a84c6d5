// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background timer driver and table statistics

use crate::adapters::ResponseSink;
use crate::clock::Clock;
use crate::coordinator::{Lifecycle, LockCoordinator};
use crate::id::IdGen;
use crate::lock::Lock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Fire due wait timers every `interval` until the coordinator stops
pub fn spawn_timer_driver<S, C, G>(
    coordinator: Arc<LockCoordinator<S, C, G>>,
    interval: Duration,
) -> JoinHandle<()>
where
    S: ResponseSink + 'static,
    C: Clock + 'static,
    G: IdGen + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(?interval, "timer driver running");

        loop {
            ticker.tick().await;
            if coordinator.lifecycle() == Lifecycle::Stopped {
                break;
            }
            let fired = coordinator.tick();
            if fired > 0 {
                debug!(fired, "timers fired");
            }
        }

        info!("timer driver stopped");
    })
}

/// Counts across the lock table
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LockStats {
    pub locks: usize,
    pub holders: usize,
    pub greedy_holders: usize,
    pub pending: usize,
    pub waiters: usize,
    pub armed_timers: usize,
}

impl LockStats {
    pub fn collect(locks: &[Lock], armed_timers: usize) -> Self {
        let mut stats = LockStats {
            locks: locks.len(),
            armed_timers,
            ..LockStats::default()
        };
        for lock in locks {
            for (holder, _) in lock.holders() {
                stats.holders += 1;
                if holder.is_greedy() {
                    stats.greedy_holders += 1;
                }
            }
            stats.pending += lock.pending().count();
            stats.waiters += lock.waiters().count();
        }
        stats
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
