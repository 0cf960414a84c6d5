// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Side effects requested by lock transitions

use crate::event::LockEvent;
use crate::id::TimerId;
use crate::lock::LockId;
use std::time::Instant;

/// Effects are side effects that lock transitions request.
///
/// The coordinator applies them in order while the lock they came from is
/// still held, so responses for one lock reach the sink in transition order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Deliver a response to a client node
    Emit(LockEvent),
    /// Arm a wait timer
    SetTimer {
        id: TimerId,
        lock_id: LockId,
        fire_at: Instant,
    },
    /// Disarm a wait timer
    CancelTimer { id: TimerId },
}

impl Effect {
    /// The event, if this effect emits one
    pub fn event(&self) -> Option<&LockEvent> {
        match self {
            Effect::Emit(event) => Some(event),
            _ => None,
        }
    }
}

/// Collect the events out of a list of effects
pub fn events(effects: &[Effect]) -> Vec<LockEvent> {
    effects.iter().filter_map(Effect::event).cloned().collect()
}
