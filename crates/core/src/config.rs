// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator configuration
//!
//! Loaded from the `[coordinator]` table of a TOML file. Every field has a
//! default, so an empty table is a valid configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Whether uncontended grants are handed to the whole node
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockPolicy {
    /// Uncontended grants go to the node and are recalled on contention
    #[default]
    Greedy,
    /// Every grant belongs to a single thread
    Altruistic,
}

impl LockPolicy {
    pub fn is_greedy(self) -> bool {
        matches!(self, LockPolicy::Greedy)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub lock_policy: LockPolicy,
    /// How often the timer driver fires expired waits
    #[serde(with = "humantime_serde")]
    pub timer_tick: Duration,
    /// Address shown in snapshots for nodes the resolver does not know
    pub unresolved_address: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            lock_policy: LockPolicy::Greedy,
            timer_tick: Duration::from_millis(100),
            unresolved_address: "<unresolved>".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    coordinator: CoordinatorConfig,
}

impl CoordinatorConfig {
    pub fn with_lock_policy(mut self, policy: LockPolicy) -> Self {
        self.lock_policy = policy;
        self
    }

    pub fn with_timer_tick(mut self, tick: Duration) -> Self {
        self.timer_tick = tick;
        self
    }

    pub fn with_unresolved_address(mut self, address: impl Into<String>) -> Self {
        self.unresolved_address = address.into();
        self
    }

    /// Parse the `[coordinator]` table out of a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(source)?;
        file.coordinator.validate()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Reject settings the coordinator cannot run with
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.timer_tick.is_zero() {
            return Err(ConfigError::Invalid("timer_tick must be positive".to_string()));
        }
        Ok(self)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
