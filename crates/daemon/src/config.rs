// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration file

use std::path::{Path, PathBuf};
use std::time::Duration;

use dlm_adapters::StaticNodeResolver;
use dlm_core::CoordinatorConfig;
use serde::{Deserialize, Serialize};

use crate::lifecycle::DaemonError;

/// Everything `dlmd` reads from its TOML file.
///
/// ```toml
/// handshake_dir = "/var/lib/dlm/handshakes"
/// snapshot_path = "/var/lib/dlm/snapshot.json"
/// deadlock_scan_interval = "30s"
///
/// [coordinator]
/// lock_policy = "greedy"
/// timer_tick = "100ms"
///
/// [nodes]
/// app-1 = "10.0.0.1:9510"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub coordinator: CoordinatorConfig,
    /// Directory of `*.json` client handshakes replayed before start
    pub handshake_dir: Option<PathBuf>,
    /// Log file; stderr when unset
    pub log_path: Option<PathBuf>,
    /// Where the lock table is written on shutdown
    pub snapshot_path: Option<PathBuf>,
    #[serde(with = "humantime_serde")]
    pub deadlock_scan_interval: Duration,
    /// Known node addresses, for snapshots
    pub nodes: StaticNodeResolver,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            coordinator: CoordinatorConfig::default(),
            handshake_dir: None,
            log_path: None,
            snapshot_path: None,
            deadlock_scan_interval: Duration::from_secs(30),
            nodes: StaticNodeResolver::new(),
        }
    }
}

impl DaemonConfig {
    pub fn with_handshake_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.handshake_dir = Some(dir.into());
        self
    }

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub fn with_coordinator(mut self, coordinator: CoordinatorConfig) -> Self {
        self.coordinator = coordinator;
        self
    }

    pub fn from_toml_str(source: &str) -> Result<Self, DaemonError> {
        let mut config: DaemonConfig = toml::from_str(source)?;
        config.coordinator = config.coordinator.validate()?;
        if config.deadlock_scan_interval.is_zero() {
            return Err(DaemonError::InvalidConfig(
                "deadlock_scan_interval must be positive".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| DaemonError::ConfigRead(path.to_path_buf(), e))?;
        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
