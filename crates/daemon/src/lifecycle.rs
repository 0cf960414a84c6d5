// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, recovery, shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use dlm_adapters::{
    channel, ChannelResponseSink, DirHandshakeSource, NoHandshakes, TracedHandshakeSource,
    TracedNodeResolver, TracedResponseSink,
};
use dlm_core::{
    recover, spawn_timer_driver, ConfigError, LifecycleError, LockCoordinator, LockEvent,
    LockSnapshot, RecoveryError, RecoverySummary, SystemClock, UuidIdGen,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::DaemonConfig;

/// Coordinator with the daemon's concrete collaborators
pub type DaemonCoordinator =
    LockCoordinator<TracedResponseSink<ChannelResponseSink>, SystemClock, UuidIdGen>;

/// A started coordinator and the tasks serving it
pub struct Daemon {
    pub config: DaemonConfig,
    pub coordinator: Arc<DaemonCoordinator>,
    /// Responses waiting to be delivered to client nodes
    pub events: mpsc::UnboundedReceiver<LockEvent>,
    /// What recovery replayed before start
    pub recovery: RecoverySummary,
    /// When daemon started
    pub start_time: Instant,
    driver: JoinHandle<()>,
}

/// Build a coordinator, replay client handshakes, start it and begin firing
/// wait timers
pub async fn startup(config: DaemonConfig) -> Result<Daemon, DaemonError> {
    let (sink, events) = channel();
    let coordinator = Arc::new(LockCoordinator::new(
        config.coordinator.clone(),
        TracedResponseSink::new(sink),
        SystemClock,
        UuidIdGen,
    ));

    let recovery = match &config.handshake_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "recovering from client handshakes");
            let source = TracedHandshakeSource::new(DirHandshakeSource::new(dir.clone()));
            recover(&*coordinator, &source).await?
        }
        None => recover(&*coordinator, &NoHandshakes).await?,
    };

    coordinator.start()?;
    let driver = spawn_timer_driver(Arc::clone(&coordinator), config.coordinator.timer_tick);

    info!(
        policy = ?config.coordinator.lock_policy,
        locks = coordinator.lock_count(),
        rejected = recovery.rejected.len(),
        "daemon started"
    );

    Ok(Daemon {
        config,
        coordinator,
        events,
        recovery,
        start_time: Instant::now(),
        driver,
    })
}

impl Daemon {
    /// Run the deadlock detector once. Returns the number of cycles found.
    pub fn scan_for_deadlocks(&self) -> usize {
        let chains = self.coordinator.scan_for_deadlocks();
        if chains.is_empty() {
            tracing::debug!(locks = self.coordinator.lock_count(), "no deadlocks");
        }
        chains.len()
    }

    /// Current lock table, with node addresses from the config
    pub fn snapshot(&self) -> Vec<LockSnapshot> {
        let resolver = TracedNodeResolver::new(self.config.nodes.clone());
        self.coordinator.snapshot(&resolver)
    }

    /// Freeze the table, stop the timer driver and write the final snapshot
    pub async fn shutdown(mut self) -> Result<Vec<LockSnapshot>, DaemonError> {
        info!("Shutting down daemon...");

        self.coordinator.stop()?;
        if let Err(e) = (&mut self.driver).await {
            warn!(error = %e, "timer driver ended abnormally");
        }

        let snapshot = self.snapshot();
        if let Some(path) = &self.config.snapshot_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let json = serde_json::to_string_pretty(&snapshot)?;
            std::fs::write(path, json)?;
            info!(path = %path.display(), locks = snapshot.len(), "wrote lock snapshot");
        }

        info!(
            uptime_s = self.start_time.elapsed().as_secs(),
            "Daemon shutdown complete"
        );
        Ok(snapshot)
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("failed to read config {0}: {1}")]
    ConfigRead(PathBuf, #[source] std::io::Error),

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("recovery failed: {0}")]
    Recovery(#[from] RecoveryError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("failed to encode snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
