// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock Coordinator Daemon (dlmd)
//!
//! Background process that hosts a lock coordinator: recovers client state,
//! starts granting, fires wait timers and periodically scans for deadlocks.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use dlm_daemon::{startup, DaemonConfig, DaemonError};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "dlmd", version, about = "Distributed lock coordinator daemon")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of client handshakes to recover from (overrides the config)
    #[arg(long)]
    handshake_dir: Option<PathBuf>,

    /// Write every outbound response to stdout as a JSON line
    #[arg(long)]
    emit_events: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DaemonConfig::load(path)?,
        None => DaemonConfig::default(),
    };
    if let Some(dir) = args.handshake_dir {
        config.handshake_dir = Some(dir);
    }

    let _log_guard = setup_logging(&config)?;

    info!(pid = std::process::id(), "Starting dlmd");

    let mut daemon = match startup(config).await {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to start daemon: {}", e);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let mut deadlock_scan = tokio::time::interval(daemon.config.deadlock_scan_interval);
    deadlock_scan.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        recovered_clients = daemon.recovery.clients,
        "Daemon ready"
    );

    let mut stdout = std::io::stdout();
    loop {
        tokio::select! {
            Some(event) = daemon.events.recv() => {
                if args.emit_events {
                    let line = serde_json::to_string(&event)?;
                    writeln!(stdout, "{}", line)?;
                }
            }

            _ = deadlock_scan.tick() => {
                let cycles = daemon.scan_for_deadlocks();
                if cycles > 0 {
                    error!(cycles, "deadlocked threads in the lock table");
                }
            }

            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }

            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break;
            }
        }
    }

    daemon.shutdown().await?;
    info!("Daemon stopped");
    Ok(())
}

fn setup_logging(
    config: &DaemonConfig,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, DaemonError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(log_path) = &config.log_path else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    };

    let (Some(dir), Some(file_name)) = (log_path.parent(), log_path.file_name()) else {
        return Err(DaemonError::InvalidConfig(format!(
            "log_path is not a file path: {}",
            log_path.display()
        )));
    };
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(Some(guard))
}
