//! Daemon orchestration -- assembly and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `xlxmon-daemon`.
//! It validates configuration, opens the activity database, builds the
//! monitor pipeline, and runs the main event loop until a shutdown
//! signal arrives or the pipeline fails fatally.
//!
//! # Fatal Errors
//!
//! A store write failure terminates the monitor worker. The run loop
//! observes this through [`ActivityPipeline::join`] and exits with a
//! non-zero status so a supervisor (systemd) can restart the daemon.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use std::sync::Arc;

use xlxmon_activity::{ActivityConfig, ActivityPipeline, ActivityPipelineBuilder};
use xlxmon_core::config::XlxmonConfig;
use xlxmon_core::pipeline::{HealthStatus, Pipeline};
use xlxmon_store::SqliteRecordStore;

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: XlxmonConfig,
    /// Monitor pipeline (None when `[monitor]` is disabled).
    pipeline: Option<ActivityPipeline<SqliteRecordStore>>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Build from an already-loaded configuration.
    ///
    /// Opens the activity database and builds the monitor pipeline when
    /// the monitor is enabled. Disabled monitor leaves the daemon idle
    /// until a shutdown signal (useful for config staging).
    pub fn build_from_config(config: XlxmonConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        let pipeline = if config.monitor.enabled {
            tracing::info!(db_path = %config.store.db_path, "opening activity database");
            let store = SqliteRecordStore::open(&config.store.db_path)
                .map_err(|e| anyhow::anyhow!("failed to open activity database: {}", e))?;

            let pipeline = ActivityPipelineBuilder::new()
                .config(ActivityConfig::from_core(&config.monitor))
                .store(Arc::new(store))
                .build()
                .map_err(|e| anyhow::anyhow!("failed to build monitor pipeline: {}", e))?;
            tracing::info!("monitor pipeline initialized");
            Some(pipeline)
        } else {
            tracing::warn!("monitor disabled, daemon will idle until shutdown");
            None
        };

        Ok(Self {
            config,
            pipeline,
            start_time: Instant::now(),
        })
    }

    /// Start the pipeline and enter the main event loop.
    ///
    /// Blocks until `SIGTERM`/`SIGINT` is received or the pipeline
    /// worker exits with a fatal error.
    pub async fn run(&mut self) -> Result<()> {
        if !self.config.general.pid_file.is_empty() {
            let path = Path::new(&self.config.general.pid_file);
            write_pid_file(path)?;
        }

        if let Some(pipeline) = self.pipeline.as_mut() {
            if let Err(e) = pipeline.start().await {
                tracing::error!(error = %e, "monitor pipeline failed to start");
                self.cleanup_pid_file();
                return Err(e.into());
            }
            tracing::info!("monitor pipeline started");
        }

        tracing::info!("entering main event loop");
        let outcome = match self.pipeline.as_mut() {
            Some(pipeline) => {
                tokio::select! {
                    signal = wait_for_shutdown_signal() => RunOutcome::Signal(signal?),
                    res = pipeline.join() => RunOutcome::WorkerExit(res),
                }
            }
            None => RunOutcome::Signal(wait_for_shutdown_signal().await?),
        };

        let run_result = match outcome {
            RunOutcome::Signal(signal) => {
                tracing::info!(signal = signal, "shutdown signal received");
                match self.pipeline.as_mut() {
                    Some(pipeline) => pipeline
                        .stop()
                        .await
                        .map_err(|e| anyhow::anyhow!("shutdown failed: {}", e)),
                    None => Ok(()),
                }
            }
            RunOutcome::WorkerExit(Ok(())) => {
                Err(anyhow::anyhow!("monitor pipeline exited unexpectedly"))
            }
            RunOutcome::WorkerExit(Err(e)) => {
                tracing::error!(error = %e, "monitor pipeline failed");
                Err(e.into())
            }
        };

        self.cleanup_pid_file();

        let uptime_secs = self.start_time.elapsed().as_secs();
        tracing::info!(uptime_secs = uptime_secs, "daemon stopping");
        run_result
    }

    /// Get the current pipeline health status.
    pub async fn health(&self) -> HealthStatus {
        match self.pipeline.as_ref() {
            Some(pipeline) => pipeline.health_check().await,
            None => HealthStatus::Degraded("monitor disabled".to_owned()),
        }
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &XlxmonConfig {
        &self.config
    }

    fn cleanup_pid_file(&self) {
        if !self.config.general.pid_file.is_empty() {
            let path = Path::new(&self.config.general.pid_file);
            remove_pid_file(path);
        }
    }
}

/// What ended the main event loop.
enum RunOutcome {
    /// A shutdown signal arrived (name of the signal).
    Signal(&'static str),
    /// The monitor worker exited on its own.
    WorkerExit(Result<(), xlxmon_core::error::XlxmonError>),
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Write the current process PID to a file.
///
/// Used to prevent duplicate daemon instances.
///
/// # Security
///
/// - Uses `create_new(true)` to atomically create the file (no TOCTOU race)
/// - Verifies the created file is a regular file (no symlink target)
/// - Creates the parent directory with restrictive permissions (0o700)
fn write_pid_file(path: &Path) -> Result<()> {
    use std::fs::{self, OpenOptions};
    use std::io::{ErrorKind, Write};

    if let Some(parent) = path.parent() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            let mut builder = fs::DirBuilder::new();
            builder.mode(0o700).recursive(true);
            builder.create(parent)?;
        }
        #[cfg(not(unix))]
        {
            fs::create_dir_all(parent)?;
        }
    }

    let pid = std::process::id();

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let existing_pid = fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_string());
            return Err(anyhow::anyhow!(
                "PID file {} already exists with PID: {}. Is another instance running?",
                path.display(),
                existing_pid.trim()
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let metadata = file.metadata()?;
    if !metadata.is_file() {
        let _ = fs::remove_file(path);
        return Err(anyhow::anyhow!(
            "PID file {} is not a regular file (possible symlink attack)",
            path.display()
        ));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        file.set_permissions(permissions)?;
    }

    writeln!(file, "{}", pid)?;

    tracing::info!(pid = pid, path = %path.display(), "PID file written");
    Ok(())
}

/// Remove the PID file on daemon shutdown.
///
/// Logs a warning but does not fail if the file cannot be removed.
fn remove_pid_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "failed to remove PID file"
        );
    } else {
        tracing::info!(path = %path.display(), "PID file removed");
    }
}
