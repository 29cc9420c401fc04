//! Periodic runner for a [`SweepTask`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;
use tracing::{error, info, instrument};

use itrack_core::defaults::SWEEP_INTERVAL_SECS;
use itrack_core::{Error, Result};

use crate::task::SweepTask;
use crate::EVENT_CHANNEL_CAPACITY;

/// Configuration for the sweeper.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Time between sweeps.
    pub interval: Duration,
    /// Whether the sweeper runs at all.
    pub enabled: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(SWEEP_INTERVAL_SECS),
            enabled: true,
        }
    }
}

impl SweeperConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `REMINDER_SWEEP_ENABLED` | `true` | Enable/disable the sweep |
    /// | `REMINDER_SWEEP_INTERVAL_SECS` | `3600` | Seconds between sweeps |
    pub fn from_env() -> Self {
        let enabled = std::env::var("REMINDER_SWEEP_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let interval_secs = std::env::var("REMINDER_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(SWEEP_INTERVAL_SECS)
            .max(1);

        Self {
            interval: Duration::from_secs(interval_secs),
            enabled,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the sweeper.
#[derive(Debug, Clone, PartialEq)]
pub enum SweepEvent {
    SweeperStarted,
    /// A sweep finished; `touched` records were updated.
    SweepCompleted {
        task: &'static str,
        touched: u64,
        duration_ms: u64,
    },
    /// A sweep failed. The next tick runs as usual.
    SweepFailed { task: &'static str, error: String },
    SweeperStopped,
}

/// Handle for controlling a running sweeper.
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<SweepEvent>,
}

impl SweeperHandle {
    /// Signal the sweeper to stop after the current sweep.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for sweeper events.
    pub fn events(&self) -> broadcast::Receiver<SweepEvent> {
        self.event_rx.resubscribe()
    }
}

/// Runs one task on a fixed interval until shut down.
pub struct Sweeper {
    task: Arc<dyn SweepTask>,
    config: SweeperConfig,
    event_tx: broadcast::Sender<SweepEvent>,
}

impl Sweeper {
    pub fn new(task: impl SweepTask + 'static, config: SweeperConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            task: Arc::new(task),
            config,
            event_tx,
        }
    }

    /// Start the sweeper and return a handle for control.
    pub fn start(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        SweeperHandle {
            shutdown_tx,
            event_rx,
        }
    }

    /// Run one sweep now, logging and broadcasting the outcome.
    pub async fn sweep_once(&self) -> Result<u64> {
        let name = self.task.name();
        let start = Instant::now();

        match self.task.run_once(Utc::now()).await {
            Ok(touched) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                if touched > 0 {
                    info!(
                        subsystem = "jobs",
                        component = "sweeper",
                        op = name,
                        rows_affected = touched,
                        duration_ms,
                        "Sweep processed records"
                    );
                }
                let _ = self.event_tx.send(SweepEvent::SweepCompleted {
                    task: name,
                    touched,
                    duration_ms,
                });
                Ok(touched)
            }
            Err(e) => {
                error!(
                    subsystem = "jobs",
                    component = "sweeper",
                    op = name,
                    error = %e,
                    "Sweep failed"
                );
                let _ = self.event_tx.send(SweepEvent::SweepFailed {
                    task: name,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    #[instrument(skip(self, shutdown_rx), fields(task = self.task.name()))]
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Sweeper is disabled, not starting");
            return;
        }

        info!(
            interval_secs = self.config.interval.as_secs(),
            "Sweeper started"
        );
        let _ = self.event_tx.send(SweepEvent::SweeperStarted);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Sweeper received shutdown signal");
                    break;
                }
                _ = sleep(self.config.interval) => {
                    // Errors are already logged; the next tick proceeds.
                    let _ = self.sweep_once().await;
                }
            }
        }

        let _ = self.event_tx.send(SweepEvent::SweeperStopped);
        info!("Sweeper stopped");
    }
}
