//! # itrack-jobs
//!
//! The one recurring background task of itrack: marking due reminders as
//! sent.
//!
//! ```ignore
//! use itrack_jobs::{ReminderSweep, Sweeper, SweeperConfig};
//!
//! let sweeper = Sweeper::new(ReminderSweep::from_database(&db), SweeperConfig::from_env());
//! let handle = sweeper.start();
//!
//! // Graceful shutdown
//! handle.shutdown().await?;
//! ```

pub mod sweeper;
pub mod task;

pub use sweeper::{SweepEvent, Sweeper, SweeperConfig, SweeperHandle};
pub use task::{ReminderSweep, SweepTask};

/// Capacity of the sweep event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
