//! # itrack-core
//!
//! Core types, the stage pipeline engine, and repository traits for itrack.
//!
//! Everything here is free of I/O; the database and HTTP crates build on it.

pub mod analytics;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod traits;
pub mod uuid_utils;
pub mod validation;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use pipeline::{
    AddedStage, CurrentChange, NewStage, Pipeline, RemovedStage, SeedStage, StageChanges,
    StageSeed,
};
pub use traits::*;
pub use uuid_utils::new_v7;
