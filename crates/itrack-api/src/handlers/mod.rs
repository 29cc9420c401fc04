//! Route handlers, one module per resource.

pub mod applications;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod reminders;
pub mod stages;
pub mod templates;
