//! # itrack-api
//!
//! HTTP server for itrack: JWT auth, request validation, the JSON response
//! envelope, and the route table. The binary in `main.rs` wires it to a
//! database pool and the reminder sweeper.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod state;
pub mod validation;

pub use auth::{token_looks_live, AuthUser, Claims, TokenIssuer};
pub use config::ApiConfig;
pub use error::{ApiError, FieldError};
pub use routes::app;
pub use state::AppState;
