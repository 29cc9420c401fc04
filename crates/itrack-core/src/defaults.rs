//! Shared default values.
//!
//! Crates reference these instead of repeating literals.

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for the application list.
pub const PAGE_LIMIT: i64 = 10;

/// Upper bound on a requested page size.
pub const PAGE_LIMIT_MAX: i64 = 100;

/// First page (pages are 1-based).
pub const PAGE_FIRST: i64 = 1;

// =============================================================================
// AUTH
// =============================================================================

/// bcrypt work factor.
pub const BCRYPT_COST: u32 = 10;

/// Minimum accepted password length at registration.
pub const PASSWORD_MIN_LEN: usize = 6;

/// Default token lifetime, in `<n><unit>` form.
pub const JWT_EXPIRES_IN: &str = "7d";

// =============================================================================
// REMINDER SWEEP
// =============================================================================

/// Seconds between reminder sweeps.
pub const SWEEP_INTERVAL_SECS: u64 = 3600;

// =============================================================================
// DASHBOARD
// =============================================================================

/// Months covered by the monthly breakdown, including the current one.
pub const MONTHLY_WINDOW_MONTHS: u32 = 12;

/// Number of rows in the recent-applications feed.
pub const RECENT_APPLICATIONS_LIMIT: i64 = 5;

// =============================================================================
// SERVER
// =============================================================================

pub const SERVER_HOST: &str = "0.0.0.0";

pub const SERVER_PORT: u16 = 5000;

/// Default allowed CORS origin.
pub const CLIENT_URL: &str = "http://localhost:5173";

/// Maximum accepted request body size.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Default database pool size.
pub const DB_MAX_CONNECTIONS: u32 = 10;
