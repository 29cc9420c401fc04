//! Structured logging field names.
//!
//! All crates log with these keys so events can be filtered the same way
//! across subsystems.
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Request failed on our side, or a background sweep failed |
//! | WARN  | Recoverable issue (rejected token, exhausted pool) |
//! | INFO  | Startup, shutdown, sweep results |
//! | DEBUG | Pipeline decisions, pool configuration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation id set by the request-id layer.
pub const REQUEST_ID: &str = "request_id";

/// Values: "api", "db", "jobs", "pipeline", "auth"
pub const SUBSYSTEM: &str = "subsystem";

/// Examples: "pool", "sweeper", "applications"
pub const COMPONENT: &str = "component";

/// Examples: "create", "move_to_next", "sweep"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

pub const USER_ID: &str = "user_id";

pub const APPLICATION_ID: &str = "application_id";

pub const STAGE_ID: &str = "stage_id";

pub const TEMPLATE_ID: &str = "template_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Rows touched by a statement.
pub const ROWS_AFFECTED: &str = "rows_affected";

/// Rows returned by a query.
pub const RESULT_COUNT: &str = "result_count";
