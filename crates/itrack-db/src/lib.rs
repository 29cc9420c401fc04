//! # itrack-db
//!
//! PostgreSQL persistence for itrack.
//!
//! This crate provides:
//! - Connection pool management
//! - One repository per aggregate (users, applications, stages, templates,
//!   dashboard, reminders)
//! - Transactional application of stage pipeline operations
//!
//! ## Example
//!
//! ```rust,ignore
//! use itrack_db::{Database, StageRepository};
//!
//! let db = Database::connect("postgres://localhost/itrack").await?;
//! let next = db.stages.move_to_next(user_id, application_id).await?;
//! println!("Now at {}", next.stage_name);
//! ```

pub mod applications;
pub mod dashboard;
pub mod pool;
pub mod reminders;
pub mod stages;
pub mod templates;
pub mod users;

// Test fixtures for integration tests
// Always compiled so integration tests (in tests/) can use them.
pub mod test_fixtures;

// Re-export core types
pub use itrack_core::*;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// Re-export repository implementations
pub use applications::PgApplicationRepository;
pub use dashboard::PgDashboardRepository;
pub use pool::{create_lazy_pool, create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use reminders::PgReminderRepository;
pub use stages::PgStageRepository;
pub use templates::PgTemplateRepository;
pub use users::PgUserRepository;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub users: PgUserRepository,
    pub applications: PgApplicationRepository,
    /// Stage pipeline operations.
    pub stages: PgStageRepository,
    /// Read-only stage templates.
    pub templates: PgTemplateRepository,
    pub dashboard: PgDashboardRepository,
    pub reminders: PgReminderRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            applications: PgApplicationRepository::new(pool.clone()),
            stages: PgStageRepository::new(pool.clone()),
            templates: PgTemplateRepository::new(pool.clone()),
            dashboard: PgDashboardRepository::new(pool.clone()),
            reminders: PgReminderRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_escapes_wildcards() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("Acme Corp"), "Acme Corp");
    }
}
