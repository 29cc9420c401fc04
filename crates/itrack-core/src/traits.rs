//! Repository traits.
//!
//! Every call is scoped to the authenticated owner. A record that exists but
//! belongs to someone else is reported exactly like a missing one.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::pipeline::{NewStage, StageChanges, StageSeed};

// =============================================================================
// USER REPOSITORY
// =============================================================================

/// Request for creating an account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub name: String,
    /// Normalized (trimmed, lowercased).
    pub email: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. A taken email is a `Conflict`.
    async fn create(&self, req: CreateUserRequest) -> Result<User>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn get(&self, id: Uuid) -> Result<Option<User>>;
}

// =============================================================================
// APPLICATION REPOSITORY
// =============================================================================

/// Editable fields of an application. Update replaces all of them.
#[derive(Debug, Clone)]
pub struct ApplicationFields {
    pub company_name: String,
    pub job_title: String,
    pub location: Option<String>,
    pub application_date: NaiveDate,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub job_link: Option<String>,
    pub notes: Option<String>,
    pub final_result: FinalResult,
}

/// Request for creating an application with its initial stages.
#[derive(Debug, Clone)]
pub struct CreateApplicationRequest {
    pub fields: ApplicationFields,
    pub seed: StageSeed,
}

/// Request for listing applications.
#[derive(Debug, Clone, Default)]
pub struct ListApplicationsRequest {
    /// Case-insensitive substring match on company name or job title
    pub search: Option<String>,
    /// Filter by final result
    pub result: Option<FinalResult>,
    /// 1-based page number
    pub page: i64,
    /// Page size, already clamped
    pub limit: i64,
}

#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Insert the application and seed its stages in one transaction.
    async fn create(&self, user_id: Uuid, req: CreateApplicationRequest) -> Result<Application>;

    /// Newest first.
    async fn list(&self, user_id: Uuid, req: ListApplicationsRequest) -> Result<Page<Application>>;

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Application>;

    async fn update(&self, user_id: Uuid, id: Uuid, fields: ApplicationFields) -> Result<Application>;

    /// Delete the application together with its stages and reminders.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()>;
}

// =============================================================================
// STAGE REPOSITORY (pipeline operations)
// =============================================================================

/// Request for completing a stage.
#[derive(Debug, Clone)]
pub struct CompleteStageRequest {
    pub result: StageResult,
    /// Replaces existing notes only when present
    pub feedback_notes: Option<String>,
}

impl Default for CompleteStageRequest {
    fn default() -> Self {
        Self {
            result: StageResult::Pass,
            feedback_notes: None,
        }
    }
}

/// Stage operations. Each mutating call runs in one transaction holding the
/// owning application's row lock.
#[async_trait]
pub trait StageRepository: Send + Sync {
    /// Stages of an application ordered by `stage_order`.
    async fn list(&self, user_id: Uuid, application_id: Uuid) -> Result<Vec<Stage>>;

    async fn add(&self, user_id: Uuid, application_id: Uuid, stage: NewStage) -> Result<Stage>;

    async fn complete(&self, user_id: Uuid, stage_id: Uuid, req: CompleteStageRequest) -> Result<Stage>;

    /// Advance the current stage and return the new current stage.
    async fn move_to_next(&self, user_id: Uuid, application_id: Uuid) -> Result<Stage>;

    async fn update(&self, user_id: Uuid, stage_id: Uuid, changes: StageChanges) -> Result<Stage>;

    async fn delete(&self, user_id: Uuid, stage_id: Uuid) -> Result<()>;
}

// =============================================================================
// TEMPLATE REPOSITORY
// =============================================================================

#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// All templates ordered by name.
    async fn list(&self) -> Result<Vec<StageTemplate>>;

    async fn get_with_stages(&self, id: Uuid) -> Result<TemplateWithStages>;
}

// =============================================================================
// DASHBOARD
// =============================================================================

#[async_trait]
pub trait DashboardRepository: Send + Sync {
    /// Aggregate statistics with the monthly window ending at `today`.
    async fn stats(&self, user_id: Uuid, today: NaiveDate) -> Result<DashboardStats>;
}

// =============================================================================
// REMINDER REPOSITORY
// =============================================================================

/// Request for scheduling a reminder.
#[derive(Debug, Clone)]
pub struct CreateReminderRequest {
    pub reminder_date: DateTime<Utc>,
    pub message: String,
}

#[async_trait]
pub trait ReminderRepository: Send + Sync {
    /// Reminders of an application ordered by date.
    async fn list(&self, user_id: Uuid, application_id: Uuid) -> Result<Vec<Reminder>>;

    async fn create(&self, user_id: Uuid, application_id: Uuid, req: CreateReminderRequest) -> Result<Reminder>;

    /// Mark every unsent reminder due at or before `now` as sent. Returns the
    /// number of reminders marked.
    async fn mark_due_sent(&self, now: DateTime<Utc>) -> Result<u64>;
}
