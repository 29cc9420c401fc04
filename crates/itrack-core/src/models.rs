//! Domain models shared by every itrack crate.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

// =============================================================================
// USERS
// =============================================================================

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// bcrypt hash; never leaves the server.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Identity carried in tokens and returned by register/login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

// =============================================================================
// APPLICATIONS
// =============================================================================

/// Hiring outcome of an application. Set by the caller, never derived from stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalResult {
    #[default]
    Pending,
    Offer,
    Rejected,
}

impl FinalResult {
    pub const ALL: [FinalResult; 3] = [Self::Pending, Self::Offer, Self::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Offer => "offer",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for FinalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FinalResult {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "offer" => Ok(Self::Offer),
            "rejected" => Ok(Self::Rejected),
            other => Err(Error::InvalidInput(format!(
                "final_result must be pending, offer, or rejected (got '{}')",
                other
            ))),
        }
    }
}

/// A tracked job application with its current stage name joined in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: String,
    pub job_title: String,
    pub location: Option<String>,
    pub application_date: NaiveDate,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub job_link: Option<String>,
    pub notes: Option<String>,
    pub final_result: FinalResult,
    pub current_stage_id: Option<Uuid>,
    pub current_stage_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// STAGES
// =============================================================================

/// Outcome flag of a stage, stored independently of completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageResult {
    #[default]
    Pending,
    Pass,
    Fail,
}

impl StageResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for StageResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageResult {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "pass" => Ok(Self::Pass),
            "fail" => Ok(Self::Fail),
            other => Err(Error::InvalidInput(format!(
                "result must be pending, pass, or fail (got '{}')",
                other
            ))),
        }
    }
}

/// Outcome recorded on a completed stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageOutcome {
    Pass,
    Fail,
    Unset,
}

/// Tagged view over the `is_completed` × `result` flag pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Completed { outcome: StageOutcome },
}

/// One step of an application's interview pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: Uuid,
    pub application_id: Uuid,
    pub stage_name: String,
    pub stage_order: i32,
    pub feedback_notes: Option<String>,
    pub result: StageResult,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Stage {
    /// Collapse the two stored flags into a single tagged status.
    pub fn status(&self) -> StageStatus {
        if !self.is_completed {
            return StageStatus::Pending;
        }
        let outcome = match self.result {
            StageResult::Pass => StageOutcome::Pass,
            StageResult::Fail => StageOutcome::Fail,
            StageResult::Pending => StageOutcome::Unset,
        };
        StageStatus::Completed { outcome }
    }
}

// =============================================================================
// TEMPLATES
// =============================================================================

/// A named, reusable pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// One stage of a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateStage {
    pub id: Uuid,
    pub template_id: Uuid,
    pub stage_name: String,
    pub stage_order: i32,
}

/// Template together with its ordered stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateWithStages {
    pub template: StageTemplate,
    pub stages: Vec<TemplateStage>,
}

// =============================================================================
// REMINDERS
// =============================================================================

/// A dated reminder attached to an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub application_id: Uuid,
    pub reminder_date: DateTime<Utc>,
    pub message: String,
    pub is_sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// DASHBOARD
// =============================================================================

/// Per-month application counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBucket {
    /// `YYYY-MM`
    pub month: String,
    pub count: i64,
    pub offers: i64,
    pub rejections: i64,
}

/// Condensed application row for the dashboard feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentApplication {
    pub id: Uuid,
    pub company_name: String,
    pub job_title: String,
    pub final_result: FinalResult,
    pub application_date: NaiveDate,
    pub current_stage_name: Option<String>,
}

/// Aggregated statistics for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_applications: i64,
    pub total_offers: i64,
    pub total_rejections: i64,
    pub total_pending: i64,
    /// Percentage of applications that ended in an offer, one decimal.
    pub success_rate: f64,
    pub active_pipeline: i64,
    pub monthly: Vec<MonthlyBucket>,
    pub recent_applications: Vec<RecentApplication>,
}

// =============================================================================
// PAGINATION
// =============================================================================

/// Page metadata returned by list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        let pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            total,
            page,
            limit,
            pages,
        }
    }

    /// Row offset for this page (pages are 1-based).
    pub fn offset(page: i64, limit: i64) -> i64 {
        (page.max(1) - 1) * limit
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(is_completed: bool, result: StageResult) -> Stage {
        Stage {
            id: Uuid::nil(),
            application_id: Uuid::nil(),
            stage_name: "Onsite".into(),
            stage_order: 1,
            feedback_notes: None,
            result,
            is_completed,
            completed_at: is_completed.then(Utc::now),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_covers_all_flag_combinations() {
        assert_eq!(
            stage(false, StageResult::Pending).status(),
            StageStatus::Pending
        );
        // Result is ignored until the stage is completed.
        assert_eq!(stage(false, StageResult::Pass).status(), StageStatus::Pending);
        assert_eq!(
            stage(true, StageResult::Pass).status(),
            StageStatus::Completed {
                outcome: StageOutcome::Pass
            }
        );
        assert_eq!(
            stage(true, StageResult::Fail).status(),
            StageStatus::Completed {
                outcome: StageOutcome::Fail
            }
        );
        assert_eq!(
            stage(true, StageResult::Pending).status(),
            StageStatus::Completed {
                outcome: StageOutcome::Unset
            }
        );
    }

    #[test]
    fn test_final_result_parse_and_display() {
        for result in FinalResult::ALL {
            assert_eq!(result.as_str().parse::<FinalResult>().unwrap(), result);
        }
        assert!("accepted".parse::<FinalResult>().is_err());
        assert_eq!(FinalResult::default(), FinalResult::Pending);
    }

    #[test]
    fn test_stage_result_serde_is_lowercase() {
        let json = serde_json::to_string(&StageResult::Pass).unwrap();
        assert_eq!(json, "\"pass\"");
        let parsed: StageResult = serde_json::from_str("\"fail\"").unwrap();
        assert_eq!(parsed, StageResult::Fail);
    }

    #[test]
    fn test_stage_status_serializes_tagged() {
        let value = serde_json::to_value(StageStatus::Completed {
            outcome: StageOutcome::Unset,
        })
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "state": "completed", "outcome": "unset" })
        );
    }

    #[test]
    fn test_user_hash_not_serialized() {
        let user = User {
            id: Uuid::nil(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$2b$10$secret".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_pagination_pages_rounds_up() {
        assert_eq!(Pagination::new(0, 1, 10).pages, 0);
        assert_eq!(Pagination::new(10, 1, 10).pages, 1);
        assert_eq!(Pagination::new(11, 2, 10).pages, 2);
        assert_eq!(Pagination::offset(1, 10), 0);
        assert_eq!(Pagination::offset(3, 25), 50);
    }
}
