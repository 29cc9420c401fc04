//! Stage pipeline handlers.

use axum::{extract::State, response::Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use itrack_core::validation::non_blank;
use itrack_core::{
    CompleteStageRequest, NewStage, Stage, StageChanges, StageRepository, StageResult, StageStatus,
};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, JsonOrDefault};
use crate::response;
use crate::state::AppState;
use crate::validation::{self, nullable, Checks};

const RESULT_MSG: &str = "result must be pending, pass, or fail";
const ORDER_MSG: &str = "stage_order must be a positive integer";

/// Stage as sent to clients: the stored flags plus the derived status.
#[derive(Debug, Serialize)]
pub struct StageView {
    #[serde(flatten)]
    pub stage: Stage,
    pub status: StageStatus,
}

impl From<Stage> for StageView {
    fn from(stage: Stage) -> Self {
        let status = stage.status();
        Self { stage, status }
    }
}

#[derive(Debug, Serialize)]
struct MovedPayload {
    current_stage: StageView,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddStageBody {
    pub stage_name: Option<String>,
    pub stage_order: Option<Value>,
    pub feedback_notes: Option<String>,
    pub result: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateStageBody {
    pub stage_name: Option<String>,
    pub stage_order: Option<Value>,
    #[serde(default, deserialize_with = "nullable")]
    pub feedback_notes: Option<Option<String>>,
    pub result: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompleteStageBody {
    pub result: Option<String>,
    pub feedback_notes: Option<String>,
}

fn stage_result(raw: Option<&str>, checks: &mut Checks) -> Option<StageResult> {
    let raw = raw?;
    let parsed = raw.trim().parse::<StageResult>().ok();
    checks.check(parsed.is_some(), "result", RESULT_MSG);
    parsed
}

fn order(raw: Option<&Value>, checks: &mut Checks) -> Option<i32> {
    let raw = raw?;
    let parsed = validation::stage_order(raw);
    checks.check(parsed.is_some(), "stage_order", ORDER_MSG);
    parsed
}

fn new_stage(body: AddStageBody) -> Result<NewStage, ApiError> {
    let mut checks = Checks::new();

    let stage_name = non_blank(body.stage_name);
    checks.check(stage_name.is_some(), "stage_name", "Stage name is required");
    let stage_order = order(body.stage_order.as_ref(), &mut checks);
    let result = stage_result(body.result.as_deref(), &mut checks).unwrap_or_default();

    let stage = stage_name.map(|stage_name| NewStage {
        stage_name,
        stage_order,
        feedback_notes: non_blank(body.feedback_notes),
        result,
    });
    checks.finish_with(stage)
}

fn stage_changes(body: UpdateStageBody) -> Result<StageChanges, ApiError> {
    let mut checks = Checks::new();

    let stage_name = body.stage_name.map(|name| name.trim().to_string());
    if let Some(name) = &stage_name {
        checks.check(!name.is_empty(), "stage_name", "Stage name cannot be empty");
    }
    let stage_order = order(body.stage_order.as_ref(), &mut checks);
    let result = stage_result(body.result.as_deref(), &mut checks);

    checks.finish()?;
    Ok(StageChanges {
        stage_name,
        stage_order,
        feedback_notes: body.feedback_notes,
        result,
    })
}

fn completion(body: CompleteStageBody) -> Result<CompleteStageRequest, ApiError> {
    let mut checks = Checks::new();
    let result = stage_result(body.result.as_deref(), &mut checks);
    checks.finish()?;

    Ok(CompleteStageRequest {
        result: result.unwrap_or(StageResult::Pass),
        feedback_notes: non_blank(body.feedback_notes),
    })
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(application_id): ApiPath<Uuid>,
) -> Result<Response, ApiError> {
    let stages: Vec<StageView> = state
        .db
        .stages
        .list(auth.id, application_id)
        .await?
        .into_iter()
        .map(StageView::from)
        .collect();
    Ok(response::ok("Stages retrieved", stages))
}

pub async fn add(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(application_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<AddStageBody>,
) -> Result<Response, ApiError> {
    let new = new_stage(body)?;
    let stage = state.db.stages.add(auth.id, application_id, new).await?;
    Ok(response::created("Stage added", StageView::from(stage)))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(stage_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateStageBody>,
) -> Result<Response, ApiError> {
    let changes = stage_changes(body)?;
    let stage = state.db.stages.update(auth.id, stage_id, changes).await?;
    Ok(response::ok("Stage updated", StageView::from(stage)))
}

pub async fn complete(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(stage_id): ApiPath<Uuid>,
    JsonOrDefault(body): JsonOrDefault<CompleteStageBody>,
) -> Result<Response, ApiError> {
    let req = completion(body)?;
    let stage = state.db.stages.complete(auth.id, stage_id, req).await?;
    Ok(response::ok("Stage marked as completed", StageView::from(stage)))
}

pub async fn move_to_next(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(application_id): ApiPath<Uuid>,
) -> Result<Response, ApiError> {
    let stage = state.db.stages.move_to_next(auth.id, application_id).await?;
    info!(
        application_id = %application_id,
        stage_id = %stage.id,
        "Advanced pipeline"
    );
    Ok(response::ok(
        "Moved to next stage",
        MovedPayload {
            current_stage: StageView::from(stage),
        },
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(stage_id): ApiPath<Uuid>,
) -> Result<Response, ApiError> {
    state.db.stages.delete(auth.id, stage_id).await?;
    Ok(response::message("Stage deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn first_message(err: ApiError) -> String {
        match err {
            ApiError::Validation(errors) => errors[0].message.clone(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_new_stage_defaults() {
        let body: AddStageBody = serde_json::from_value(json!({ "stage_name": " Onsite " })).unwrap();
        let stage = new_stage(body).unwrap();
        assert_eq!(stage.stage_name, "Onsite");
        assert_eq!(stage.stage_order, None);
        assert_eq!(stage.result, StageResult::Pending);
    }

    #[test]
    fn test_new_stage_rejects_bad_input() {
        let body: AddStageBody = serde_json::from_value(json!({ "stage_name": "" })).unwrap();
        assert_eq!(first_message(new_stage(body).unwrap_err()), "Stage name is required");

        let body: AddStageBody =
            serde_json::from_value(json!({ "stage_name": "Call", "stage_order": 0 })).unwrap();
        assert_eq!(first_message(new_stage(body).unwrap_err()), ORDER_MSG);
    }

    #[test]
    fn test_stage_changes_partial() {
        let body: UpdateStageBody =
            serde_json::from_value(json!({ "feedback_notes": null, "result": "fail" })).unwrap();
        let changes = stage_changes(body).unwrap();
        assert_eq!(changes.stage_name, None);
        assert_eq!(changes.feedback_notes, Some(None));
        assert_eq!(changes.result, Some(StageResult::Fail));

        let body: UpdateStageBody = serde_json::from_value(json!({ "stage_name": "  " })).unwrap();
        assert_eq!(
            first_message(stage_changes(body).unwrap_err()),
            "Stage name cannot be empty"
        );

        let body: UpdateStageBody = serde_json::from_value(json!({ "result": "maybe" })).unwrap();
        assert_eq!(first_message(stage_changes(body).unwrap_err()), RESULT_MSG);
    }

    #[test]
    fn test_completion_defaults_to_pass() {
        let req = completion(CompleteStageBody::default()).unwrap();
        assert_eq!(req.result, StageResult::Pass);
        assert_eq!(req.feedback_notes, None);

        let req = completion(CompleteStageBody {
            result: Some("fail".into()),
            feedback_notes: Some("No offer".into()),
        })
        .unwrap();
        assert_eq!(req.result, StageResult::Fail);
        assert_eq!(req.feedback_notes.as_deref(), Some("No offer"));
    }

    #[test]
    fn test_completion_drops_blank_notes() {
        let req = completion(CompleteStageBody {
            result: Some("pass".into()),
            feedback_notes: Some("   ".into()),
        })
        .unwrap();
        assert_eq!(req.feedback_notes, None);

        let req = completion(CompleteStageBody {
            result: None,
            feedback_notes: Some("  Strong onsite ".into()),
        })
        .unwrap();
        assert_eq!(req.feedback_notes.as_deref(), Some("Strong onsite"));
    }

    #[test]
    fn test_stage_view_flattens_with_status() {
        let stage = Stage {
            id: Uuid::from_u128(1),
            application_id: Uuid::from_u128(2),
            stage_name: "Phone Screen".into(),
            stage_order: 1,
            feedback_notes: None,
            result: StageResult::Pass,
            is_completed: true,
            completed_at: Some(Utc::now()),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(StageView::from(stage)).unwrap();
        assert_eq!(value["stage_name"], "Phone Screen");
        assert_eq!(value["is_completed"], true);
        assert_eq!(value["result"], "pass");
        assert_eq!(value["status"], json!({ "state": "completed", "outcome": "pass" }));
    }
}
