//! Reminders attached to an application.

use axum::{extract::State, response::Response};
use serde::Deserialize;
use uuid::Uuid;

use itrack_core::validation::non_blank;
use itrack_core::{CreateReminderRequest, ReminderRepository};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::response;
use crate::state::AppState;
use crate::validation::{parse_timestamp, Checks};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReminderBody {
    pub reminder_date: Option<String>,
    pub message: Option<String>,
}

fn reminder_request(body: ReminderBody) -> Result<CreateReminderRequest, ApiError> {
    let mut checks = Checks::new();

    let reminder_date = body.reminder_date.as_deref().and_then(parse_timestamp);
    checks.check(
        reminder_date.is_some(),
        "reminder_date",
        "Valid reminder date required",
    );
    let message = non_blank(body.message);
    checks.check(message.is_some(), "message", "Message is required");

    let req = reminder_date
        .zip(message)
        .map(|(reminder_date, message)| CreateReminderRequest {
            reminder_date,
            message,
        });
    checks.finish_with(req)
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(application_id): ApiPath<Uuid>,
) -> Result<Response, ApiError> {
    let reminders = state.db.reminders.list(auth.id, application_id).await?;
    Ok(response::ok("Reminders retrieved", reminders))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(application_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ReminderBody>,
) -> Result<Response, ApiError> {
    let req = reminder_request(body)?;
    let reminder = state
        .db
        .reminders
        .create(auth.id, application_id, req)
        .await?;
    Ok(response::created("Reminder created", reminder))
}
