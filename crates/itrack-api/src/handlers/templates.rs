use axum::{extract::State, response::Response};
use uuid::Uuid;

use itrack_core::TemplateRepository;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ApiPath;
use crate::response;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>, _auth: AuthUser) -> Result<Response, ApiError> {
    let templates = state.db.templates.list().await?;
    Ok(response::ok("Templates retrieved", templates))
}

pub async fn stages(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Response, ApiError> {
    let template = state.db.templates.get_with_stages(id).await?;
    Ok(response::ok("Template stages retrieved", template))
}
