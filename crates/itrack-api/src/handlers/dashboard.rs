use axum::{extract::State, response::Response};
use chrono::Utc;

use itrack_core::DashboardRepository;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::response;
use crate::state::AppState;

/// Statistics with the monthly window ending at today's UTC date.
pub async fn stats(State(state): State<AppState>, auth: AuthUser) -> Result<Response, ApiError> {
    let today = Utc::now().date_naive();
    let stats = state.db.dashboard.stats(auth.id, today).await?;
    Ok(response::ok("Dashboard stats retrieved", stats))
}
