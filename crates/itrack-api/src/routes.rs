//! Router assembly and the HTTP middleware stack.

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::warn;

use itrack_core::defaults::MAX_BODY_BYTES;
use itrack_core::new_v7;

use crate::handlers::{applications, auth, dashboard, health, reminders, stages, templates};
use crate::state::AppState;

/// Request IDs are UUIDv7 so they sort by arrival time in logs.
#[derive(Clone, Copy)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = new_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Parse the CORS origin setting; a comma-separated list is allowed.
pub fn parse_allowed_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .filter_map(|s| {
            let trimmed = s.trim().trim_end_matches('/');
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = trimmed, "Ignoring invalid CORS origin");
                    None
                }
            }
        })
        .collect()
}

/// Build the full application router.
pub fn app(state: AppState, client_url: &str) -> Router {
    let api = Router::new()
        .route("/health", get(health::health))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Applications
        .route(
            "/applications",
            get(applications::list).post(applications::create),
        )
        .route(
            "/applications/:id",
            get(applications::get)
                .put(applications::update)
                .delete(applications::delete),
        )
        .route(
            "/applications/:id/stages",
            get(stages::list).post(stages::add),
        )
        .route("/applications/:id/move-next", patch(stages::move_to_next))
        .route(
            "/applications/:id/reminders",
            get(reminders::list).post(reminders::create),
        )
        // Stages
        .route("/stages/:id", put(stages::update).delete(stages::delete))
        .route("/stages/:id/complete", patch(stages::complete))
        // Templates
        .route("/templates", get(templates::list))
        .route("/templates/:id/stages", get(templates::stages))
        // Dashboard
        .route("/dashboard/stats", get(dashboard::stats));

    Router::new()
        .nest("/api", api)
        .fallback(health::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(parse_allowed_origins(client_url)))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(std::time::Duration::from_secs(3600)),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allowed_origins() {
        let origins = parse_allowed_origins("http://localhost:5173/, https://tracker.example.com,,");
        assert_eq!(
            origins,
            vec![
                HeaderValue::from_static("http://localhost:5173"),
                HeaderValue::from_static("https://tracker.example.com"),
            ]
        );
        assert!(parse_allowed_origins("").is_empty());
    }
}
