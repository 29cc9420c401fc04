//! Application CRUD with stage seeding on create.

use axum::{extract::State, response::Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use itrack_core::defaults::{PAGE_FIRST, PAGE_LIMIT, PAGE_LIMIT_MAX};
use itrack_core::validation::{is_valid_url, non_blank};
use itrack_core::{
    ApplicationFields, ApplicationRepository, CreateApplicationRequest, FinalResult,
    ListApplicationsRequest, SeedStage, StageSeed,
};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::response;
use crate::state::AppState;
use crate::validation::{self, Checks};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApplicationBody {
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub location: Option<String>,
    pub application_date: Option<String>,
    pub salary_min: Option<Value>,
    pub salary_max: Option<Value>,
    pub job_link: Option<String>,
    pub notes: Option<String>,
    pub final_result: Option<String>,
    /// Create only
    pub template_id: Option<String>,
    /// Create only; ignored when `template_id` is given
    pub stages: Option<Vec<SeedStageBody>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedStageBody {
    pub stage_name: Option<String>,
    pub stage_order: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub search: Option<String>,
    pub result: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

fn salary(value: &Option<Value>, field: &str, checks: &mut Checks) -> Option<f64> {
    let raw = value.as_ref()?;
    let parsed = validation::loose_f64(raw).filter(|n| *n >= 0.0);
    checks.check(
        parsed.is_some(),
        field,
        format!("{} must be a positive number", field),
    );
    parsed
}

/// Shared create/update field checks.
fn application_fields(body: &ApplicationBody, checks: &mut Checks) -> Option<ApplicationFields> {
    let company_name = non_blank(body.company_name.clone());
    checks.check(company_name.is_some(), "company_name", "Company name is required");

    let job_title = non_blank(body.job_title.clone());
    checks.check(job_title.is_some(), "job_title", "Job title is required");

    let application_date = body.application_date.as_deref().and_then(validation::parse_date);
    checks.check(
        application_date.is_some(),
        "application_date",
        "Valid application date required",
    );

    let final_result = match non_blank(body.final_result.clone()) {
        None => FinalResult::Pending,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            checks.fail(
                "final_result",
                "final_result must be pending, offer, or rejected",
            );
            FinalResult::Pending
        }),
    };

    let salary_min = salary(&body.salary_min, "salary_min", checks);
    let salary_max = salary(&body.salary_max, "salary_max", checks);

    let job_link = non_blank(body.job_link.clone());
    if let Some(link) = &job_link {
        checks.check(is_valid_url(link), "job_link", "job_link must be a valid URL");
    }

    Some(ApplicationFields {
        company_name: company_name?,
        job_title: job_title?,
        location: non_blank(body.location.clone()),
        application_date: application_date?,
        salary_min,
        salary_max,
        job_link,
        notes: non_blank(body.notes.clone()),
        final_result,
    })
}

fn stage_seed(body: &ApplicationBody, checks: &mut Checks) -> StageSeed {
    let template_id = non_blank(body.template_id.clone()).and_then(|raw| {
        let parsed = Uuid::parse_str(&raw).ok();
        checks.check(parsed.is_some(), "template_id", "template_id must be a valid id");
        parsed
    });

    let stages = body.stages.as_ref().map(|list| {
        list.iter()
            .enumerate()
            .filter_map(|(i, stage)| {
                let name = non_blank(stage.stage_name.clone());
                if name.is_none() {
                    checks.fail(format!("stages[{}].stage_name", i), "Stage name is required");
                }
                let order = match &stage.stage_order {
                    None => None,
                    Some(raw) => {
                        let order = validation::stage_order(raw);
                        if order.is_none() {
                            checks.fail(
                                format!("stages[{}].stage_order", i),
                                "stage_order must be a positive integer",
                            );
                        }
                        order
                    }
                };
                name.map(|stage_name| SeedStage {
                    stage_name,
                    stage_order: order,
                })
            })
            .collect::<Vec<_>>()
    });

    StageSeed::from_parts(template_id, stages)
}

fn list_request(query: ListQuery) -> ListApplicationsRequest {
    let page = query
        .page
        .and_then(|p| p.trim().parse::<i64>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(PAGE_FIRST);
    let limit = query
        .limit
        .and_then(|l| l.trim().parse::<i64>().ok())
        .filter(|l| *l >= 1)
        .map(|l| l.min(PAGE_LIMIT_MAX))
        .unwrap_or(PAGE_LIMIT);

    ListApplicationsRequest {
        search: non_blank(query.search),
        result: query.result.and_then(|r| r.trim().parse().ok()),
        page,
        limit,
    }
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Response, ApiError> {
    let page = state
        .db
        .applications
        .list(auth.id, list_request(query))
        .await?;
    Ok(response::ok("Applications retrieved", page))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Response, ApiError> {
    let application = state.db.applications.get(auth.id, id).await?;
    Ok(response::ok("Application retrieved", application))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<ApplicationBody>,
) -> Result<Response, ApiError> {
    let mut checks = Checks::new();
    let fields = application_fields(&body, &mut checks);
    let seed = stage_seed(&body, &mut checks);
    let fields = checks.finish_with(fields)?;

    let application = state
        .db
        .applications
        .create(auth.id, CreateApplicationRequest { fields, seed })
        .await?;

    info!(
        user_id = %auth.id,
        application_id = %application.id,
        "Application created"
    );
    Ok(response::created("Application created", application))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ApplicationBody>,
) -> Result<Response, ApiError> {
    let mut checks = Checks::new();
    let fields = application_fields(&body, &mut checks);
    let fields = checks.finish_with(fields)?;

    let application = state.db.applications.update(auth.id, id, fields).await?;
    Ok(response::ok("Application updated", application))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Response, ApiError> {
    state.db.applications.delete(auth.id, id).await?;
    info!(user_id = %auth.id, application_id = %id, "Application deleted");
    Ok(response::message("Application deleted successfully"))
}
