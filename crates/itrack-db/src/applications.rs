//! Application repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use itrack_core::pipeline::{manual_seed_stages, template_seed_stages};
use itrack_core::{
    new_v7, Application, ApplicationFields, ApplicationRepository, CreateApplicationRequest,
    Error, ListApplicationsRequest, Page, Pagination, Pipeline, Result, StageSeed,
};

use crate::escape_like;
use crate::stages::{insert_stage_tx, set_current_stage_tx};
use crate::templates::template_stages_tx;

pub const APPLICATION_NOT_FOUND_MSG: &str = "Application not found.";

/// Application columns with the current stage name joined in. Expects the
/// application aliased `a` and the current stage aliased `s`.
const APPLICATION_SELECT: &str = r#"
    SELECT a.id, a.user_id, a.company_name, a.job_title, a.location, a.application_date,
           a.salary_min, a.salary_max, a.job_link, a.notes, a.final_result,
           a.current_stage_id, s.stage_name AS current_stage_name,
           a.created_at, a.updated_at
    FROM applications a
    LEFT JOIN stages s ON s.id = a.current_stage_id
"#;

/// Owner-scoped filter shared by the list count and page queries.
/// `$2` is a LIKE pattern or NULL, `$3` a final result or NULL.
const LIST_FILTER: &str = r#"
    WHERE a.user_id = $1
      AND ($2::text IS NULL OR a.company_name ILIKE $2 OR a.job_title ILIKE $2)
      AND ($3::text IS NULL OR a.final_result = $3)
"#;

/// PostgreSQL implementation of ApplicationRepository.
#[derive(Clone)]
pub struct PgApplicationRepository {
    pool: Pool<Postgres>,
}

impl PgApplicationRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

pub(crate) fn map_application(r: &PgRow) -> Result<Application> {
    Ok(Application {
        id: r.get("id"),
        user_id: r.get("user_id"),
        company_name: r.get("company_name"),
        job_title: r.get("job_title"),
        location: r.get("location"),
        application_date: r.get("application_date"),
        salary_min: r.get("salary_min"),
        salary_max: r.get("salary_max"),
        job_link: r.get("job_link"),
        notes: r.get("notes"),
        final_result: r.get::<String, _>("final_result").parse()?,
        current_stage_id: r.get("current_stage_id"),
        current_stage_name: r.get("current_stage_name"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}

async fn fetch_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    id: Uuid,
) -> Result<Application> {
    let row = sqlx::query(&format!("{} WHERE a.id = $1 AND a.user_id = $2", APPLICATION_SELECT))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(APPLICATION_NOT_FOUND_MSG.to_string()))?;
    map_application(&row)
}

/// LIKE pattern for a free-text search, or `None` when the search is blank.
fn search_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)))
}

#[async_trait]
impl ApplicationRepository for PgApplicationRepository {
    async fn create(&self, user_id: Uuid, req: CreateApplicationRequest) -> Result<Application> {
        let id = new_v7();
        let now = Utc::now();
        let f = &req.fields;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            r#"
            INSERT INTO applications (id, user_id, company_name, job_title, location,
                                      application_date, salary_min, salary_max, job_link,
                                      notes, final_result, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&f.company_name)
        .bind(&f.job_title)
        .bind(&f.location)
        .bind(f.application_date)
        .bind(f.salary_min)
        .bind(f.salary_max)
        .bind(&f.job_link)
        .bind(&f.notes)
        .bind(f.final_result.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let drafts = match &req.seed {
            StageSeed::Template(template_id) => {
                let stages = template_stages_tx(&mut tx, *template_id).await?;
                template_seed_stages(&stages)
            }
            StageSeed::Manual(list) => manual_seed_stages(list),
            StageSeed::None => Vec::new(),
        };

        let mut pipeline = Pipeline::empty(id);
        let created = pipeline.seed(drafts, new_v7, now)?;
        for stage in &created {
            insert_stage_tx(&mut tx, stage).await?;
        }
        if let Some(current) = pipeline.current_stage_id() {
            set_current_stage_tx(&mut tx, id, Some(current)).await?;
        }

        let application = fetch_tx(&mut tx, user_id, id).await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "applications",
            op = "create",
            application_id = %id,
            user_id = %user_id,
            seeded_stages = created.len(),
            "Application created"
        );
        Ok(application)
    }

    async fn list(&self, user_id: Uuid, req: ListApplicationsRequest) -> Result<Page<Application>> {
        let pattern = search_pattern(req.search.as_deref());
        let result = req.result.map(|r| r.as_str());

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM applications a {}",
            LIST_FILTER
        ))
        .bind(user_id)
        .bind(&pattern)
        .bind(result)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let rows = sqlx::query(&format!(
            "{} {} ORDER BY a.created_at DESC, a.id DESC LIMIT $4 OFFSET $5",
            APPLICATION_SELECT, LIST_FILTER
        ))
        .bind(user_id)
        .bind(&pattern)
        .bind(result)
        .bind(req.limit)
        .bind(Pagination::offset(req.page, req.limit))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let items = rows.iter().map(map_application).collect::<Result<Vec<_>>>()?;

        debug!(
            subsystem = "db",
            component = "applications",
            op = "list",
            user_id = %user_id,
            result_count = items.len(),
            total,
            "Applications listed"
        );

        Ok(Page {
            items,
            pagination: Pagination::new(total, req.page, req.limit),
        })
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Application> {
        let row = sqlx::query(&format!("{} WHERE a.id = $1 AND a.user_id = $2", APPLICATION_SELECT))
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| Error::NotFound(APPLICATION_NOT_FOUND_MSG.to_string()))?;
        map_application(&row)
    }

    async fn update(&self, user_id: Uuid, id: Uuid, fields: ApplicationFields) -> Result<Application> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let updated = sqlx::query(
            r#"
            UPDATE applications
            SET company_name = $3, job_title = $4, location = $5, application_date = $6,
                salary_min = $7, salary_max = $8, job_link = $9, notes = $10,
                final_result = $11, updated_at = $12
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&fields.company_name)
        .bind(&fields.job_title)
        .bind(&fields.location)
        .bind(fields.application_date)
        .bind(fields.salary_min)
        .bind(fields.salary_max)
        .bind(&fields.job_link)
        .bind(&fields.notes)
        .bind(fields.final_result.as_str())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if updated.rows_affected() == 0 {
            return Err(Error::NotFound(APPLICATION_NOT_FOUND_MSG.to_string()));
        }

        let application = fetch_tx(&mut tx, user_id, id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(application)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Clearing the pointer first keeps the stage cascade from touching
        // the row being deleted.
        let owned = sqlx::query(
            "UPDATE applications SET current_stage_id = NULL WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if owned.rows_affected() == 0 {
            return Err(Error::NotFound(APPLICATION_NOT_FOUND_MSG.to_string()));
        }

        sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "applications",
            op = "delete",
            application_id = %id,
            "Application deleted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_pattern_wraps_and_escapes() {
        assert_eq!(search_pattern(Some("acme")), Some("%acme%".to_string()));
        assert_eq!(search_pattern(Some(" 50%_off ")), Some("%50\\%\\_off%".to_string()));
    }

    #[test]
    fn test_search_pattern_ignores_blank() {
        assert_eq!(search_pattern(Some("   ")), None);
        assert_eq!(search_pattern(None), None);
    }
}
