//! Stage template repository implementation.
//!
//! Templates are seeded by migration and never mutated through the API.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};
use uuid::Uuid;

use itrack_core::{
    Error, Result, StageTemplate, TemplateRepository, TemplateStage, TemplateWithStages,
};

pub const TEMPLATE_NOT_FOUND_MSG: &str = "Template not found.";

/// PostgreSQL implementation of TemplateRepository.
#[derive(Clone)]
pub struct PgTemplateRepository {
    pool: Pool<Postgres>,
}

impl PgTemplateRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_template(r: &PgRow) -> StageTemplate {
    StageTemplate {
        id: r.get("id"),
        name: r.get("name"),
        description: r.get("description"),
    }
}

fn map_template_stage(r: &PgRow) -> TemplateStage {
    TemplateStage {
        id: r.get("id"),
        template_id: r.get("template_id"),
        stage_name: r.get("stage_name"),
        stage_order: r.get("stage_order"),
    }
}

/// Load a template's stages inside an open transaction.
///
/// Fails with `NotFound` when the template does not exist, so a create that
/// references an unknown template writes nothing.
pub(crate) async fn template_stages_tx(
    tx: &mut Transaction<'_, Postgres>,
    template_id: Uuid,
) -> Result<Vec<TemplateStage>> {
    let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM stage_templates WHERE id = $1")
        .bind(template_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;
    if exists.is_none() {
        return Err(Error::NotFound(TEMPLATE_NOT_FOUND_MSG.to_string()));
    }

    let rows = sqlx::query(
        r#"
        SELECT id, template_id, stage_name, stage_order
        FROM template_stages
        WHERE template_id = $1
        ORDER BY stage_order
        "#,
    )
    .bind(template_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(Error::Database)?;

    Ok(rows.iter().map(map_template_stage).collect())
}

#[async_trait]
impl TemplateRepository for PgTemplateRepository {
    async fn list(&self) -> Result<Vec<StageTemplate>> {
        let rows = sqlx::query("SELECT id, name, description FROM stage_templates ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.iter().map(map_template).collect())
    }

    async fn get_with_stages(&self, id: Uuid) -> Result<TemplateWithStages> {
        let row = sqlx::query("SELECT id, name, description FROM stage_templates WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| Error::NotFound(TEMPLATE_NOT_FOUND_MSG.to_string()))?;

        let stages = sqlx::query(
            r#"
            SELECT id, template_id, stage_name, stage_order
            FROM template_stages
            WHERE template_id = $1
            ORDER BY stage_order
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(TemplateWithStages {
            template: map_template(&row),
            stages: stages.iter().map(map_template_stage).collect(),
        })
    }
}
