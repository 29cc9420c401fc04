//! Stage repository: the transactional shell around the pipeline engine.
//!
//! Every mutating operation follows the same shape:
//!
//! 1. begin a transaction;
//! 2. lock the owning application row (`FOR UPDATE`) and read its stages;
//! 3. apply one [`Pipeline`] method;
//! 4. write back what changed and commit.
//!
//! Concurrent operations on the same application therefore serialize on the
//! row lock, and the current-stage pointer can never reference a stage that a
//! parallel request has just removed.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use itrack_core::pipeline::STAGE_NOT_FOUND_MSG;
use itrack_core::{
    new_v7, CompleteStageRequest, CurrentChange, Error, NewStage, Pipeline, Result, Stage,
    StageChanges, StageRepository,
};

use crate::applications::APPLICATION_NOT_FOUND_MSG;

pub(crate) const STAGE_COLUMNS: &str = "id, application_id, stage_name, stage_order, \
     feedback_notes, result, is_completed, completed_at, created_at";

/// PostgreSQL implementation of StageRepository.
#[derive(Clone)]
pub struct PgStageRepository {
    pool: Pool<Postgres>,
}

impl PgStageRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

pub(crate) fn map_stage(r: &PgRow) -> Result<Stage> {
    Ok(Stage {
        id: r.get("id"),
        application_id: r.get("application_id"),
        stage_name: r.get("stage_name"),
        stage_order: r.get("stage_order"),
        feedback_notes: r.get("feedback_notes"),
        result: r.get::<String, _>("result").parse()?,
        is_completed: r.get("is_completed"),
        completed_at: r.get("completed_at"),
        created_at: r.get("created_at"),
    })
}

/// Lock an owned application and load its pipeline.
pub(crate) async fn lock_pipeline(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    application_id: Uuid,
) -> Result<Pipeline> {
    let current: Option<Uuid> = sqlx::query_scalar::<_, Option<Uuid>>(
        "SELECT current_stage_id FROM applications WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(application_id)
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(Error::Database)?
    .ok_or_else(|| Error::NotFound(APPLICATION_NOT_FOUND_MSG.to_string()))?;

    let rows = sqlx::query(&format!(
        "SELECT {} FROM stages WHERE application_id = $1 ORDER BY stage_order",
        STAGE_COLUMNS
    ))
    .bind(application_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(Error::Database)?;

    let stages = rows.iter().map(map_stage).collect::<Result<Vec<_>>>()?;
    Ok(Pipeline::new(application_id, current, stages))
}

/// Resolve the application that owns a stage, if the caller owns both.
async fn owning_application(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    stage_id: Uuid,
) -> Result<Uuid> {
    sqlx::query_scalar(
        r#"
        SELECT s.application_id
        FROM stages s
        JOIN applications a ON a.id = s.application_id
        WHERE s.id = $1 AND a.user_id = $2
        "#,
    )
    .bind(stage_id)
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(Error::Database)?
    .ok_or_else(|| Error::NotFound(STAGE_NOT_FOUND_MSG.to_string()))
}

/// Lock the pipeline that contains `stage_id`.
async fn lock_pipeline_for_stage(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    stage_id: Uuid,
) -> Result<Pipeline> {
    let application_id = owning_application(tx, user_id, stage_id).await?;
    lock_pipeline(tx, user_id, application_id).await
}

pub(crate) async fn insert_stage_tx(tx: &mut Transaction<'_, Postgres>, stage: &Stage) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO stages (id, application_id, stage_name, stage_order, feedback_notes,
                            result, is_completed, completed_at, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(stage.id)
    .bind(stage.application_id)
    .bind(&stage.stage_name)
    .bind(stage.stage_order)
    .bind(&stage.feedback_notes)
    .bind(stage.result.as_str())
    .bind(stage.is_completed)
    .bind(stage.completed_at)
    .bind(stage.created_at)
    .execute(&mut **tx)
    .await
    .map_err(Error::Database)?;
    Ok(())
}

pub(crate) async fn set_current_stage_tx(
    tx: &mut Transaction<'_, Postgres>,
    application_id: Uuid,
    stage_id: Option<Uuid>,
) -> Result<()> {
    sqlx::query("UPDATE applications SET current_stage_id = $2 WHERE id = $1")
        .bind(application_id)
        .bind(stage_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
    Ok(())
}

async fn write_stage_tx(tx: &mut Transaction<'_, Postgres>, stage: &Stage) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE stages
        SET stage_name = $2, stage_order = $3, feedback_notes = $4, result = $5,
            is_completed = $6, completed_at = $7
        WHERE id = $1
        "#,
    )
    .bind(stage.id)
    .bind(&stage.stage_name)
    .bind(stage.stage_order)
    .bind(&stage.feedback_notes)
    .bind(stage.result.as_str())
    .bind(stage.is_completed)
    .bind(stage.completed_at)
    .execute(&mut **tx)
    .await
    .map_err(Error::Database)?;
    Ok(())
}

#[async_trait]
impl StageRepository for PgStageRepository {
    async fn list(&self, user_id: Uuid, application_id: Uuid) -> Result<Vec<Stage>> {
        let owned: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM applications WHERE id = $1 AND user_id = $2")
                .bind(application_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::Database)?;
        if owned.is_none() {
            return Err(Error::NotFound(APPLICATION_NOT_FOUND_MSG.to_string()));
        }

        let rows = sqlx::query(&format!(
            "SELECT {} FROM stages WHERE application_id = $1 ORDER BY stage_order ASC",
            STAGE_COLUMNS
        ))
        .bind(application_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(map_stage).collect()
    }

    async fn add(&self, user_id: Uuid, application_id: Uuid, stage: NewStage) -> Result<Stage> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut pipeline = lock_pipeline(&mut tx, user_id, application_id).await?;

        let added = pipeline.add_stage(new_v7(), stage, Utc::now())?;
        pipeline.check_invariants()?;

        insert_stage_tx(&mut tx, &added.stage).await?;
        if added.became_current {
            set_current_stage_tx(&mut tx, application_id, Some(added.stage.id)).await?;
        }
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "stages",
            op = "add",
            application_id = %application_id,
            stage_id = %added.stage.id,
            became_current = added.became_current,
            "Stage persisted"
        );
        Ok(added.stage)
    }

    async fn complete(&self, user_id: Uuid, stage_id: Uuid, req: CompleteStageRequest) -> Result<Stage> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut pipeline = lock_pipeline_for_stage(&mut tx, user_id, stage_id).await?;

        let stage = pipeline.complete_stage(stage_id, req.result, req.feedback_notes, Utc::now())?;
        pipeline.check_invariants()?;

        write_stage_tx(&mut tx, &stage).await?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "stages",
            op = "complete",
            stage_id = %stage_id,
            result = %stage.result,
            "Stage completed"
        );
        Ok(stage)
    }

    async fn move_to_next(&self, user_id: Uuid, application_id: Uuid) -> Result<Stage> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut pipeline = lock_pipeline(&mut tx, user_id, application_id).await?;

        let next = pipeline.move_to_next()?;
        set_current_stage_tx(&mut tx, application_id, Some(next.id)).await?;
        tx.commit().await.map_err(Error::Database)?;

        Ok(next)
    }

    async fn update(&self, user_id: Uuid, stage_id: Uuid, changes: StageChanges) -> Result<Stage> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut pipeline = lock_pipeline_for_stage(&mut tx, user_id, stage_id).await?;

        let stage = pipeline.update_stage(stage_id, changes)?;
        pipeline.check_invariants()?;

        write_stage_tx(&mut tx, &stage).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(stage)
    }

    async fn delete(&self, user_id: Uuid, stage_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut pipeline = lock_pipeline_for_stage(&mut tx, user_id, stage_id).await?;
        let application_id = pipeline.application_id();

        let removed = pipeline.delete_stage(stage_id)?;
        pipeline.check_invariants()?;

        // Repoint before deleting so the pointer never dangles.
        if let CurrentChange::Reassigned(next) = removed.current {
            set_current_stage_tx(&mut tx, application_id, next).await?;
        }
        sqlx::query("DELETE FROM stages WHERE id = $1")
            .bind(stage_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "stages",
            op = "delete",
            application_id = %application_id,
            stage_id = %stage_id,
            current = ?removed.current,
            "Stage deleted"
        );
        Ok(())
    }
}
