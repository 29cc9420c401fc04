//! Reminder repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use itrack_core::{new_v7, CreateReminderRequest, Error, Reminder, ReminderRepository, Result};

use crate::applications::APPLICATION_NOT_FOUND_MSG;

/// PostgreSQL implementation of ReminderRepository.
#[derive(Clone)]
pub struct PgReminderRepository {
    pool: Pool<Postgres>,
}

impl PgReminderRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn ensure_owned(&self, user_id: Uuid, application_id: Uuid) -> Result<()> {
        let owned: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM applications WHERE id = $1 AND user_id = $2")
                .bind(application_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::Database)?;
        owned
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(APPLICATION_NOT_FOUND_MSG.to_string()))
    }
}

fn map_reminder(r: &PgRow) -> Reminder {
    Reminder {
        id: r.get("id"),
        application_id: r.get("application_id"),
        reminder_date: r.get("reminder_date"),
        message: r.get("message"),
        is_sent: r.get("is_sent"),
        sent_at: r.get("sent_at"),
        created_at: r.get("created_at"),
    }
}

#[async_trait]
impl ReminderRepository for PgReminderRepository {
    async fn list(&self, user_id: Uuid, application_id: Uuid) -> Result<Vec<Reminder>> {
        self.ensure_owned(user_id, application_id).await?;

        let rows = sqlx::query(
            r#"
            SELECT id, application_id, reminder_date, message, is_sent, sent_at, created_at
            FROM reminders
            WHERE application_id = $1
            ORDER BY reminder_date ASC, id ASC
            "#,
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(map_reminder).collect())
    }

    async fn create(
        &self,
        user_id: Uuid,
        application_id: Uuid,
        req: CreateReminderRequest,
    ) -> Result<Reminder> {
        self.ensure_owned(user_id, application_id).await?;

        let row = sqlx::query(
            r#"
            INSERT INTO reminders (id, application_id, reminder_date, message, is_sent, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            RETURNING id, application_id, reminder_date, message, is_sent, sent_at, created_at
            "#,
        )
        .bind(new_v7())
        .bind(application_id)
        .bind(req.reminder_date)
        .bind(&req.message)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(map_reminder(&row))
    }

    async fn mark_due_sent(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE reminders
            SET is_sent = TRUE, sent_at = $1
            WHERE is_sent = FALSE AND reminder_date <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        let marked = result.rows_affected();
        debug!(
            subsystem = "db",
            component = "reminders",
            op = "mark_due_sent",
            rows_affected = marked,
            "Due reminders marked"
        );
        Ok(marked)
    }
}
