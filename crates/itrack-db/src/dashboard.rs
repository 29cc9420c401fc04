//! Dashboard aggregation queries.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use itrack_core::analytics::{success_rate, window_start};
use itrack_core::defaults::{MONTHLY_WINDOW_MONTHS, RECENT_APPLICATIONS_LIMIT};
use itrack_core::{
    DashboardRepository, DashboardStats, Error, MonthlyBucket, RecentApplication, Result,
};

/// PostgreSQL implementation of DashboardRepository.
#[derive(Clone)]
pub struct PgDashboardRepository {
    pool: Pool<Postgres>,
}

impl PgDashboardRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DashboardRepository for PgDashboardRepository {
    async fn stats(&self, user_id: Uuid, today: NaiveDate) -> Result<DashboardStats> {
        let totals = sqlx::query(
            r#"
            SELECT COUNT(*)                                          AS total,
                   COUNT(*) FILTER (WHERE final_result = 'offer')    AS offers,
                   COUNT(*) FILTER (WHERE final_result = 'rejected') AS rejections,
                   COUNT(*) FILTER (WHERE final_result = 'pending')  AS pending
            FROM applications
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let total: i64 = totals.get("total");
        let offers: i64 = totals.get("offers");
        let rejections: i64 = totals.get("rejections");
        let pending: i64 = totals.get("pending");

        // The window covers the current month plus the eleven before it.
        let since = window_start(today, MONTHLY_WINDOW_MONTHS - 1)
            .ok_or_else(|| Error::Internal(format!("no monthly window before {}", today)))?;
        let monthly_rows = sqlx::query(
            r#"
            SELECT to_char(application_date, 'YYYY-MM')            AS month,
                   COUNT(*)                                          AS count,
                   COUNT(*) FILTER (WHERE final_result = 'offer')    AS offers,
                   COUNT(*) FILTER (WHERE final_result = 'rejected') AS rejections
            FROM applications
            WHERE user_id = $1 AND application_date >= $2
            GROUP BY 1
            ORDER BY 1 ASC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let monthly = monthly_rows
            .iter()
            .map(|r| MonthlyBucket {
                month: r.get("month"),
                count: r.get("count"),
                offers: r.get("offers"),
                rejections: r.get("rejections"),
            })
            .collect();

        let recent_rows = sqlx::query(
            r#"
            SELECT a.id, a.company_name, a.job_title, a.final_result, a.application_date,
                   s.stage_name AS current_stage_name
            FROM applications a
            LEFT JOIN stages s ON s.id = a.current_stage_id
            WHERE a.user_id = $1
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(RECENT_APPLICATIONS_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let recent_applications = recent_rows
            .iter()
            .map(|r| {
                Ok(RecentApplication {
                    id: r.get("id"),
                    company_name: r.get("company_name"),
                    job_title: r.get("job_title"),
                    final_result: r.get::<String, _>("final_result").parse()?,
                    application_date: r.get("application_date"),
                    current_stage_name: r.get("current_stage_name"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            subsystem = "db",
            component = "dashboard",
            op = "stats",
            user_id = %user_id,
            total,
            "Dashboard aggregated"
        );

        Ok(DashboardStats {
            total_applications: total,
            total_offers: offers,
            total_rejections: rejections,
            total_pending: pending,
            success_rate: success_rate(offers, total),
            active_pipeline: pending,
            monthly,
            recent_applications,
        })
    }
}
