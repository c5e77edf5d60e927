use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::instrument;

use crate::db::PgResult;
use crate::db::models::scan::{ScanRun, ScanStatus, ScanTally};
use crate::db::repositories::ScanRunStore;

#[derive(Debug)]
pub struct PgScanRunStore {
    pool: &'static Pool<Postgres>,
}

impl PgScanRunStore {
    pub fn new(pool: &'static Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScanRunStore for PgScanRunStore {
    #[instrument(skip(self, run), fields(id = run.id))]
    async fn create(&self, run: &ScanRun) -> PgResult<()> {
        sqlx::query(
            r#"
            INSERT INTO scan_runs (id, status, started_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&run.id)
        .bind(&run.status)
        .bind(run.started_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, tally))]
    async fn complete(&self, id: &str, tally: &ScanTally) -> PgResult<()> {
        sqlx::query(
            r#"
            UPDATE scan_runs
            SET status = $2,
                finished_at = NOW(),
                posts_scanned = $3,
                points_awarded = $4,
                accounts_created = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(ScanStatus::Completed.as_str())
        .bind(tally.scanned as i64)
        .bind(tally.points_awarded)
        .bind(tally.accounts_created as i64)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, tally))]
    async fn fail(&self, id: &str, tally: &ScanTally, error: &str) -> PgResult<()> {
        sqlx::query(
            r#"
            UPDATE scan_runs
            SET status = $2,
                finished_at = NOW(),
                posts_scanned = $3,
                points_awarded = $4,
                accounts_created = $5,
                error = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(ScanStatus::Failed.as_str())
        .bind(tally.scanned as i64)
        .bind(tally.points_awarded)
        .bind(tally.accounts_created as i64)
        .bind(error)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn recent(&self, limit: i64) -> PgResult<Vec<ScanRun>> {
        Ok(sqlx::query_as::<_, ScanRun>(
            r#"
            SELECT id, status, started_at, finished_at,
                   posts_scanned, points_awarded, accounts_created, error
            FROM scan_runs
            ORDER BY started_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?)
    }
}
