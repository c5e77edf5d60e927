use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use tracing::instrument;

use crate::db::PgResult;
use crate::db::models::account::Handle;
use crate::db::models::quota::QuotaRecord;
use crate::db::repositories::QuotaStore;

#[derive(Debug)]
pub struct PgQuotaStore {
    pool: &'static Pool<Postgres>,
}

impl PgQuotaStore {
    pub fn new(pool: &'static Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuotaStore for PgQuotaStore {
    #[instrument(skip(self, handle, day), fields(handle = %handle, day = %day))]
    async fn try_consume(&self, handle: &Handle, day: NaiveDate) -> PgResult<bool> {
        // snapshot the budget on first touch of this (handle, day); later
        // quota or multiplier changes do not reach an existing record
        sqlx::query(
            r#"
            INSERT INTO quota_records (handle, day, total, consumed)
            SELECT a.handle, $2, a.quota * a.multiplier, 0
            FROM accounts a
            WHERE a.handle = $1
            ON CONFLICT (handle, day)
            DO NOTHING
            "#,
        )
        .bind(handle)
        .bind(day)
        .execute(self.pool)
        .await?;

        // the WHERE guard makes the increment atomic; two concurrent
        // consumers can never both move consumed past total
        let granted = sqlx::query(
            r#"
            UPDATE quota_records
            SET consumed = consumed + 1
            WHERE handle = $1 AND day = $2 AND consumed < total
            "#,
        )
        .bind(handle)
        .bind(day)
        .execute(self.pool)
        .await?
        .rows_affected()
            == 1;

        if !granted {
            tracing::debug!(handle = %handle, %day, "daily award budget exhausted");
        }

        Ok(granted)
    }

    #[instrument(skip(self, handle, day), fields(handle = %handle, day = %day))]
    async fn rollback(&self, handle: &Handle, day: NaiveDate) -> PgResult<()> {
        sqlx::query(
            r#"
            UPDATE quota_records
            SET consumed = GREATEST(consumed - 1, 0)
            WHERE handle = $1 AND day = $2
            "#,
        )
        .bind(handle)
        .bind(day)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, handle, day), fields(handle = %handle, day = %day))]
    async fn record(&self, handle: &Handle, day: NaiveDate) -> PgResult<Option<QuotaRecord>> {
        Ok(sqlx::query_as::<_, QuotaRecord>(
            "SELECT handle, day, total, consumed FROM quota_records WHERE handle = $1 AND day = $2",
        )
        .bind(handle)
        .bind(day)
        .fetch_optional(self.pool)
        .await?)
    }
}
