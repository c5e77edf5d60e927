use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::instrument;

use super::sql_fragment;
use crate::db::PgResult;
use crate::db::models::account::{Account, AuthorStamp, Handle, WindowMask};
use crate::db::repositories::AccountStore;

#[derive(Debug)]
pub struct PgAccountStore {
    pool: &'static Pool<Postgres>,
}

impl PgAccountStore {
    pub fn new(pool: &'static Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    #[instrument(skip(self, handle, stamp), fields(handle = %handle))]
    async fn ensure(&self, handle: &Handle, stamp: Option<&AuthorStamp>) -> PgResult<bool> {
        let stamp_values = stamp.copied().unwrap_or_default();
        let created = sqlx::query(
            r#"
            INSERT INTO accounts (handle, external_id, followers)
            VALUES ($1, $2, $3)
            ON CONFLICT (handle)
            DO NOTHING
            "#,
        )
        .bind(handle)
        .bind(stamp_values.external_id)
        .bind(stamp_values.followers)
        .execute(self.pool)
        .await?
        .rows_affected()
            > 0;

        if !created && stamp.is_some() {
            sqlx::query(
                r#"
                UPDATE accounts
                SET followers = $2,
                    external_id = COALESCE($3, external_id),
                    updated_at = NOW()
                WHERE handle = $1
                "#,
            )
            .bind(handle)
            .bind(stamp_values.followers)
            .bind(stamp_values.external_id)
            .execute(self.pool)
            .await?;
        }

        Ok(created)
    }

    #[instrument(skip(self, handle), fields(handle = %handle))]
    async fn get(&self, handle: &Handle) -> PgResult<Option<Account>> {
        Ok(sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE handle = $1",
            sql_fragment::ACCOUNT_FIELDS
        ))
        .bind(handle)
        .fetch_optional(self.pool)
        .await?)
    }

    #[instrument(skip(self, handle, windows), fields(handle = %handle))]
    async fn credit(&self, handle: &Handle, value: i64, windows: WindowMask) -> PgResult<()> {
        use crate::db::models::account::RollingWindow::*;

        sqlx::query(
            r#"
            UPDATE accounts
            SET total = total + $2,
                points_1d  = points_1d  + CASE WHEN $3 THEN $2 ELSE 0 END,
                points_7d  = points_7d  + CASE WHEN $4 THEN $2 ELSE 0 END,
                points_30d = points_30d + CASE WHEN $5 THEN $2 ELSE 0 END,
                points_90d = points_90d + CASE WHEN $6 THEN $2 ELSE 0 END,
                updated_at = NOW()
            WHERE handle = $1
            "#,
        )
        .bind(handle)
        .bind(value)
        .bind(windows.get(Day))
        .bind(windows.get(Week))
        .bind(windows.get(Month))
        .bind(windows.get(Quarter))
        .execute(self.pool)
        .await?;

        Ok(())
    }

    // the CASE chain is the conditional append: untouched when the window
    // is not selected or the handle is already a member, seeded when the
    // column is empty, appended otherwise
    #[instrument(skip(self, recipient, endorser, windows), fields(recipient = %recipient, endorser = %endorser))]
    async fn record_endorser(
        &self,
        recipient: &Handle,
        endorser: &Handle,
        windows: WindowMask,
    ) -> PgResult<()> {
        use crate::db::models::account::RollingWindow::*;

        sqlx::query(
            r#"
            UPDATE accounts
            SET endorsers_1d = CASE
                    WHEN NOT $3 THEN endorsers_1d
                    WHEN endorsers_1d = '' THEN $2
                    WHEN (',' || endorsers_1d || ',') LIKE ('%,' || $2 || ',%') THEN endorsers_1d
                    ELSE endorsers_1d || ',' || $2
                END,
                endorsers_7d = CASE
                    WHEN NOT $4 THEN endorsers_7d
                    WHEN endorsers_7d = '' THEN $2
                    WHEN (',' || endorsers_7d || ',') LIKE ('%,' || $2 || ',%') THEN endorsers_7d
                    ELSE endorsers_7d || ',' || $2
                END,
                endorsers_30d = CASE
                    WHEN NOT $5 THEN endorsers_30d
                    WHEN endorsers_30d = '' THEN $2
                    WHEN (',' || endorsers_30d || ',') LIKE ('%,' || $2 || ',%') THEN endorsers_30d
                    ELSE endorsers_30d || ',' || $2
                END,
                endorsers_90d = CASE
                    WHEN NOT $6 THEN endorsers_90d
                    WHEN endorsers_90d = '' THEN $2
                    WHEN (',' || endorsers_90d || ',') LIKE ('%,' || $2 || ',%') THEN endorsers_90d
                    ELSE endorsers_90d || ',' || $2
                END,
                updated_at = NOW()
            WHERE handle = $1
            "#,
        )
        .bind(recipient)
        .bind(endorser)
        .bind(windows.get(Day))
        .bind(windows.get(Week))
        .bind(windows.get(Month))
        .bind(windows.get(Quarter))
        .execute(self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, handle), fields(handle = %handle))]
    async fn write_total(&self, handle: &Handle, total: i64) -> PgResult<()> {
        sqlx::query("UPDATE accounts SET total = $2, updated_at = NOW() WHERE handle = $1")
            .bind(handle)
            .bind(total)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    #[instrument(skip(self, handle), fields(handle = %handle))]
    async fn set_quota(&self, handle: &Handle, quota: i64) -> PgResult<()> {
        sqlx::query("UPDATE accounts SET quota = $2, updated_at = NOW() WHERE handle = $1")
            .bind(handle)
            .bind(quota)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    #[instrument(skip(self, handle), fields(handle = %handle))]
    async fn set_multiplier(&self, handle: &Handle, multiplier: i64) -> PgResult<()> {
        sqlx::query("UPDATE accounts SET multiplier = $2, updated_at = NOW() WHERE handle = $1")
            .bind(handle)
            .bind(multiplier)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn top(&self, limit: i64) -> PgResult<Vec<Account>> {
        Ok(sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts ORDER BY total DESC, created_at ASC LIMIT $1",
            sql_fragment::ACCOUNT_FIELDS
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?)
    }
}
