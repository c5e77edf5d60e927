use async_trait::async_trait;
use chrono::{Days, NaiveDate, NaiveTime};
use sqlx::{Pool, Postgres, Transaction};
use tracing::instrument;

use super::sql_fragment;
use crate::constants::SYSTEM_AUTHOR;
use crate::db::PgResult;
use crate::db::models::account::Handle;
use crate::db::models::point::{AwardInsert, PointEntry, keyword_post_prefix};
use crate::db::repositories::LedgerStore;

#[derive(Debug)]
pub struct PgLedgerStore {
    pool: &'static Pool<Postgres>,
}

impl PgLedgerStore {
    pub fn new(pool: &'static Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn insert_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        entry: &PointEntry,
    ) -> PgResult<bool> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO point_entries (
                source,
                recipient,
                post_id,
                value,
                created_at,
                influencer_bonus,
                manual,
                loyalty_ref
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (source, recipient, post_id)
            DO NOTHING
            "#,
        )
        .bind(&entry.source)
        .bind(&entry.recipient)
        .bind(&entry.post_id)
        .bind(entry.value)
        .bind(entry.created_at)
        .bind(entry.influencer_bonus)
        .bind(entry.manual)
        .bind(&entry.loyalty_ref)
        .execute(&mut **tx)
        .await?
        .rows_affected()
            == 1;

        Ok(inserted)
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    #[instrument(skip(self, entry), fields(source = %entry.source, recipient = %entry.recipient, post_id = entry.post_id))]
    async fn insert(&self, entry: &PointEntry) -> PgResult<bool> {
        let mut tx = self.pool.begin().await?;
        let inserted = Self::insert_in_tx(&mut tx, entry).await?;
        tx.commit().await?;

        Ok(inserted)
    }

    #[instrument(skip(self, recipient, giver), fields(source = %recipient.source, recipient = %recipient.recipient, post_id = recipient.post_id))]
    async fn insert_pair(
        &self,
        recipient: &PointEntry,
        giver: &PointEntry,
    ) -> PgResult<AwardInsert> {
        let mut tx = self.pool.begin().await?;

        let result = AwardInsert {
            recipient: Self::insert_in_tx(&mut tx, recipient).await?,
            giver: Self::insert_in_tx(&mut tx, giver).await?,
        };

        tx.commit().await?;

        if !result.recipient {
            tracing::debug!(post_id = recipient.post_id, "award already recorded, insert collapsed");
        }

        Ok(result)
    }

    #[instrument(skip(self, handle), fields(handle = %handle))]
    async fn sum_for_recipient(&self, handle: &Handle) -> PgResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(value), 0) FROM point_entries WHERE recipient = $1",
        )
        .bind(handle)
        .fetch_one(self.pool)
        .await?)
    }

    #[instrument(skip(self, recipient), fields(recipient = %recipient))]
    async fn keyword_awarded_on(
        &self,
        recipient: &Handle,
        keyword: &str,
        day: NaiveDate,
    ) -> PgResult<bool> {
        let day_start = day.and_time(NaiveTime::MIN);
        let day_end = day
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDate::MAX)
            .and_time(NaiveTime::MIN);

        Ok(sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM point_entries
                WHERE recipient = $1
                AND source = $2
                AND post_id LIKE $3
                AND created_at >= $4
                AND created_at < $5
            )
            "#,
        )
        .bind(recipient)
        .bind(Handle::new(SYSTEM_AUTHOR))
        .bind(format!("{}%", keyword_post_prefix(keyword)))
        .bind(day_start)
        .bind(day_end)
        .fetch_one(self.pool)
        .await?)
    }

    #[instrument(skip(self, recipient), fields(recipient = %recipient))]
    async fn history(&self, recipient: &Handle, limit: i64) -> PgResult<Vec<PointEntry>> {
        Ok(sqlx::query_as::<_, PointEntry>(&format!(
            "SELECT {} FROM point_entries WHERE recipient = $1 ORDER BY created_at DESC LIMIT $2",
            sql_fragment::POINT_ENTRY_FIELDS
        ))
        .bind(recipient)
        .bind(limit)
        .fetch_all(self.pool)
        .await?)
    }
}
