use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use tracing::instrument;

use crate::db::PgResult;
use crate::db::models::keyword::KeywordOfDay;
use crate::db::repositories::KeywordStore;

#[derive(Debug)]
pub struct PgKeywordStore {
    pool: &'static Pool<Postgres>,
}

impl PgKeywordStore {
    pub fn new(pool: &'static Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeywordStore for PgKeywordStore {
    #[instrument(skip(self))]
    async fn active(&self) -> PgResult<Option<KeywordOfDay>> {
        Ok(sqlx::query_as::<_, KeywordOfDay>(
            "SELECT keyword, active_on, points, active FROM keyword_of_day WHERE active LIMIT 1",
        )
        .fetch_optional(self.pool)
        .await?)
    }

    #[instrument(skip(self))]
    async fn activate(&self, keyword: &str, points: i64, active_on: NaiveDate) -> PgResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE keyword_of_day SET active = FALSE WHERE active")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO keyword_of_day (keyword, active_on, points, active)
            VALUES ($1, $2, $3, TRUE)
            ON CONFLICT (keyword)
            DO UPDATE SET
                active_on = $2,
                points = $3,
                active = TRUE
            "#,
        )
        .bind(keyword.to_lowercase())
        .bind(active_on)
        .bind(points)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
