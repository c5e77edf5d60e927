use std::sync::LazyLock;

use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::util::env::{self, Var};
use crate::var;

pub mod models;
pub mod repositories;

pub mod prelude {
    pub use crate::db::models::account::{
        Account, AuthorStamp, Handle, HandleSet, RollingWindow, WindowMask,
    };
    pub use crate::db::models::keyword::KeywordOfDay;
    pub use crate::db::models::point::{AwardInsert, PointEntry};
    pub use crate::db::models::quota::QuotaRecord;
    pub use crate::db::models::scan::{ScanRun, ScanStatus, ScanTally};
    pub use crate::db::repositories::{
        AccountStore, KeywordStore, LedgerStore, QuotaStore, ScanRunStore, Stores,
    };
    pub use crate::db::{PgError, PgResult, db_pool};
}

static DB_POOL: LazyLock<OnceCell<Db>> = LazyLock::new(OnceCell::new);

pub async fn db_pool() -> PgResult<&'static PgPool> {
    Ok(&DB_POOL
        .get_or_try_init(|| async { Db::new_pool().await })
        .await?
        .pool)
}

struct Db {
    pool: PgPool,
}

impl Db {
    pub async fn new_pool() -> PgResult<Self> {
        let db_url = var!(Var::DatabaseUrl).await?;
        let pool = sqlx::PgPool::connect(db_url).await?;

        Ok(Self { pool })
    }
}

pub type PgResult<T> = core::result::Result<T, PgError>;

#[derive(Debug, Error)]
pub enum PgError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("{0}")]
    Env(#[from] env::EnvError),
}
