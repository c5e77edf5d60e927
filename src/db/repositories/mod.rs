use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::db::PgResult;
use crate::db::models::account::{Account, AuthorStamp, Handle, WindowMask};
use crate::db::models::keyword::KeywordOfDay;
use crate::db::models::point::{AwardInsert, PointEntry};
use crate::db::models::quota::QuotaRecord;
use crate::db::models::scan::{ScanRun, ScanTally};

pub mod account;
pub mod keyword;
pub mod ledger;
pub mod quota;
pub mod scan;

/// Account rows plus the cached aggregates the engine maintains on them.
/// Every mutation is a single statement; the engine never holds locks.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Lazily creates the row, returning whether it was created. An existing
    /// row is re-stamped with the profile data when one is supplied.
    async fn ensure(&self, handle: &Handle, stamp: Option<&AuthorStamp>) -> PgResult<bool>;

    async fn get(&self, handle: &Handle) -> PgResult<Option<Account>>;

    /// Adds `value` to the cached total and to every window sum the mask
    /// selects, in one statement.
    async fn credit(&self, handle: &Handle, value: i64, windows: WindowMask) -> PgResult<()>;

    /// Appends `endorser` to the recipient's per-window endorser sets via a
    /// conditional append expression; already-present handles are left alone
    /// without the row ever being read first.
    async fn record_endorser(
        &self,
        recipient: &Handle,
        endorser: &Handle,
        windows: WindowMask,
    ) -> PgResult<()>;

    /// Persists a recomputed total (the aggregator's self-heal path).
    async fn write_total(&self, handle: &Handle, total: i64) -> PgResult<()>;

    /// Administrative override; affects quota snapshots from the next day's
    /// record creation onward, never retroactively.
    async fn set_quota(&self, handle: &Handle, quota: i64) -> PgResult<()>;

    async fn set_multiplier(&self, handle: &Handle, multiplier: i64) -> PgResult<()>;

    async fn top(&self, limit: i64) -> PgResult<Vec<Account>>;
}

/// Daily award budgets. Consumption is linearizable per (handle, day)
/// through the storage layer's conditional update alone.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Reserves one unit of the author's budget for `day`. Creates the
    /// record on first use, seeded from the account's current quota and
    /// multiplier. Returns `false` with no side effect when exhausted.
    async fn try_consume(&self, handle: &Handle, day: NaiveDate) -> PgResult<bool>;

    /// Releases one reserved unit, floored at zero. Best-effort companion
    /// for award attempts that fail after the reservation.
    async fn rollback(&self, handle: &Handle, day: NaiveDate) -> PgResult<()>;

    async fn record(&self, handle: &Handle, day: NaiveDate) -> PgResult<Option<QuotaRecord>>;
}

/// The append-only point ledger; the unique triple is enforced here and
/// nowhere else.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Single insert; `false` means the uniqueness slot was already taken.
    async fn insert(&self, entry: &PointEntry) -> PgResult<bool>;

    /// Recipient award and paired giver self-reward in one transaction.
    async fn insert_pair(
        &self,
        recipient: &PointEntry,
        giver: &PointEntry,
    ) -> PgResult<AwardInsert>;

    async fn sum_for_recipient(&self, handle: &Handle) -> PgResult<i64>;

    /// Whether a bonus for `keyword` was already granted to `recipient` on
    /// the calendar day of `day` (the keyword path's own dedup, layered on
    /// the unique triple).
    async fn keyword_awarded_on(
        &self,
        recipient: &Handle,
        keyword: &str,
        day: NaiveDate,
    ) -> PgResult<bool>;

    async fn history(&self, recipient: &Handle, limit: i64) -> PgResult<Vec<PointEntry>>;
}

#[async_trait]
pub trait KeywordStore: Send + Sync {
    async fn active(&self) -> PgResult<Option<KeywordOfDay>>;

    /// Rotates the bonus phrase: deactivates the current row and upserts the
    /// new one as active.
    async fn activate(&self, keyword: &str, points: i64, active_on: NaiveDate) -> PgResult<()>;
}

#[async_trait]
pub trait ScanRunStore: Send + Sync {
    async fn create(&self, run: &ScanRun) -> PgResult<()>;
    async fn complete(&self, id: &str, tally: &ScanTally) -> PgResult<()>;
    async fn fail(&self, id: &str, tally: &ScanTally, error: &str) -> PgResult<()>;
    async fn recent(&self, limit: i64) -> PgResult<Vec<ScanRun>>;
}

/// Bundle the engine components share. Cheap to clone; concrete backings
/// are swapped wholesale (Postgres in production, in-memory in tests).
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub quotas: Arc<dyn QuotaStore>,
    pub ledger: Arc<dyn LedgerStore>,
    pub keywords: Arc<dyn KeywordStore>,
    pub runs: Arc<dyn ScanRunStore>,
}

impl Stores {
    pub fn postgres(pool: &'static Pool<Postgres>) -> Self {
        Self {
            accounts: Arc::new(account::PgAccountStore::new(pool)),
            quotas: Arc::new(quota::PgQuotaStore::new(pool)),
            ledger: Arc::new(ledger::PgLedgerStore::new(pool)),
            keywords: Arc::new(keyword::PgKeywordStore::new(pool)),
            runs: Arc::new(scan::PgScanRunStore::new(pool)),
        }
    }
}

pub(crate) mod sql_fragment {
    pub const ACCOUNT_FIELDS: &str = r#"
        handle,
        external_id,
        followers,
        total,
        multiplier,
        quota,
        points_1d,
        points_7d,
        points_30d,
        points_90d,
        endorsers_1d,
        endorsers_7d,
        endorsers_30d,
        endorsers_90d,
        created_at,
        updated_at
    "#;

    pub const POINT_ENTRY_FIELDS: &str = r#"
        source,
        recipient,
        post_id,
        value,
        created_at,
        influencer_bonus,
        manual,
        loyalty_ref
    "#;
}
