use chrono::NaiveDateTime;
use tracing::instrument;

use crate::db::PgResult;
use crate::db::models::account::{Handle, WindowMask};
use crate::db::models::point::PointEntry;
use crate::db::repositories::Stores;

/// Maintains the cached per-account totals and rolling-window aggregates
/// derived from the ledger. The cache is an optimization: reads self-heal
/// from the ledger, which stays the system of record.
pub struct ReputationAggregator {
    stores: Stores,
}

impl ReputationAggregator {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Folds one freshly inserted ledger entry into the recipient's cached
    /// aggregates. Callers gate on the insert report; an entry must never be
    /// applied twice. `endorser` is set when the giver carries influencer
    /// status and this is the recipient-side award.
    #[instrument(skip(self, entry, now), fields(recipient = %entry.recipient, value = entry.value))]
    pub async fn apply(
        &self,
        entry: &PointEntry,
        endorser: Option<&Handle>,
        now: NaiveDateTime,
    ) -> PgResult<()> {
        let windows = WindowMask::at(entry.created_at, now);

        self.stores
            .accounts
            .credit(&entry.recipient, entry.value, windows)
            .await?;

        if let Some(endorser) = endorser
            && windows.any()
        {
            self.stores
                .accounts
                .record_endorser(&entry.recipient, endorser, windows)
                .await?;
        }

        Ok(())
    }

    /// Cached total with fallback: a zero or missing cache is recomputed
    /// from the ledger and persisted before being returned.
    #[instrument(skip(self, handle), fields(handle = %handle))]
    pub async fn total_of(&self, handle: &Handle) -> PgResult<i64> {
        let cached = self
            .stores
            .accounts
            .get(handle)
            .await?
            .map(|account| account.total)
            .unwrap_or(0);

        if cached > 0 {
            return Ok(cached);
        }

        let recomputed = self.stores.ledger.sum_for_recipient(handle).await?;
        if recomputed != cached {
            tracing::info!(handle = %handle, recomputed, "cached total healed from ledger");
            self.stores.accounts.write_total(handle, recomputed).await?;
        }

        Ok(recomputed)
    }
}
