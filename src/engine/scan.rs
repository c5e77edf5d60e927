use chrono::{NaiveDateTime, Utc};
use futures::future::join_all;
use thiserror::Error;
use tracing::instrument;

use crate::constants::SCAN_BATCH_SIZE;
use crate::db::PgError;
use crate::db::models::account::Handle;
use crate::db::models::point::PointEntry;
use crate::db::models::scan::{ScanRun, ScanStatus, ScanTally};
use crate::db::repositories::Stores;
use crate::engine::aggregator::ReputationAggregator;
use crate::engine::keyword::KeywordBonus;
use crate::engine::post::{FeedError, Post, PostSource};
use crate::engine::resolver::{MentionResolver, Resolution, SkipReason};

pub type ScanResult<T> = core::result::Result<T, ScanError>;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Db(#[from] PgError),

    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// Bounds on the post timestamps a run will consider.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanWindow {
    pub since: Option<NaiveDateTime>,
    pub until: Option<NaiveDateTime>,
}

impl ScanWindow {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn between(since: Option<NaiveDateTime>, until: Option<NaiveDateTime>) -> Self {
        Self { since, until }
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        if let Some(since) = self.since
            && at < since
        {
            return false;
        }
        if let Some(until) = self.until
            && at > until
        {
            return false;
        }
        true
    }
}

/// Terminal state of one post within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    Skipped(SkipReason),
    Awarded { points: i64, accounts_created: u64 },
    KeywordAwarded { points: i64, accounts_created: u64 },
    Exhausted,
    Duplicate,
    Failed,
}

/// What a finished run reports to the operator: counters plus the run row's
/// identity and terminal status.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub run_id: String,
    pub status: ScanStatus,
    pub tally: ScanTally,
}

/// Drives a whole scan: pulls pages from the ingestion seam, fans each
/// batch out concurrently, and funnels every post through resolve ->
/// quota -> ledger -> aggregator -> keyword. Holds no locks and assumes
/// other orchestrator instances may be running against the same store.
pub struct ScanOrchestrator {
    stores: Stores,
    resolver: MentionResolver,
    aggregator: ReputationAggregator,
    keyword: KeywordBonus,
    window: ScanWindow,
}

impl ScanOrchestrator {
    pub fn new(stores: Stores, window: ScanWindow) -> Self {
        Self {
            resolver: MentionResolver::new(stores.clone()),
            aggregator: ReputationAggregator::new(stores.clone()),
            keyword: KeywordBonus::new(stores.clone()),
            stores,
            window,
        }
    }

    /// Runs the state machine over one feed: `Running` until the source is
    /// drained, then `Completed`; a source failure lands in `Failed` with
    /// the error persisted. Awards committed before a failure stand.
    #[instrument(skip(self, source))]
    pub async fn run(&self, source: &mut dyn PostSource) -> ScanResult<ScanReport> {
        let run = ScanRun::begin();
        self.stores.runs.create(&run).await?;
        tracing::info!(run_id = run.id, "scan run started");

        let mut tally = ScanTally::default();

        loop {
            let page = match source.next_page().await {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(run_id = run.id, error = %e, "post source failed, aborting run");
                    if let Err(persist_err) =
                        self.stores.runs.fail(&run.id, &tally, &e.to_string()).await
                    {
                        tracing::error!(run_id = run.id, error = ?persist_err, "could not persist failed run");
                    }
                    return Err(e.into());
                }
            };

            for batch in page.chunks(SCAN_BATCH_SIZE) {
                let now = Utc::now().naive_utc();
                let outcomes = join_all(batch.iter().map(|post| self.process(post, now))).await;
                for outcome in outcomes {
                    tally_outcome(&mut tally, outcome);
                }
            }
        }

        self.stores.runs.complete(&run.id, &tally).await?;
        tracing::info!(
            run_id = run.id,
            scanned = tally.scanned,
            points = tally.points_awarded,
            accounts = tally.accounts_created,
            "scan run completed"
        );

        Ok(ScanReport {
            run_id: run.id,
            status: ScanStatus::Completed,
            tally,
        })
    }

    /// One post, start to finish. Never propagates: storage errors are
    /// logged, the quota reservation is released, and the batch moves on.
    async fn process(&self, post: &Post, now: NaiveDateTime) -> PostOutcome {
        if !self.window.contains(post.created_at) {
            tracing::debug!(post_id = post.id, "skipped: {}", SkipReason::OutsideWindow);
            return PostOutcome::Skipped(SkipReason::OutsideWindow);
        }

        let resolution = match self.resolver.resolve(post).await {
            Ok(resolution) => resolution,
            Err(e) => {
                tracing::error!(post_id = post.id, error = ?e, "resolution failed");
                return PostOutcome::Failed;
            }
        };

        match resolution {
            Resolution::Ineligible(reason) => {
                tracing::debug!(post_id = post.id, "skipped: {reason}");
                match self.keyword.try_award(post, now).await {
                    Ok(Some(award)) => PostOutcome::KeywordAwarded {
                        points: award.points,
                        accounts_created: u64::from(award.account_created),
                    },
                    Ok(None) => PostOutcome::Skipped(reason),
                    Err(e) => {
                        tracing::warn!(post_id = post.id, error = ?e, "keyword path failed");
                        PostOutcome::Skipped(reason)
                    }
                }
            }
            Resolution::Endorsement {
                recipient,
                multiplier,
                accounts_created,
            } => {
                self.endorse(post, recipient, multiplier, accounts_created, now)
                    .await
            }
        }
    }

    async fn endorse(
        &self,
        post: &Post,
        recipient: Handle,
        multiplier: i64,
        accounts_created: u64,
        now: NaiveDateTime,
    ) -> PostOutcome {
        // the reservation is charged against the post's own day, not the
        // day the scan happens to run
        let day = post.date();
        match self.stores.quotas.try_consume(&post.author, day).await {
            Ok(true) => {}
            Ok(false) => return PostOutcome::Exhausted,
            Err(e) => {
                tracing::error!(post_id = post.id, error = ?e, "quota reservation failed");
                return PostOutcome::Failed;
            }
        }

        match self.award(post, &recipient, multiplier, now).await {
            Ok(Some(mut points)) => {
                // always attempted after an award; a mention-path post
                // contains the platform handle so this is a no-op by rule
                match self.keyword.try_award(post, now).await {
                    Ok(Some(award)) => points += award.points,
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(post_id = post.id, error = ?e, "keyword path failed")
                    }
                }
                PostOutcome::Awarded {
                    points,
                    accounts_created,
                }
            }
            Ok(None) => {
                // resubmitted post: the slot was already taken, so the
                // fresh reservation must be handed back for the rescan to
                // be a true no-op
                self.release_quota(post, "duplicate award").await;
                PostOutcome::Duplicate
            }
            Err(e) => {
                tracing::error!(post_id = post.id, error = ?e, "award failed after reservation");
                self.release_quota(post, "failed award").await;
                PostOutcome::Failed
            }
        }
    }

    /// Paired ledger writes plus aggregation. `None` means the recipient
    /// row already existed (duplicate submission).
    async fn award(
        &self,
        post: &Post,
        recipient: &Handle,
        multiplier: i64,
        now: NaiveDateTime,
    ) -> Result<Option<i64>, PgError> {
        let recipient_entry = PointEntry::endorsement(
            post.author.clone(),
            recipient.clone(),
            &post.id,
            multiplier,
            post.created_at,
        );
        let giver_entry = PointEntry::self_reward(post.author.clone(), &post.id, post.created_at);

        let inserted = self
            .stores
            .ledger
            .insert_pair(&recipient_entry, &giver_entry)
            .await?;

        if !inserted.recipient {
            return Ok(None);
        }

        let endorser = recipient_entry
            .influencer_bonus
            .then(|| post.author.clone());
        self.aggregator
            .apply(&recipient_entry, endorser.as_ref(), now)
            .await?;

        let mut points = recipient_entry.value;
        if inserted.giver {
            self.aggregator.apply(&giver_entry, None, now).await?;
            points += giver_entry.value;
        }

        tracing::info!(
            post_id = post.id,
            author = %post.author,
            recipient = %recipient,
            points,
            "endorsement awarded"
        );

        Ok(Some(points))
    }

    /// Best-effort: a stuck reservation only narrows the author's budget,
    /// while escalating here would fail a post that may have awarded fine.
    async fn release_quota(&self, post: &Post, why: &str) {
        if let Err(e) = self.stores.quotas.rollback(&post.author, post.date()).await {
            tracing::warn!(
                post_id = post.id,
                author = %post.author,
                error = ?e,
                "quota rollback after {why} failed"
            );
        }
    }
}

fn tally_outcome(tally: &mut ScanTally, outcome: PostOutcome) {
    tally.scanned += 1;
    match outcome {
        PostOutcome::Skipped(_) => tally.skipped += 1,
        PostOutcome::Awarded {
            points,
            accounts_created,
        } => {
            tally.awarded_posts += 1;
            tally.points_awarded += points;
            tally.accounts_created += accounts_created;
        }
        PostOutcome::KeywordAwarded {
            points,
            accounts_created,
        } => {
            tally.keyword_bonuses += 1;
            tally.points_awarded += points;
            tally.accounts_created += accounts_created;
        }
        PostOutcome::Exhausted => tally.exhausted += 1,
        PostOutcome::Duplicate => tally.duplicates += 1,
        PostOutcome::Failed => tally.failed += 1,
    }
}
