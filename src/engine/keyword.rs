use chrono::NaiveDateTime;
use tracing::instrument;

use crate::constants::MIN_KEYWORD_VIEWS;
use crate::db::PgResult;
use crate::db::models::point::PointEntry;
use crate::db::repositories::Stores;
use crate::engine::aggregator::ReputationAggregator;
use crate::engine::post::Post;

/// Bonus granted through the keyword path, with enough context for the
/// run tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordAward {
    pub points: i64,
    pub account_created: bool,
}

/// Secondary award path keyed on the rotating keyword. Runs independently
/// of mention resolution but never on a post that mentions the platform
/// handle, so a post cannot score through both paths.
pub struct KeywordBonus {
    stores: Stores,
    aggregator: ReputationAggregator,
}

impl KeywordBonus {
    pub fn new(stores: Stores) -> Self {
        Self {
            aggregator: ReputationAggregator::new(stores.clone()),
            stores,
        }
    }

    #[instrument(skip(self, post, now), fields(post_id = post.id, author = %post.author))]
    pub async fn try_award(
        &self,
        post: &Post,
        now: NaiveDateTime,
    ) -> PgResult<Option<KeywordAward>> {
        if post.body_contains_platform() {
            return Ok(None);
        }

        let Some(keyword) = self.stores.keywords.active().await? else {
            return Ok(None);
        };

        if !keyword.matches(&post.body) {
            return Ok(None);
        }

        // posts that predate the keyword's activation never qualify, no
        // matter when they are scanned
        if post.created_at.date() < keyword.active_on {
            tracing::debug!(post_id = post.id, "post predates keyword activation");
            return Ok(None);
        }

        if post.engagement.views < MIN_KEYWORD_VIEWS {
            tracing::debug!(
                post_id = post.id,
                views = post.engagement.views,
                "below keyword view threshold"
            );
            return Ok(None);
        }

        let account_created = self
            .stores
            .accounts
            .ensure(&post.author, Some(&post.author_stamp()))
            .await?;

        if self
            .stores
            .ledger
            .keyword_awarded_on(&post.author, &keyword.keyword, post.date())
            .await?
        {
            tracing::debug!(
                post_id = post.id,
                keyword = keyword.keyword,
                "keyword bonus already granted for this day"
            );
            return Ok(None);
        }

        let entry = PointEntry::keyword_bonus(
            post.author.clone(),
            &keyword.keyword,
            &post.id,
            keyword.points,
            post.created_at,
        );

        // the unique triple still backstops the day-level check above
        if !self.stores.ledger.insert(&entry).await? {
            return Ok(None);
        }

        self.aggregator.apply(&entry, None, now).await?;

        tracing::info!(
            author = %post.author,
            keyword = keyword.keyword,
            points = keyword.points,
            "keyword bonus granted"
        );

        Ok(Some(KeywordAward {
            points: keyword.points,
            account_created,
        }))
    }
}
