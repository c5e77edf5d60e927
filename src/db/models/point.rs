use chrono::NaiveDateTime;

use super::account::Handle;
use crate::constants::{KEYWORD_POST_PREFIX, SELF_POST_SUFFIX, SYSTEM_AUTHOR};

/// Ledger row. Append-only; the `(source, recipient, post_id)` triple is
/// unique at the storage layer and carries the whole idempotency contract.
/// `created_at` is the post's timestamp, not wall-clock.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PointEntry {
    pub source: Handle,
    pub recipient: Handle,
    pub post_id: String,
    pub value: i64,
    pub created_at: NaiveDateTime,
    pub influencer_bonus: bool,
    pub manual: bool,
    pub loyalty_ref: Option<String>,
}

impl PointEntry {
    /// Recipient-side award for a resolved endorsement. A multiplied value
    /// marks the entry as an influencer bonus.
    pub fn endorsement(
        source: Handle,
        recipient: Handle,
        post_id: &str,
        value: i64,
        at: NaiveDateTime,
    ) -> Self {
        Self {
            source,
            recipient,
            post_id: post_id.to_string(),
            value,
            created_at: at,
            influencer_bonus: value > 1,
            manual: false,
            loyalty_ref: None,
        }
    }

    /// Giver's paired self-reward: always exactly 1 point, never multiplied,
    /// keyed under a suffixed post id so it cannot collide with the
    /// recipient's row.
    pub fn self_reward(author: Handle, post_id: &str, at: NaiveDateTime) -> Self {
        Self {
            source: author.clone(),
            recipient: author,
            post_id: self_post_id(post_id),
            value: 1,
            created_at: at,
            influencer_bonus: false,
            manual: false,
            loyalty_ref: None,
        }
    }

    /// Keyword bonus from the system pseudo-author to the posting account.
    pub fn keyword_bonus(author: Handle, keyword: &str, post_id: &str, points: i64, at: NaiveDateTime) -> Self {
        Self {
            source: Handle::new(SYSTEM_AUTHOR),
            recipient: author,
            post_id: keyword_post_id(keyword, post_id),
            value: points,
            created_at: at,
            influencer_bonus: false,
            manual: false,
            loyalty_ref: None,
        }
    }

    /// Operator-issued grant outside the scan paths.
    pub fn manual_grant(
        source: Handle,
        recipient: Handle,
        post_id: &str,
        value: i64,
        at: NaiveDateTime,
        loyalty_ref: Option<String>,
    ) -> Self {
        Self {
            source,
            recipient,
            post_id: post_id.to_string(),
            value,
            created_at: at,
            influencer_bonus: false,
            manual: true,
            loyalty_ref,
        }
    }
}

pub fn self_post_id(post_id: &str) -> String {
    format!("{post_id}{SELF_POST_SUFFIX}")
}

pub fn keyword_post_id(keyword: &str, post_id: &str) -> String {
    format!("{}{}", keyword_post_prefix(keyword), post_id)
}

/// Prefix shared by every bonus row for one keyword; the same-day dedup
/// query matches on it.
pub fn keyword_post_prefix(keyword: &str) -> String {
    format!("{KEYWORD_POST_PREFIX}{}:", keyword.to_lowercase())
}

/// Which of the paired award rows actually landed. Conflicted inserts are
/// expected and benign, so this is a report, not an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AwardInsert {
    pub recipient: bool,
    pub giver: bool,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn derived_post_ids_occupy_distinct_slots() {
        assert_eq!(self_post_id("1881"), "1881/self");
        assert_eq!(keyword_post_id("WAGMI", "1881"), "kw:wagmi:1881");
        assert_ne!(self_post_id("1881"), keyword_post_id("wagmi", "1881"));
    }

    #[test]
    fn multiplied_endorsement_is_flagged() {
        let at = chrono::Utc::now().naive_utc();
        let plain = PointEntry::endorsement("a".into(), "b".into(), "p1", 1, at);
        let boosted = PointEntry::endorsement("a".into(), "b".into(), "p1", 5, at);
        assert!(!plain.influencer_bonus);
        assert!(boosted.influencer_bonus);

        let own = PointEntry::self_reward("a".into(), "p1", at);
        assert_eq!(own.value, 1);
        assert!(!own.influencer_bonus);
    }
}
