use core::fmt;

use tracing::instrument;

use crate::constants::{DEFAULT_MULTIPLIER, PLATFORM_CUTOFF, PLATFORM_HANDLE};
use crate::db::PgResult;
use crate::db::models::account::Handle;
use crate::db::repositories::Stores;
use crate::engine::post::Post;

/// Why a post was passed over. Not errors; at most debug-logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Repost,
    PreCutoff,
    NoPlatformMention,
    NoRecipient,
    SelfEndorsement,
    OutsideWindow,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SkipReason::Repost => "repost",
            SkipReason::PreCutoff => "predates platform cutoff",
            SkipReason::NoPlatformMention => "no explicit platform mention",
            SkipReason::NoRecipient => "no resolvable recipient",
            SkipReason::SelfEndorsement => "self endorsement",
            SkipReason::OutsideWindow => "outside scan window",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Ineligible(SkipReason),
    Endorsement {
        recipient: Handle,
        /// The author's configured multiplier; the value the recipient row
        /// will carry.
        multiplier: i64,
        /// Account rows lazily created while resolving, for the run tally.
        accounts_created: u64,
    },
}

/// Pure rule set: picks the endorsement recipient from a post's body, quote
/// and reply context. First match wins.
pub fn pick_recipient(post: &Post) -> Option<Handle> {
    let platform = Handle::new(PLATFORM_HANDLE);

    if let Some(mention) = post
        .mentions
        .iter()
        .find(|m| m.explicit && m.handle != platform)
    {
        return Some(mention.handle.clone());
    }

    if let Some(quoted) = &post.quoted_author {
        return Some(quoted.clone());
    }

    if post.reply {
        // likely the auto-carried reply target, still accepted as recipient
        if let Some(leading) = post.leading_mention() {
            return Some(leading);
        }
    }

    None
}

/// Pure eligibility gate ahead of recipient resolution.
pub fn eligibility(post: &Post) -> Option<SkipReason> {
    if post.repost {
        return Some(SkipReason::Repost);
    }
    if post.created_at.date() < PLATFORM_CUTOFF {
        return Some(SkipReason::PreCutoff);
    }
    if !post.mentions_platform() {
        return Some(SkipReason::NoPlatformMention);
    }
    None
}

pub struct MentionResolver {
    stores: Stores,
}

impl MentionResolver {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Validates the post and resolves who is being endorsed, lazily
    /// creating account rows for author and recipient on the way.
    #[instrument(skip(self, post), fields(post_id = post.id, author = %post.author))]
    pub async fn resolve(&self, post: &Post) -> PgResult<Resolution> {
        if let Some(reason) = eligibility(post) {
            return Ok(Resolution::Ineligible(reason));
        }

        let Some(recipient) = pick_recipient(post) else {
            return Ok(Resolution::Ineligible(SkipReason::NoRecipient));
        };

        if recipient == post.author {
            return Ok(Resolution::Ineligible(SkipReason::SelfEndorsement));
        }

        let mut accounts_created = 0;
        if self
            .stores
            .accounts
            .ensure(&post.author, Some(&post.author_stamp()))
            .await?
        {
            accounts_created += 1;
        }
        if self.stores.accounts.ensure(&recipient, None).await? {
            accounts_created += 1;
        }

        let multiplier = self
            .stores
            .accounts
            .get(&post.author)
            .await?
            .map(|account| account.multiplier)
            .unwrap_or(DEFAULT_MULTIPLIER);

        Ok(Resolution::Endorsement {
            recipient,
            multiplier,
            accounts_created,
        })
    }
}
