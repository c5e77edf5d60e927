use chrono::NaiveDate;

/// Handle that a post must mention (user-typed, in the body) to enter the
/// endorsement path.
pub const PLATFORM_HANDLE: &str = "getkudos";

/// Pseudo-author used as the source handle on keyword bonus entries.
pub const SYSTEM_AUTHOR: &str = "kudos_rewards";

/// Posts older than this never score, no matter what they mention.
pub const PLATFORM_CUTOFF: NaiveDate = match NaiveDate::from_ymd_opt(2023, 6, 1) {
    Some(d) => d,
    None => panic!("invalid platform cutoff date"),
};

pub const DEFAULT_DAILY_QUOTA: i64 = 3;
pub const DEFAULT_MULTIPLIER: i64 = 1;

/// Posts below this view count never qualify for a keyword bonus.
pub const MIN_KEYWORD_VIEWS: i64 = 1000;

/// Posts per concurrent batch inside one scan run.
pub const SCAN_BATCH_SIZE: usize = 100;

/// Page size the JSONL feed hands to the orchestrator.
pub const FEED_PAGE_SIZE: usize = 500;

/// Suffix appended to a post id for the giver's self-reward row, so it lands
/// in a different uniqueness slot than the recipient's row for the same post.
pub const SELF_POST_SUFFIX: &str = "/self";

/// Prefix for the derived post id of keyword bonus rows (`kw:<keyword>:<id>`).
pub const KEYWORD_POST_PREFIX: &str = "kw:";
