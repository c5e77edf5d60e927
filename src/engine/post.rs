use std::path::Path;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use thiserror::Error;

use crate::constants::{FEED_PAGE_SIZE, PLATFORM_HANDLE};
use crate::db::models::account::{AuthorStamp, Handle};

/// Normalized post record handed over by the ingestion collaborator. The
/// engine consumes it read-only; mention classification (including the
/// explicit-vs-carried distinction) is done upstream and trusted as-is.
#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: String,
    pub author: Handle,
    #[serde(default)]
    pub author_external_id: Option<i64>,
    #[serde(default)]
    pub author_followers: i64,
    pub body: String,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub repost: bool,
    #[serde(default)]
    pub quoted_author: Option<Handle>,
    #[serde(default)]
    pub reply: bool,
    #[serde(default)]
    pub mentions: Vec<Mention>,
    #[serde(default)]
    pub engagement: Engagement,
}

/// One classified mention. `explicit` is true only when the author actually
/// typed the handle into the body, as opposed to it being auto-carried from
/// a reply target.
#[derive(Debug, Clone, Deserialize)]
pub struct Mention {
    pub handle: Handle,
    #[serde(default)]
    pub explicit: bool,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Engagement {
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub reposts: i64,
    #[serde(default)]
    pub replies: i64,
}

impl Post {
    pub fn date(&self) -> NaiveDate {
        self.created_at.date()
    }

    pub fn is_quote(&self) -> bool {
        self.quoted_author.is_some()
    }

    pub fn author_stamp(&self) -> AuthorStamp {
        AuthorStamp {
            external_id: self.author_external_id,
            followers: self.author_followers,
        }
    }

    /// An explicit, user-typed mention of the platform's own handle; the
    /// ticket into the endorsement path.
    pub fn mentions_platform(&self) -> bool {
        let platform = Handle::new(PLATFORM_HANDLE);
        self.mentions.iter().any(|m| m.explicit && m.handle == platform)
    }

    /// Plain-text check used by the keyword path to keep the two award
    /// paths mutually exclusive, deliberately broader than
    /// [`Post::mentions_platform`] so carried mentions also exclude a post.
    pub fn body_contains_platform(&self) -> bool {
        self.body
            .to_lowercase()
            .contains(&format!("@{PLATFORM_HANDLE}"))
    }

    /// The handle a reply body leads with, when it leads with one.
    pub fn leading_mention(&self) -> Option<Handle> {
        let trimmed = self.body.trim_start();
        let raw = trimmed.strip_prefix('@')?;
        let handle: String = raw
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();

        if handle.is_empty() {
            return None;
        }

        Some(Handle::new(&handle))
    }
}

pub type FeedResult<T> = core::result::Result<T, FeedError>;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("feed record on line {line} is malformed: {source}")]
    Malformed {
        line: usize,
        source: serde_json::Error,
    },

    #[error("feed source error: {0}")]
    Source(String),
}

/// The ingestion seam. Implementations hand the orchestrator pages of
/// normalized posts until exhausted; a page-level error aborts the run.
#[async_trait]
pub trait PostSource: Send {
    async fn next_page(&mut self) -> FeedResult<Option<Vec<Post>>>;
}

/// One-shot feed over a JSONL dump, one post per line. The whole file is
/// parsed up front so malformed input surfaces before a ScanRun is opened.
#[derive(Debug)]
pub struct JsonlFeed {
    pages: Vec<Vec<Post>>,
}

impl JsonlFeed {
    pub fn open(path: impl AsRef<Path>) -> FeedResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut posts = Vec::new();

        for (idx, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let post = serde_json::from_str::<Post>(line)
                .map_err(|source| FeedError::Malformed { line: idx + 1, source })?;
            posts.push(post);
        }

        let mut pages: Vec<Vec<Post>> = posts
            .chunks(FEED_PAGE_SIZE)
            .map(|chunk| chunk.to_vec())
            .collect();
        pages.reverse();

        Ok(Self { pages })
    }

    pub fn len(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[async_trait]
impl PostSource for JsonlFeed {
    async fn next_page(&mut self) -> FeedResult<Option<Vec<Post>>> {
        Ok(self.pages.pop())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn post(body: &str) -> Post {
        Post {
            id: "p1".to_string(),
            author: "alice".into(),
            author_external_id: None,
            author_followers: 0,
            body: body.to_string(),
            created_at: chrono::Utc::now().naive_utc(),
            repost: false,
            quoted_author: None,
            reply: false,
            mentions: Vec::new(),
            engagement: Engagement::default(),
        }
    }

    #[test]
    fn leading_mention_requires_leading_at() {
        assert_eq!(post("@Bob you rock").leading_mention(), Some("bob".into()));
        assert_eq!(post("  @carol_x hi").leading_mention(), Some("carol_x".into()));
        assert_eq!(post("hey @bob").leading_mention(), None);
        assert_eq!(post("@ nothing").leading_mention(), None);
    }

    #[test]
    fn platform_text_check_is_case_insensitive() {
        assert!(post("love @GetKudos today").body_contains_platform());
        assert!(!post("love getkudos today").body_contains_platform());
    }

    #[test]
    fn jsonl_feed_parses_records_and_skips_blank_lines() {
        let path = std::env::temp_dir().join("kudos-engine-feed-test.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"id":"p1","author":"Alice","body":"hi","created_at":"2025-03-01T10:00:00"}"#,
                "\n\n",
                r#"{"id":"p2","author":"@Bob","body":"yo","created_at":"2025-03-01T11:00:00","reply":true}"#,
                "\n",
            ),
        )
        .unwrap();

        let mut feed = JsonlFeed::open(&path).unwrap();
        assert_eq!(feed.len(), 2);

        let page = futures::executor::block_on(feed.next_page()).unwrap().unwrap();
        assert_eq!(page[0].author, "alice".into());
        assert_eq!(page[1].author, "bob".into());
        assert!(page[1].reply);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn malformed_feed_line_is_reported_with_its_number() {
        let path = std::env::temp_dir().join("kudos-engine-feed-bad.jsonl");
        std::fs::write(&path, "{\"id\":\"p1\"}\n").unwrap();

        match JsonlFeed::open(&path) {
            Err(FeedError::Malformed { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected malformed feed error, got {other:?}"),
        }

        std::fs::remove_file(&path).ok();
    }
}
