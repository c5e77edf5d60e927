use core::fmt;

use chrono::{NaiveDateTime, Utc};
use uuid::Uuid;

/// One orchestrator invocation. Purely observational; the award logic never
/// reads these rows back.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScanRun {
    pub id: String,
    pub status: String,
    pub started_at: NaiveDateTime,
    pub finished_at: Option<NaiveDateTime>,
    pub posts_scanned: i64,
    pub points_awarded: i64,
    pub accounts_created: i64,
    pub error: Option<String>,
}

impl ScanRun {
    pub fn begin() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status: ScanStatus::Running.as_str().to_string(),
            started_at: Utc::now().naive_utc(),
            finished_at: None,
            posts_scanned: 0,
            points_awarded: 0,
            accounts_created: 0,
            error: None,
        }
    }

    pub fn status(&self) -> ScanStatus {
        ScanStatus::parse(&self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ScanStatus::Running => "running",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        }
    }

    /// Unknown strings collapse to `Failed` rather than round-tripping an
    /// error; the column is only ever written from `as_str`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "running" => ScanStatus::Running,
            "completed" => ScanStatus::Completed,
            _ => ScanStatus::Failed,
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counters a finished run persists and reports to the operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanTally {
    pub scanned: u64,
    pub awarded_posts: u64,
    pub points_awarded: i64,
    pub accounts_created: u64,
    pub keyword_bonuses: u64,
    pub skipped: u64,
    pub exhausted: u64,
    pub duplicates: u64,
    pub failed: u64,
}
