use core::fmt;

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Normalized account handle. Lower-cased, leading `@` stripped, surrounding
/// whitespace dropped. All storage keys and comparisons go through this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct Handle(String);

impl Handle {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().trim_start_matches('@').to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Handle {
    fn from(value: &str) -> Self {
        Handle::new(value)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Handle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Handle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Handle::new(&raw))
    }
}

/// Set of handles stored as one comma-joined text column. Parsing happens
/// only at the storage edge; everything above works with the typed set.
/// Incremental membership updates in Postgres go through the conditional
/// append expression in the account repository, never read-modify-write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandleSet(Vec<Handle>);

impl HandleSet {
    pub fn from_column(column: &str) -> Self {
        Self(
            column
                .split(',')
                .filter(|part| !part.is_empty())
                .map(Handle::new)
                .collect(),
        )
    }

    pub fn to_column(&self) -> String {
        self.0
            .iter()
            .map(Handle::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn contains(&self, handle: &Handle) -> bool {
        self.0.contains(handle)
    }

    /// Appends only if absent; mirrors the SQL append expression.
    pub fn insert(&mut self, handle: Handle) -> bool {
        if self.contains(&handle) {
            return false;
        }
        self.0.push(handle);
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Rolling windows the aggregator maintains cached sums and endorser sets for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollingWindow {
    Day,
    Week,
    Month,
    Quarter,
}

impl RollingWindow {
    pub const ALL: [RollingWindow; 4] = [
        RollingWindow::Day,
        RollingWindow::Week,
        RollingWindow::Month,
        RollingWindow::Quarter,
    ];

    pub fn days(self) -> i64 {
        match self {
            RollingWindow::Day => 1,
            RollingWindow::Week => 7,
            RollingWindow::Month => 30,
            RollingWindow::Quarter => 90,
        }
    }
}

/// Which of the four windows an entry's post timestamp falls into, evaluated
/// against a caller-supplied `now` so the placement is deterministic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowMask([bool; 4]);

impl WindowMask {
    pub fn at(post_ts: NaiveDateTime, now: NaiveDateTime) -> Self {
        let mut mask = [false; 4];
        for (slot, window) in mask.iter_mut().zip(RollingWindow::ALL) {
            *slot = post_ts >= now - TimeDelta::days(window.days());
        }
        Self(mask)
    }

    pub fn get(self, window: RollingWindow) -> bool {
        match window {
            RollingWindow::Day => self.0[0],
            RollingWindow::Week => self.0[1],
            RollingWindow::Month => self.0[2],
            RollingWindow::Quarter => self.0[3],
        }
    }

    pub fn any(self) -> bool {
        self.0.iter().any(|b| *b)
    }
}

/// Base account table model. Endorser columns stay raw here; use
/// [`Account::endorsers`] for the typed view.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub handle: Handle,
    pub external_id: Option<i64>,
    pub followers: i64,
    pub total: i64,
    pub multiplier: i64,
    pub quota: i64,
    pub points_1d: i64,
    pub points_7d: i64,
    pub points_30d: i64,
    pub points_90d: i64,
    pub endorsers_1d: String,
    pub endorsers_7d: String,
    pub endorsers_30d: String,
    pub endorsers_90d: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Account {
    pub fn is_influencer(&self) -> bool {
        self.multiplier > 1
    }

    pub fn window_points(&self, window: RollingWindow) -> i64 {
        match window {
            RollingWindow::Day => self.points_1d,
            RollingWindow::Week => self.points_7d,
            RollingWindow::Month => self.points_30d,
            RollingWindow::Quarter => self.points_90d,
        }
    }

    pub fn endorsers(&self, window: RollingWindow) -> HandleSet {
        let column = match window {
            RollingWindow::Day => &self.endorsers_1d,
            RollingWindow::Week => &self.endorsers_7d,
            RollingWindow::Month => &self.endorsers_30d,
            RollingWindow::Quarter => &self.endorsers_90d,
        };
        HandleSet::from_column(column)
    }
}

/// Profile data stamped onto the author's row when it is first seen.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorStamp {
    pub external_id: Option<i64>,
    pub followers: i64,
}
