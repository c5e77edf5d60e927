use chrono::NaiveDate;

use super::account::Handle;

/// Per-(account, day) award budget. `total` is snapshotted from the
/// account's quota and multiplier when the row is first created, so
/// configuration changes only affect days not yet touched.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuotaRecord {
    pub handle: Handle,
    pub day: NaiveDate,
    pub total: i64,
    pub consumed: i64,
}

impl QuotaRecord {
    pub fn remaining(&self) -> i64 {
        self.total - self.consumed
    }
}
