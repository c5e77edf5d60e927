pub mod constants;
pub mod db;
pub mod engine;
pub mod util;

pub mod prelude {
    pub use crate::db::prelude::*;
    pub use crate::engine::aggregator::ReputationAggregator;
    pub use crate::engine::keyword::{KeywordAward, KeywordBonus};
    pub use crate::engine::post::{Engagement, JsonlFeed, Mention, Post, PostSource};
    pub use crate::engine::resolver::{MentionResolver, Resolution, SkipReason};
    pub use crate::engine::scan::{
        PostOutcome, ScanError, ScanOrchestrator, ScanReport, ScanResult, ScanWindow,
    };
}
