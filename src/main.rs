use thiserror::Error;

use kudos_engine::prelude::*;
use kudos_engine::util::env::{EnvError, Var};
use kudos_engine::util::telemetry;
use kudos_engine::var;

#[derive(Debug, Error)]
enum RunnerError {
    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Db(#[from] PgError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Feed(#[from] kudos_engine::engine::post::FeedError),
}

type Result<T> = core::result::Result<T, RunnerError>;

/// One-shot scan runner: feeds a JSONL post dump through the engine and
/// reports the run outcome. The feed path comes from the first argument,
/// falling back to `FEED_PATH`.
#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    let feed_path = match std::env::args().nth(1) {
        Some(path) => path,
        None => var!(Var::FeedPath).await?.to_string(),
    };

    let mut feed = JsonlFeed::open(&feed_path)?;
    tracing::info!(feed_path, posts = feed.len(), "feed loaded");

    let pool = db_pool().await?;
    let stores = Stores::postgres(pool);

    let orchestrator = ScanOrchestrator::new(stores, ScanWindow::unbounded());
    let report = orchestrator.run(&mut feed).await?;

    tracing::info!(
        run_id = report.run_id,
        status = %report.status,
        scanned = report.tally.scanned,
        awarded_posts = report.tally.awarded_posts,
        keyword_bonuses = report.tally.keyword_bonuses,
        points = report.tally.points_awarded,
        new_accounts = report.tally.accounts_created,
        duplicates = report.tally.duplicates,
        exhausted = report.tally.exhausted,
        failed = report.tally.failed,
        "scan finished"
    );

    Ok(())
}
