use std::sync::LazyLock;

use thiserror::Error;
use tokio::sync::OnceCell;

static ENV_VARS: LazyLock<OnceCell<Env>> = LazyLock::new(OnceCell::new);

pub async fn get_var(var: Var) -> EnvResult<&'static str> {
    let vars = ENV_VARS.get_or_try_init(|| async { Env::load() }).await?;
    Ok(match var {
        Var::DatabaseUrl => &vars.database_url,
        Var::FeedPath => &vars.feed_path,
    })
}

#[derive(Debug, Clone)]
pub struct Env {
    pub database_url: String,
    pub feed_path: String,
}

impl Env {
    pub fn load() -> EnvResult<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            feed_path: optional("FEED_PATH", "feed.jsonl"),
        })
    }
}

fn required(key: &'static str) -> EnvResult<String> {
    match dotenvy::var(key) {
        Ok(val) => Ok(val),
        Err(dotenvy::Error::EnvVar(_)) => Err(EnvError::Missing(key)),
        Err(e) => Err(e.into()),
    }
}

fn optional(key: &'static str, default: &str) -> String {
    dotenvy::var(key).unwrap_or_else(|_| default.to_string())
}

#[derive(Debug)]
pub enum Var {
    DatabaseUrl,
    FeedPath,
}

#[macro_export]
macro_rules! var {
    ($ev:expr) => {
        $crate::util::env::get_var($ev)
    };
}

pub type EnvResult<T> = core::result::Result<T, EnvError>;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error(transparent)]
    Dotenvy(#[from] dotenvy::Error),
}
