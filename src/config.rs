use crate::chunk::Granularity;
use crate::schema::SourceSchema;
use std::path::{Path, PathBuf};
use time::Date;

/// Subreddits covered by the uncertainty index when none are given.
pub const CRYPTO_SUBREDDITS: &[&str] = &[
    // Ethereum
    "ethereum",
    "ethtrader",
    "EtherMining",
    // Bitcoin
    "Bitcoin",
    "BitcoinMarkets",
    "btc",
    // Others
    "CryptoCurrency",
    "CryptoCurrencyTrading",
];

pub const DEFAULT_ES_URL: &str = "http://localhost:9200";
pub const DEFAULT_ARCHIVE_URL: &str = "https://api.pushshift.io";
pub const DEFAULT_SAVE_DIR: &str = "data/reddit";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 180;

/// Effectively unbounded per-chunk cap; chunks bound the work, not the limit.
pub const DEFAULT_FETCH_LIMIT: usize = 9_999_999;

/// Forced-checkpoint threshold when `mem_safe` is off (fraction of RAM free).
pub const LOW_MEMORY_FRACTION: f64 = 0.10;

/// User-facing ingestion options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct IngestOptions {
    pub subreddits: Vec<String>,
    pub start: Date,              // inclusive
    pub end: Date,                // exclusive
    pub granularity: Granularity,
    pub limit: usize,             // per-kind cap per chunk
    pub save_dir: PathBuf,        // checkpoint root
    pub index: String,
    pub schema: SourceSchema,
    pub mem_safe: bool,           // periodic checkpointing on/off
    pub safe_exit: bool,          // resume-from-checkpoint on/off
    pub progress: bool,
}

impl IngestOptions {
    pub fn new(start: Date, end: Date) -> Self {
        Self {
            subreddits: Vec::new(),
            start,
            end,
            granularity: Granularity::Month,
            limit: DEFAULT_FETCH_LIMIT,
            save_dir: PathBuf::from(DEFAULT_SAVE_DIR),
            index: crate::es::REDDIT_CRYPTO_INDEX.to_string(),
            schema: SourceSchema::Pushshift,
            mem_safe: true,
            safe_exit: true,
            progress: true,
        }
    }

    pub fn with_subreddits<I, S>(mut self, subs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.subreddits = subs.into_iter().map(|s| normalize_subreddit(s.as_ref())).collect();
        self
    }
    pub fn with_granularity(mut self, g: Granularity) -> Self {
        self.granularity = g;
        self
    }
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }
    pub fn with_save_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.save_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }
    pub fn with_schema(mut self, schema: SourceSchema) -> Self {
        self.schema = schema;
        self
    }
    pub fn with_mem_safe(mut self, yes: bool) -> Self {
        self.mem_safe = yes;
        self
    }
    pub fn with_safe_exit(mut self, yes: bool) -> Self {
        self.safe_exit = yes;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
}

/// Trim and strip an optional leading "r/".
fn normalize_subreddit(s: &str) -> String {
    let s = s.trim();
    s.strip_prefix("r/").unwrap_or(s).to_string()
}
