use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use ucry_etl::{
    init_tracing_once, parse_date, CheckpointStore, EsClient, Granularity, IngestOptions,
    IngestPipeline, PushshiftClient, SourceSchema, CRYPTO_SUBREDDITS, DEFAULT_ARCHIVE_URL,
    DEFAULT_ES_URL, DEFAULT_FETCH_LIMIT, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_SAVE_DIR,
    REDDIT_CRYPTO_INDEX,
};

/// Build the crypto uncertainty index's raw data layer: pull historical
/// subreddit submissions and comments and load them into the search index.
#[derive(Parser)]
#[command(name = "ucry-etl", version, about)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract a date range of subreddit data, checkpointing each chunk
    /// before it is indexed.
    Ingest {
        /// Subreddits to pull; defaults to the crypto set when omitted.
        #[arg(long, value_delimiter = ',')]
        subreddits: Vec<String>,
        /// Inclusive start date, YYYY-MM-DD.
        #[arg(long)]
        start: String,
        /// Exclusive end date, YYYY-MM-DD.
        #[arg(long)]
        end: String,
        /// Chunk granularity: day, week, month or year.
        #[arg(long, default_value = "month")]
        granularity: String,
        /// Per-kind result cap per chunk.
        #[arg(long, default_value_t = DEFAULT_FETCH_LIMIT)]
        limit: usize,
        /// Checkpoint root directory.
        #[arg(long, default_value = DEFAULT_SAVE_DIR)]
        save_dir: PathBuf,
        /// Destination index name.
        #[arg(long, default_value = REDDIT_CRYPTO_INDEX)]
        index: String,
        /// Search-index endpoint.
        #[arg(long, default_value = DEFAULT_ES_URL)]
        es_url: String,
        /// Archive API endpoint.
        #[arg(long, default_value = DEFAULT_ARCHIVE_URL)]
        archive_url: String,
        /// Wire schema of the scraper backend: pushshift or gateway.
        #[arg(long, default_value = "pushshift")]
        backend: String,
        /// Write a checkpoint after every chunk.
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        mem_safe: bool,
        /// Skip chunks that already have a checkpoint.
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        safe_exit: bool,
        /// Disable progress bars.
        #[arg(long)]
        no_progress: bool,
    },
    /// List existing checkpoints under a save directory.
    Status {
        #[arg(long, default_value = DEFAULT_SAVE_DIR)]
        save_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing_once();
    match Cli::parse().cmd {
        Command::Ingest {
            subreddits,
            start,
            end,
            granularity,
            limit,
            save_dir,
            index,
            es_url,
            archive_url,
            backend,
            mem_safe,
            safe_exit,
            no_progress,
        } => {
            let subs: Vec<String> = if subreddits.is_empty() {
                CRYPTO_SUBREDDITS.iter().map(|s| s.to_string()).collect()
            } else {
                subreddits
            };
            let opts = IngestOptions::new(parse_date(&start)?, parse_date(&end)?)
                .with_subreddits(subs)
                .with_granularity(granularity.parse::<Granularity>()?)
                .with_limit(limit)
                .with_save_dir(save_dir)
                .with_index(index)
                .with_schema(backend.parse::<SourceSchema>()?)
                .with_mem_safe(mem_safe)
                .with_safe_exit(safe_exit)
                .with_progress(!no_progress);

            let archive = PushshiftClient::new(archive_url, DEFAULT_HTTP_TIMEOUT_SECS)?;
            let search = EsClient::new(es_url, DEFAULT_HTTP_TIMEOUT_SECS)?;
            let summary = IngestPipeline::new(opts).run(&archive, &search)?;
            println!("{}", summary.render());
        }
        Command::Status { save_dir } => {
            let store = CheckpointStore::new(&save_dir);
            let found = store.list();
            for path in &found {
                let rel = path.strip_prefix(store.root()).unwrap_or(path);
                println!("{}", rel.display());
            }
            println!("{} checkpoint(s) under {}", found.len(), save_dir.display());
        }
    }
    Ok(())
}
