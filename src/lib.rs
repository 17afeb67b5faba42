mod checkpoint;
mod chunk;
mod config;
mod error;
mod es;
mod fetch;
mod mem;
mod ndjson;
mod normalize;
mod pipeline;
mod progress;
mod schema;
mod summary;
mod util;

pub use crate::checkpoint::{CheckpointBatch, CheckpointStore};
pub use crate::chunk::{fmt_date, parse_date, plan_chunks, DateChunk, Granularity};
pub use crate::config::{
    IngestOptions, CRYPTO_SUBREDDITS, DEFAULT_ARCHIVE_URL, DEFAULT_ES_URL, DEFAULT_FETCH_LIMIT,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_SAVE_DIR,
};
pub use crate::error::PipelineError;
pub use crate::es::{
    default_index_settings, reddit_crypto_mapping, BulkReport, EsClient, IndexWriter,
    SearchBackend, REDDIT_CRYPTO_INDEX,
};
pub use crate::fetch::{ArchiveSource, FetchResult, FetchStatus, Fetcher, PushshiftClient};
pub use crate::normalize::{normalize, DocKind, NormalizedDocument};
pub use crate::pipeline::IngestPipeline;
pub use crate::schema::{ContentKind, RawComment, RawRecord, RawSubmission, SourceSchema};
pub use crate::summary::{ChunkCell, ChunkOutcome, RunSummary};

// Expose memory and tracing helpers for the binary.
pub use crate::mem::{available_memory_fraction, is_low_memory};
pub use crate::util::init_tracing_once;
