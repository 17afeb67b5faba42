use thiserror::Error;
use time::Date;

/// Typed failures for the ingestion core. Configuration and range errors are
/// fatal and raised before any I/O; malformed records are skippable at the
/// record level. Transient fetch failures never surface here — the fetcher
/// absorbs them into `FetchStatus::Failed`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid date range: start {start:?} must be strictly before end {end:?}")]
    InvalidRange { start: Date, end: Date },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("record is missing required field `{field}`")]
    MalformedRecord { field: &'static str },
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
