//! Wire-schema adapters for the two scraper backends.
//!
//! Both backends return loosely-shaped JSON; each adapter maps its field
//! names into the same tagged [`RawRecord`] at deserialization time, so the
//! rest of the pipeline never probes attributes to discover a record's kind.

use crate::error::PipelineError;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The content kind requested from the archive API. Determines which
/// `RawRecord` variant an adapter produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    Comment,
    Submission,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Comment => "comment",
            Self::Submission => "submission",
        })
    }
}

/// A submission as fetched, before normalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawSubmission {
    pub id: String,
    pub subreddit: String,
    pub created_utc: i64,
    pub author: Option<String>,
    pub title: String,
    pub selftext: Option<String>,
    pub url: Option<String>,
}

/// A comment as fetched, before normalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawComment {
    pub id: String,
    pub subreddit: String,
    pub created_utc: i64,
    pub author: Option<String>,
    pub body: String,
    pub parent_id: Option<String>,
}

/// Union of the two source shapes. Every record belongs to exactly one
/// subreddit and carries a single creation timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawRecord {
    Submission(RawSubmission),
    Comment(RawComment),
}

impl RawRecord {
    pub fn id(&self) -> &str {
        match self {
            Self::Submission(s) => &s.id,
            Self::Comment(c) => &c.id,
        }
    }
    pub fn subreddit(&self) -> &str {
        match self {
            Self::Submission(s) => &s.subreddit,
            Self::Comment(c) => &c.subreddit,
        }
    }
    pub fn created_utc(&self) -> i64 {
        match self {
            Self::Submission(s) => s.created_utc,
            Self::Comment(c) => c.created_utc,
        }
    }
}

/// Which backend wire schema to decode. `Pushshift` is the archive API shape
/// (`created_utc`, `parent_id`); `Gateway` is the live-scraper shape
/// (`created`, `parentId`, `link`). Selected by configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceSchema {
    Pushshift,
    Gateway,
}

impl FromStr for SourceSchema {
    type Err = PipelineError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pushshift" => Ok(Self::Pushshift),
            "gateway" => Ok(Self::Gateway),
            other => Err(PipelineError::config(format!(
                "unknown source schema `{other}` (expected pushshift or gateway)"
            ))),
        }
    }
}

impl SourceSchema {
    /// Decode one wire record of the given kind into a tagged `RawRecord`.
    /// A missing required field is a `MalformedRecord` naming that field.
    pub fn parse(&self, kind: ContentKind, v: &Value) -> Result<RawRecord, PipelineError> {
        let (created_field, parent_field, url_field) = match self {
            Self::Pushshift => ("created_utc", "parent_id", "url"),
            Self::Gateway => ("created", "parentId", "link"),
        };
        let id = req_str(v, "id")?;
        let subreddit = req_str(v, "subreddit")?;
        let created_utc = req_i64(v, created_field)?;
        let author = opt_str(v, "author");
        match kind {
            ContentKind::Submission => Ok(RawRecord::Submission(RawSubmission {
                id,
                subreddit,
                created_utc,
                author,
                title: req_str(v, "title")?,
                selftext: opt_str(v, "selftext"),
                url: opt_str(v, url_field),
            })),
            ContentKind::Comment => Ok(RawRecord::Comment(RawComment {
                id,
                subreddit,
                created_utc,
                author,
                body: req_str(v, "body")?,
                parent_id: opt_str(v, parent_field),
            })),
        }
    }
}

fn req_str(v: &Value, field: &'static str) -> Result<String, PipelineError> {
    v.get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(PipelineError::MalformedRecord { field })
}

fn req_i64(v: &Value, field: &'static str) -> Result<i64, PipelineError> {
    v.get(field)
        .and_then(Value::as_i64)
        .ok_or(PipelineError::MalformedRecord { field })
}

fn opt_str(v: &Value, field: &str) -> Option<String> {
    v.get(field).and_then(Value::as_str).map(str::to_owned)
}
