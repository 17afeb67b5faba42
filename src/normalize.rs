//! Canonical document model and the pure raw→normalized mapping.

use crate::schema::RawRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Which raw variant produced a document. Serialized lowercase to match the
/// index mapping's `type` keyword field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    Submission,
    Comment,
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Submission => "submission",
            Self::Comment => "comment",
        })
    }
}

/// The one shape every record takes before checkpointing and indexing.
/// `full_text` is never null (empty string allowed); `kind` is fully
/// determined by the raw variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    pub id: String,
    pub subreddit: String,
    #[serde(with = "es_datetime")]
    pub create_datetime: PrimitiveDateTime,
    pub author: Option<String>,
    pub full_text: String,
    #[serde(rename = "type")]
    pub kind: DocKind,
    pub parent_id: Option<String>,
}

/// Map a raw record into the canonical shape. Pure and total: every
/// well-formed variant normalizes without error (malformed input is rejected
/// earlier, at adapter-deserialization time).
pub fn normalize(raw: RawRecord) -> NormalizedDocument {
    match raw {
        RawRecord::Submission(s) => NormalizedDocument {
            create_datetime: epoch_to_datetime(s.created_utc),
            full_text: format!("{} {}", s.title, s.selftext.unwrap_or_default()),
            id: s.id,
            subreddit: s.subreddit,
            author: s.author,
            kind: DocKind::Submission,
            parent_id: None,
        },
        RawRecord::Comment(c) => NormalizedDocument {
            create_datetime: epoch_to_datetime(c.created_utc),
            full_text: c.body,
            id: c.id,
            subreddit: c.subreddit,
            author: c.author,
            kind: DocKind::Comment,
            parent_id: c.parent_id,
        },
    }
}

/// Epoch seconds → UTC-naive calendar datetime. No timezone conversion beyond
/// epoch → calendar; out-of-range inputs clamp to the epoch.
pub fn epoch_to_datetime(secs: i64) -> PrimitiveDateTime {
    let odt = OffsetDateTime::from_unix_timestamp(secs).unwrap_or(OffsetDateTime::UNIX_EPOCH);
    PrimitiveDateTime::new(odt.date(), odt.time())
}

/// Serde adapter for the index's `YYYY-MM-DDTHH:MM:SS` date format.
pub mod es_datetime {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::macros::format_description;
    use time::PrimitiveDateTime;

    const FORMAT: &[time::format_description::FormatItem<'static>] =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

    pub fn serialize<S: Serializer>(dt: &PrimitiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        let out = dt.format(FORMAT).map_err(serde::ser::Error::custom)?;
        s.serialize_str(&out)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<PrimitiveDateTime, D::Error> {
        let s = String::deserialize(d)?;
        PrimitiveDateTime::parse(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}
