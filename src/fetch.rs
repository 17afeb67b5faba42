//! Archive fetches with per-content-kind fault isolation.
//!
//! The upstream archive is an explicit, injected dependency behind
//! [`ArchiveSource`]: the HTTP client below implements it for production and
//! tests substitute canned or failing sources. A transport failure for one
//! content kind is absorbed here — logged and tagged `Failed` — so the other
//! kind's fetch for the same chunk is unaffected.

use crate::chunk::DateChunk;
use crate::schema::{ContentKind, RawRecord, SourceSchema};
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

/// One logical time-bounded search against the upstream archive.
/// `after`/`before` are epoch-second bounds; `limit` caps result count.
/// Implementations handle their own pagination and request timeouts.
pub trait ArchiveSource: Sync {
    fn search(
        &self,
        kind: ContentKind,
        subreddit: &str,
        after: i64,
        before: i64,
        limit: usize,
    ) -> Result<Vec<Value>>;
}

/// Distinguishes "no activity" from "fetch abandoned": an empty `Complete`
/// result means the window genuinely had nothing, while `Failed` means the
/// records (possibly none) are a partial view after a transport failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchStatus {
    Complete,
    Failed,
}

/// Records for one (subreddit, chunk, kind) fetch plus its outcome tag.
#[derive(Debug)]
pub struct FetchResult {
    pub records: Vec<RawRecord>,
    pub status: FetchStatus,
}

impl FetchResult {
    fn failed() -> Self {
        Self { records: Vec::new(), status: FetchStatus::Failed }
    }
}

/// Decodes wire records through the configured schema adapter and converts
/// transport failures into `Failed` results instead of errors. No implicit
/// retry; retry policy belongs to the orchestrator.
pub struct Fetcher<'a> {
    source: &'a dyn ArchiveSource,
    schema: SourceSchema,
}

impl<'a> Fetcher<'a> {
    pub fn new(source: &'a dyn ArchiveSource, schema: SourceSchema) -> Self {
        Self { source, schema }
    }

    pub fn fetch(
        &self,
        subreddit: &str,
        chunk: &DateChunk,
        kind: ContentKind,
        limit: usize,
    ) -> FetchResult {
        let raw = match self.source.search(
            kind,
            subreddit,
            chunk.start_epoch(),
            chunk.end_epoch(),
            limit,
        ) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(
                    "archive fetch dropped ({kind}s, r/{subreddit}, {chunk}): {e:#}"
                );
                return FetchResult::failed();
            }
        };
        let mut records = Vec::with_capacity(raw.len());
        for v in &raw {
            match self.schema.parse(kind, v) {
                Ok(rec) => records.push(rec),
                // Skip-and-continue: one malformed record never aborts a chunk.
                Err(e) => tracing::warn!("skipping malformed {kind} in r/{subreddit}: {e}"),
            }
        }
        FetchResult { records, status: FetchStatus::Complete }
    }
}

/// Pushshift-style archive client over blocking HTTP.
pub struct PushshiftClient {
    http: reqwest::blocking::Client,
    base: String,
}

/// Pushshift caps a single request at 100 results.
const PAGE_SIZE: usize = 100;

impl PushshiftClient {
    pub fn new(base: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("building archive HTTP client")?;
        Ok(Self { http, base: base.into().trim_end_matches('/').to_string() })
    }

    fn endpoint(&self, kind: ContentKind) -> String {
        format!("{}/reddit/search/{kind}/", self.base)
    }
}

/// Pagination cursor for an ascending timestamp feed with an exclusive
/// `after` bound. Timestamps alone cannot paginate safely: second-resolution
/// bursts straddle page boundaries, so the cursor steps back one second and
/// the ids already collected at that second are kept to filter the overlap.
struct PageBoundary {
    ts: i64,
    ids: HashSet<String>,
}

impl PageBoundary {
    fn new() -> Self {
        Self { ts: i64::MIN, ids: HashSet::new() }
    }

    /// Append the unseen records of an ascending page to `out`, tracking the
    /// trailing-second id set. Returns how many records were new.
    fn absorb(&mut self, page: &[Value], out: &mut Vec<Value>) -> usize {
        let mut fresh = 0;
        for v in page {
            let ts = v.get("created_utc").and_then(Value::as_i64);
            let id = v.get("id").and_then(Value::as_str);
            if ts == Some(self.ts) && id.is_some_and(|id| self.ids.contains(id)) {
                continue;
            }
            if let Some(t) = ts {
                if t != self.ts {
                    self.ts = t;
                    self.ids.clear();
                }
                if let Some(id) = id {
                    self.ids.insert(id.to_string());
                }
            }
            out.push(v.clone());
            fresh += 1;
        }
        fresh
    }
}

impl ArchiveSource for PushshiftClient {
    fn search(
        &self,
        kind: ContentKind,
        subreddit: &str,
        after: i64,
        before: i64,
        limit: usize,
    ) -> Result<Vec<Value>> {
        let mut out: Vec<Value> = Vec::new();
        let mut boundary = PageBoundary::new();
        let mut cursor = after;
        while out.len() < limit {
            let size = PAGE_SIZE.min(limit - out.len());
            let resp = self
                .http
                .get(self.endpoint(kind))
                .query(&[
                    ("subreddit", subreddit),
                    ("after", &cursor.to_string()),
                    ("before", &before.to_string()),
                    ("size", &size.to_string()),
                    ("sort", "asc"),
                ])
                .send()
                .with_context(|| format!("{kind} search request for r/{subreddit}"))?
                .error_for_status()
                .with_context(|| format!("{kind} search for r/{subreddit}"))?;
            let body: Value = resp.json().context("decoding archive response body")?;
            let page = body
                .get("data")
                .and_then(Value::as_array)
                .ok_or_else(|| anyhow!("archive response missing `data` array"))?;
            let got = page.len();
            if got == 0 {
                break;
            }
            let fresh = boundary.absorb(page, &mut out);
            if fresh == 0 {
                // A full page of already-seen records means a single second
                // holds more records than one page can carry.
                if got == size {
                    tracing::warn!(
                        "r/{subreddit} {kind}s at {} exceed one page in a single second; truncating",
                        boundary.ts
                    );
                }
                break;
            }
            if got < size {
                break;
            }
            if boundary.ts == i64::MIN {
                // No timestamps to paginate on.
                break;
            }
            // Step back one second: `after` is exclusive, so a cursor at the
            // trailing timestamp would skip its remaining same-second records.
            // The overlap this causes is removed by the boundary id set.
            cursor = boundary.ts - 1;
        }
        out.truncate(limit);
        Ok(out)
    }
}
