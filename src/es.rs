//! Search-index boundary: document mapping, backend trait, HTTP client and
//! the batched writer.

use crate::normalize::NormalizedDocument;
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::cell::Cell;
use std::time::Duration;

/// Canonical index for normalized Reddit crypto documents.
pub const REDDIT_CRYPTO_INDEX: &str = "reddit-crypto";

/// Field mapping for the canonical document shape. Keyword fields are not
/// analyzed at indexing time; only `full_text` gets an inverted index.
pub fn reddit_crypto_mapping() -> Value {
    json!({
        "properties": {
            "id": { "type": "keyword" },
            "subreddit": { "type": "keyword" },
            "create_datetime": { "type": "date" },
            "author": { "type": "keyword" },
            "full_text": { "type": "text" },
            "type": { "type": "keyword" },
            "parent_id": { "type": "keyword" },
        }
    })
}

/// Default shard/replica settings applied when an index is created.
pub fn default_index_settings() -> Value {
    json!({ "number_of_shards": 5, "number_of_replicas": 1 })
}

/// Per-batch insertion outcome. Individual document failures within a batch
/// do not abort the remaining documents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub indexed: usize,
    pub failed: usize,
}

/// Storage/indexing service boundary. The HTTP client implements it for a
/// real cluster; tests use recording doubles.
pub trait SearchBackend {
    fn index_exists(&self, index: &str) -> Result<bool>;
    fn create_index(&self, index: &str, body: &Value) -> Result<()>;
    fn bulk_insert(&self, index: &str, docs: &[Value]) -> Result<BulkReport>;
}

/// Elasticsearch-compatible client over blocking HTTP.
pub struct EsClient {
    http: reqwest::blocking::Client,
    base: String,
}

impl EsClient {
    pub fn new(base: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("building search-index HTTP client")?;
        Ok(Self { http, base: base.into().trim_end_matches('/').to_string() })
    }
}

impl SearchBackend for EsClient {
    fn index_exists(&self, index: &str) -> Result<bool> {
        let resp = self
            .http
            .head(format!("{}/{index}", self.base))
            .send()
            .with_context(|| format!("existence check for index {index}"))?;
        match resp.status().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            code => anyhow::bail!("unexpected status {code} checking index {index}"),
        }
    }

    fn create_index(&self, index: &str, body: &Value) -> Result<()> {
        self.http
            .put(format!("{}/{index}", self.base))
            .json(body)
            .send()
            .with_context(|| format!("create request for index {index}"))?
            .error_for_status()
            .with_context(|| format!("creating index {index}"))?;
        Ok(())
    }

    fn bulk_insert(&self, index: &str, docs: &[Value]) -> Result<BulkReport> {
        // NDJSON action/source pairs; IDs are left to the index to generate.
        let mut payload = String::new();
        let action = json!({ "index": { "_index": index } }).to_string();
        for doc in docs {
            payload.push_str(&action);
            payload.push('\n');
            payload.push_str(&doc.to_string());
            payload.push('\n');
        }
        let resp: Value = self
            .http
            .post(format!("{}/_bulk", self.base))
            .header("content-type", "application/x-ndjson")
            .body(payload)
            .send()
            .context("bulk insert request")?
            .error_for_status()
            .context("bulk insert")?
            .json()
            .context("decoding bulk response")?;
        let mut report = BulkReport { indexed: docs.len(), failed: 0 };
        if resp.get("errors").and_then(Value::as_bool).unwrap_or(false) {
            let failed = resp
                .get("items")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|it| it.get("index"))
                        .filter(|ix| ix.get("error").is_some())
                        .count()
                })
                .unwrap_or(0);
            report.failed = failed;
            report.indexed = docs.len().saturating_sub(failed);
        }
        Ok(report)
    }
}

/// Ensures the destination index exists and performs batched inserts with
/// index-generated IDs. The existence check result is cached so repeated
/// ensure calls stay cheap; creation reaches the backend at most once.
pub struct IndexWriter<'a> {
    backend: &'a dyn SearchBackend,
    index: String,
    mapping: Value,
    ensured: Cell<bool>,
}

impl<'a> IndexWriter<'a> {
    pub fn new(backend: &'a dyn SearchBackend, index: impl Into<String>, mapping: Value) -> Self {
        Self { backend, index: index.into(), mapping, ensured: Cell::new(false) }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Idempotent: a no-op when the index already exists, otherwise creates
    /// it with the mapping and default shard/replica settings.
    pub fn ensure_index(&self) -> Result<()> {
        if self.ensured.get() {
            return Ok(());
        }
        if !self.backend.index_exists(&self.index)? {
            tracing::info!("index {} not yet created, creating it", self.index);
            let body = json!({
                "settings": default_index_settings(),
                "mappings": self.mapping,
            });
            self.backend.create_index(&self.index, &body)?;
        }
        self.ensured.set(true);
        Ok(())
    }

    /// Insert one normalized batch; IDs are auto-generated by the index, so
    /// re-ingesting a chunk duplicates rather than overwrites.
    pub fn insert_batch(&self, docs: &[NormalizedDocument]) -> Result<BulkReport> {
        self.ensure_index()?;
        if docs.is_empty() {
            return Ok(BulkReport::default());
        }
        let values: Vec<Value> = docs
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()
            .context("serializing batch for bulk insert")?;
        let report = self.backend.bulk_insert(&self.index, &values)?;
        if report.failed > 0 {
            tracing::warn!(
                "bulk insert into {}: {} indexed, {} failed",
                self.index,
                report.indexed,
                report.failed
            );
        }
        Ok(report)
    }
}
