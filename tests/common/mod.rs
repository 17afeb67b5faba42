use anyhow::{bail, Result};
use serde_json::{json, Value};
use std::sync::Mutex;
use ucry_etl::{ArchiveSource, BulkReport, ContentKind, SearchBackend};

/// Canned archive source. Returns fixed record lists per content kind, can be
/// told to fail either kind, and counts calls so resume tests can assert that
/// no fetch happened.
#[derive(Default)]
pub struct StubArchive {
    pub comments: Vec<Value>,
    pub submissions: Vec<Value>,
    pub fail_comments: bool,
    pub fail_submissions: bool,
    pub calls: Mutex<usize>,
}

impl StubArchive {
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl ArchiveSource for StubArchive {
    fn search(
        &self,
        kind: ContentKind,
        _subreddit: &str,
        _after: i64,
        _before: i64,
        limit: usize,
    ) -> Result<Vec<Value>> {
        *self.calls.lock().unwrap() += 1;
        let (records, fail) = match kind {
            ContentKind::Comment => (&self.comments, self.fail_comments),
            ContentKind::Submission => (&self.submissions, self.fail_submissions),
        };
        if fail {
            bail!("connection reset mid-stream");
        }
        Ok(records.iter().take(limit).cloned().collect())
    }
}

/// Recording search backend: remembers every created index and every bulk
/// document, and can simulate per-document bulk failures.
#[derive(Default)]
pub struct RecordingBackend {
    pub created: Mutex<Vec<String>>,
    pub docs: Mutex<Vec<Value>>,
    pub fail_per_batch: usize,
}

impl RecordingBackend {
    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }
    pub fn doc_count(&self) -> usize {
        self.docs.lock().unwrap().len()
    }
    pub fn docs_of_type(&self, kind: &str) -> usize {
        self.docs.lock().unwrap().iter().filter(|d| d["type"] == kind).count()
    }
}

impl SearchBackend for RecordingBackend {
    fn index_exists(&self, index: &str) -> Result<bool> {
        Ok(self.created.lock().unwrap().iter().any(|c| c == index))
    }

    fn create_index(&self, index: &str, _body: &Value) -> Result<()> {
        self.created.lock().unwrap().push(index.to_string());
        Ok(())
    }

    fn bulk_insert(&self, _index: &str, docs: &[Value]) -> Result<BulkReport> {
        self.docs.lock().unwrap().extend(docs.iter().cloned());
        let failed = self.fail_per_batch.min(docs.len());
        Ok(BulkReport { indexed: docs.len() - failed, failed })
    }
}

/// Pushshift-shaped submission record inside the 2021-01-01 test week.
pub fn sample_submission(id: &str, offset_secs: i64) -> Value {
    json!({
        "id": id,
        "subreddit": "testsr",
        "created_utc": 1_609_459_200 + offset_secs,
        "author": "alice",
        "title": format!("title {id}"),
        "selftext": "some body text",
        "url": format!("https://reddit.com/{id}")
    })
}

/// Pushshift-shaped comment record inside the 2021-01-01 test week.
pub fn sample_comment(id: &str, offset_secs: i64) -> Value {
    json!({
        "id": id,
        "subreddit": "testsr",
        "created_utc": 1_609_459_200 + offset_secs,
        "author": "bob",
        "body": format!("comment {id}"),
        "parent_id": "t3_s1"
    })
}
