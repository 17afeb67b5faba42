//! Durable per-(subreddit, chunk) checkpoints.
//!
//! One artifact per unit of work at
//! `<root>/<subreddit>/<subreddit>_<start>_<end>.ndjson.zst`, written to a
//! temp file and atomically renamed. Checkpoints are write-once snapshots:
//! overwriting the same key replaces the artifact, it never merges. Existence
//! of a checkpoint is what lets a re-run skip the expensive fetch.

use crate::chunk::DateChunk;
use crate::ndjson::{ZstdNdjsonReader, ZstdNdjsonWriter};
use crate::normalize::NormalizedDocument;
use crate::summary::ChunkOutcome;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const EXT: &str = "ndjson.zst";

/// First line of every artifact. Documents alone cannot say whether the
/// chunk's fetches all completed, so the outcome rides along and a resumed
/// chunk keeps its original summary tag.
#[derive(Serialize, Deserialize)]
struct CheckpointMeta {
    outcome: ChunkOutcome,
}

/// A loaded checkpoint: the chunk's documents plus the outcome recorded when
/// they were fetched.
#[derive(Debug)]
pub struct CheckpointBatch {
    pub docs: Vec<NormalizedDocument>,
    pub outcome: ChunkOutcome,
}

pub struct CheckpointStore {
    root: PathBuf,
}

impl CheckpointStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical artifact path for a (subreddit, chunk) key.
    pub fn path_for(&self, subreddit: &str, chunk: &DateChunk) -> PathBuf {
        self.root
            .join(subreddit)
            .join(format!("{subreddit}_{}.{EXT}", chunk.label()))
    }

    pub fn exists(&self, subreddit: &str, chunk: &DateChunk) -> bool {
        self.path_for(subreddit, chunk).is_file()
    }

    /// Persist the documents and outcome for one unit of work; returns the
    /// artifact path. An empty batch still produces an (empty) checkpoint, so
    /// "no activity" is recorded and not re-fetched on resume.
    pub fn save(
        &self,
        subreddit: &str,
        chunk: &DateChunk,
        docs: &[NormalizedDocument],
        outcome: ChunkOutcome,
    ) -> Result<PathBuf> {
        let dest = self.path_for(subreddit, chunk);
        let dir = dest.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        let tmp = dest.with_extension("tmp");
        let mut w = ZstdNdjsonWriter::create(&tmp)?;
        let meta = serde_json::to_string(&CheckpointMeta { outcome })
            .context("serializing checkpoint header")?;
        w.write_line(&meta)?;
        for doc in docs {
            let line = serde_json::to_string(doc).context("serializing checkpoint document")?;
            w.write_line(&line)?;
        }
        w.finish_atomic(&dest)?;
        tracing::debug!("checkpointed {} docs to {}", docs.len(), dest.display());
        Ok(dest)
    }

    /// Load a previously saved checkpoint; `None` when the key has none.
    pub fn load(&self, subreddit: &str, chunk: &DateChunk) -> Result<Option<CheckpointBatch>> {
        let path = self.path_for(subreddit, chunk);
        if !path.is_file() {
            return Ok(None);
        }
        let mut rdr = ZstdNdjsonReader::open(&path)?;
        let mut docs = Vec::new();
        let mut line = String::new();
        let mut outcome = ChunkOutcome::Complete;
        let mut first = true;
        while rdr.read_line(&mut line)? {
            if first {
                first = false;
                // Artifacts from before the header line start directly with a
                // document; those load as complete.
                if let Ok(meta) = serde_json::from_str::<CheckpointMeta>(&line) {
                    outcome = meta.outcome;
                    continue;
                }
            }
            let doc: NormalizedDocument = serde_json::from_str(&line)
                .with_context(|| format!("corrupt checkpoint line in {}", path.display()))?;
            docs.push(doc);
        }
        Ok(Some(CheckpointBatch { docs, outcome }))
    }

    /// All checkpoint artifacts under the store root, sorted for stable output.
    pub fn list(&self) -> Vec<PathBuf> {
        if !self.root.exists() {
            return Vec::new();
        }
        let mut found: Vec<PathBuf> = WalkDir::new(&self.root)
            .min_depth(2)
            .max_depth(2)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.to_string_lossy().ends_with(EXT))
            .collect();
        found.sort();
        found
    }
}
