//! Top-level ingestion control loop: for each subreddit, for each date chunk,
//! fetch → normalize → checkpoint → index, then render a run summary.
//!
//! Fault isolation lives at chunk granularity. A dropped fetch or a search
//! outage taints one cell of the summary and nothing else; only planning-time
//! configuration problems abort a run.

use crate::checkpoint::CheckpointStore;
use crate::chunk::{plan_chunks, DateChunk};
use crate::config::{IngestOptions, LOW_MEMORY_FRACTION};
use crate::error::PipelineError;
use crate::es::{reddit_crypto_mapping, IndexWriter, SearchBackend};
use crate::fetch::{ArchiveSource, FetchStatus, Fetcher};
use crate::mem::is_low_memory;
use crate::normalize::{normalize, NormalizedDocument};
use crate::progress::make_count_progress;
use crate::schema::ContentKind;
use crate::summary::{ChunkCell, ChunkOutcome, RunSummary};
use crate::util::init_tracing_once;
use anyhow::Result;
use std::time::Instant;

pub struct IngestPipeline {
    opts: IngestOptions,
}

impl IngestPipeline {
    pub fn new(opts: IngestOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &IngestOptions {
        &self.opts
    }

    /// Run the full extraction and ingestion for the configured subreddits
    /// and date range. Both collaborators are injected so tests can stand in
    /// doubles for the archive and the index service.
    pub fn run(
        &self,
        archive: &dyn ArchiveSource,
        search: &dyn SearchBackend,
    ) -> Result<RunSummary> {
        init_tracing_once();
        let started = Instant::now();

        // PLANNING: fatal checks happen here, before any I/O. The chunk
        // sequence is computed once and shared by every subreddit so the
        // summary columns line up.
        if self.opts.subreddits.is_empty() {
            return Err(PipelineError::config("subreddit list is empty").into());
        }
        let chunks = plan_chunks(self.opts.start, self.opts.end, self.opts.granularity)?;
        tracing::info!(
            "planned {} {} chunk(s) for {} subreddit(s)",
            chunks.len(),
            self.opts.granularity,
            self.opts.subreddits.len()
        );

        let store = CheckpointStore::new(&self.opts.save_dir);
        let writer = IndexWriter::new(search, self.opts.index.clone(), reddit_crypto_mapping());
        let fetcher = Fetcher::new(archive, self.opts.schema);

        let mut summary = RunSummary::new(chunks.clone());
        for sub in &self.opts.subreddits {
            tracing::info!("extracting r/{sub}");
            let pb = self
                .opts
                .progress
                .then(|| make_count_progress(chunks.len() as u64, &format!("r/{sub}")));
            let mut cells = Vec::with_capacity(chunks.len());
            for chunk in &chunks {
                cells.push(self.process_chunk(sub, chunk, &fetcher, &store, &writer));
                if let Some(pb) = &pb {
                    pb.inc(1);
                }
            }
            if let Some(pb) = pb {
                pb.finish_with_message(format!("r/{sub} done"));
            }
            summary.push_row(sub.clone(), cells);
        }

        tracing::info!(
            "run complete: {} documents across {} subreddits in {:.1?}",
            summary.total_docs(),
            self.opts.subreddits.len(),
            started.elapsed()
        );
        Ok(summary)
    }

    fn process_chunk(
        &self,
        sub: &str,
        chunk: &DateChunk,
        fetcher: &Fetcher<'_>,
        store: &CheckpointStore,
        writer: &IndexWriter<'_>,
    ) -> ChunkCell {
        // Resume: an existing checkpoint replaces the fetch entirely. The
        // batch is still handed to the index (duplicates are tolerated; IDs
        // are index-generated), so a run that died between checkpoint and
        // index write completes here. The cell keeps the outcome recorded at
        // fetch time: a partially fetched chunk stays marked partial.
        if self.opts.safe_exit {
            match store.load(sub, chunk) {
                Ok(Some(batch)) => {
                    tracing::info!(
                        "resuming r/{sub} {chunk} from checkpoint ({} docs)",
                        batch.docs.len()
                    );
                    self.index_batch(writer, sub, chunk, &batch.docs);
                    return ChunkCell { count: batch.docs.len(), outcome: batch.outcome };
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("unreadable checkpoint for r/{sub} {chunk}, re-fetching: {e:#}")
                }
            }
        }

        // FETCHING: the two content kinds are independent network calls with
        // no shared state, so they run concurrently within the chunk.
        let (comments, submissions) = rayon::join(
            || fetcher.fetch(sub, chunk, ContentKind::Comment, self.opts.limit),
            || fetcher.fetch(sub, chunk, ContentKind::Submission, self.opts.limit),
        );
        let outcome = match (comments.status, submissions.status) {
            (FetchStatus::Complete, FetchStatus::Complete) => ChunkOutcome::Complete,
            (FetchStatus::Failed, FetchStatus::Failed) => ChunkOutcome::Failed,
            _ => ChunkOutcome::Partial,
        };

        // NORMALIZING
        let mut docs: Vec<NormalizedDocument> = Vec::with_capacity(
            comments.records.len() + submissions.records.len(),
        );
        docs.extend(comments.records.into_iter().map(normalize));
        docs.extend(submissions.records.into_iter().map(normalize));

        // CHECKPOINTING happens before indexing so an index outage never
        // loses fetched data. A fully failed chunk is left un-checkpointed on
        // purpose: the next resume run must retry it rather than skip it.
        if outcome == ChunkOutcome::Failed {
            tracing::warn!("both fetches dropped for r/{sub} {chunk}; chunk left for retry");
        } else if self.should_checkpoint() {
            if let Err(e) = store.save(sub, chunk, &docs, outcome) {
                tracing::error!("checkpoint write failed for r/{sub} {chunk}: {e:#}");
            }
        }

        // INDEXING
        self.index_batch(writer, sub, chunk, &docs);

        ChunkCell { count: docs.len(), outcome }
    }

    fn should_checkpoint(&self) -> bool {
        if self.opts.mem_safe {
            return true;
        }
        if is_low_memory(LOW_MEMORY_FRACTION) {
            tracing::warn!("low memory; forcing checkpoint despite mem_safe=false");
            return true;
        }
        false
    }

    fn index_batch(
        &self,
        writer: &IndexWriter<'_>,
        sub: &str,
        chunk: &DateChunk,
        docs: &[NormalizedDocument],
    ) {
        if docs.is_empty() {
            return;
        }
        match writer.insert_batch(docs) {
            Ok(report) => tracing::debug!(
                "indexed r/{sub} {chunk}: {} ok, {} failed",
                report.indexed,
                report.failed
            ),
            // Non-fatal: the chunk's documents remain in the checkpoint and
            // can be re-indexed on a later run.
            Err(e) => tracing::warn!("index write failed for r/{sub} {chunk}: {e:#}"),
        }
    }
}
