#[path = "common/mod.rs"]
mod common;

use common::*;
use ucry_etl::{
    parse_date, plan_chunks, CheckpointStore, ChunkOutcome, ContentKind, FetchStatus, Fetcher,
    Granularity, IngestOptions, IngestPipeline, PipelineError, SourceSchema,
};

fn week_options(save_dir: &std::path::Path) -> IngestOptions {
    IngestOptions::new(parse_date("2021-01-01").unwrap(), parse_date("2021-01-08").unwrap())
        .with_subreddits(["testsr"])
        .with_granularity(Granularity::Week)
        .with_save_dir(save_dir)
        .with_progress(false)
}

/// One week, one chunk: 3 submissions + 2 comments end up as 5 normalized
/// documents in the checkpoint and 5 bulk actions at the backend.
#[test]
fn end_to_end_week_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let archive = StubArchive {
        submissions: vec![
            sample_submission("s1", 60),
            sample_submission("s2", 120),
            sample_submission("s3", 180),
        ],
        comments: vec![sample_comment("c1", 240), sample_comment("c2", 300)],
        ..Default::default()
    };
    let backend = RecordingBackend::default();

    let summary = IngestPipeline::new(week_options(dir.path()))
        .run(&archive, &backend)
        .unwrap();

    assert_eq!(summary.chunks.len(), 1);
    assert_eq!(summary.rows.len(), 1);
    let (sub, cells) = &summary.rows[0];
    assert_eq!(sub, "testsr");
    assert_eq!(cells[0].count, 5);
    assert_eq!(cells[0].outcome, ChunkOutcome::Complete);

    assert_eq!(backend.doc_count(), 5);
    assert_eq!(backend.docs_of_type("submission"), 3);
    assert_eq!(backend.docs_of_type("comment"), 2);
    assert_eq!(backend.created_count(), 1);

    let store = CheckpointStore::new(dir.path());
    let chunk = summary.chunks[0];
    let batch = store.load("testsr", &chunk).unwrap().unwrap();
    assert_eq!(batch.docs.len(), 5);
    assert_eq!(batch.outcome, ChunkOutcome::Complete);
}

/// A dropped comment fetch must not prevent submissions from being
/// checkpointed and indexed; the cell is tagged partial.
#[test]
fn comment_failure_does_not_block_submissions() {
    let dir = tempfile::tempdir().unwrap();
    let archive = StubArchive {
        submissions: vec![sample_submission("s1", 60)],
        fail_comments: true,
        ..Default::default()
    };
    let backend = RecordingBackend::default();

    let summary = IngestPipeline::new(week_options(dir.path()))
        .run(&archive, &backend)
        .unwrap();

    let cell = summary.rows[0].1[0];
    assert_eq!(cell.count, 1);
    assert_eq!(cell.outcome, ChunkOutcome::Partial);
    assert_eq!(backend.docs_of_type("submission"), 1);

    let store = CheckpointStore::new(dir.path());
    let batch = store.load("testsr", &summary.chunks[0]).unwrap().unwrap();
    assert_eq!(batch.docs.len(), 1);
    assert_eq!(batch.outcome, ChunkOutcome::Partial);
}

/// Both kinds dropped: the run continues, the cell reads 0/failed, and no
/// checkpoint is written so a later resume run retries the chunk.
#[test]
fn total_fetch_failure_is_recorded_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let archive = StubArchive {
        fail_comments: true,
        fail_submissions: true,
        ..Default::default()
    };
    let backend = RecordingBackend::default();

    let summary = IngestPipeline::new(week_options(dir.path()))
        .run(&archive, &backend)
        .unwrap();

    let cell = summary.rows[0].1[0];
    assert_eq!(cell.count, 0);
    assert_eq!(cell.outcome, ChunkOutcome::Failed);
    assert_eq!(backend.doc_count(), 0);
    assert!(!CheckpointStore::new(dir.path()).exists("testsr", &summary.chunks[0]));
}

/// A chunk with zero fetched records still produces an (empty) checkpoint and
/// contributes a genuine 0 to the summary.
#[test]
fn zero_activity_chunk_checkpoints_an_empty_list() {
    let dir = tempfile::tempdir().unwrap();
    let archive = StubArchive::default();
    let backend = RecordingBackend::default();

    let summary = IngestPipeline::new(week_options(dir.path()))
        .run(&archive, &backend)
        .unwrap();

    let cell = summary.rows[0].1[0];
    assert_eq!(cell.count, 0);
    assert_eq!(cell.outcome, ChunkOutcome::Complete);

    let store = CheckpointStore::new(dir.path());
    let batch = store.load("testsr", &summary.chunks[0]).unwrap().unwrap();
    assert!(batch.docs.is_empty());
    assert_eq!(backend.doc_count(), 0);
}

/// One malformed wire record is dropped with its well-formed siblings kept,
/// and the fetch still counts as complete: decode problems are per-record,
/// not transport failures.
#[test]
fn malformed_record_is_dropped_and_siblings_survive() {
    let mut broken = sample_comment("c0", 30);
    broken.as_object_mut().unwrap().remove("body");
    let archive = StubArchive {
        comments: vec![broken, sample_comment("c1", 60)],
        ..Default::default()
    };

    let chunk = plan_chunks(
        parse_date("2021-01-01").unwrap(),
        parse_date("2021-01-08").unwrap(),
        Granularity::Week,
    )
    .unwrap()[0];
    let fetcher = Fetcher::new(&archive, SourceSchema::Pushshift);
    let result = fetcher.fetch("testsr", &chunk, ContentKind::Comment, 100);

    assert_eq!(result.status, FetchStatus::Complete);
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].id(), "c1");
}

/// A checkpoint written by a partial chunk must resume as partial: the
/// summary tag travels with the artifact instead of resetting to complete.
#[test]
fn resume_preserves_a_partial_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let opts = week_options(dir.path());

    let archive = StubArchive {
        submissions: vec![sample_submission("s1", 60)],
        fail_comments: true,
        ..Default::default()
    };
    let backend = RecordingBackend::default();
    let first = IngestPipeline::new(opts.clone()).run(&archive, &backend).unwrap();
    assert_eq!(first.rows[0].1[0].outcome, ChunkOutcome::Partial);

    let quiet_archive = StubArchive::default();
    let backend2 = RecordingBackend::default();
    let second = IngestPipeline::new(opts).run(&quiet_archive, &backend2).unwrap();

    assert_eq!(quiet_archive.call_count(), 0);
    let cell = second.rows[0].1[0];
    assert_eq!(cell.count, 1);
    assert_eq!(cell.outcome, ChunkOutcome::Partial);
}

/// With safe_exit on, an existing checkpoint replaces the fetch entirely but
/// its documents are still handed to the index.
#[test]
fn resume_skips_fetch_but_still_indexes() {
    let dir = tempfile::tempdir().unwrap();
    let opts = week_options(dir.path());

    // First run fills the checkpoint.
    let archive = StubArchive {
        submissions: vec![sample_submission("s1", 60)],
        comments: vec![sample_comment("c1", 120)],
        ..Default::default()
    };
    let backend = RecordingBackend::default();
    IngestPipeline::new(opts.clone()).run(&archive, &backend).unwrap();
    assert_eq!(archive.call_count(), 2);

    // Second run must not touch the archive.
    let quiet_archive = StubArchive::default();
    let backend2 = RecordingBackend::default();
    let summary = IngestPipeline::new(opts).run(&quiet_archive, &backend2).unwrap();
    assert_eq!(quiet_archive.call_count(), 0);
    assert_eq!(summary.rows[0].1[0].count, 2);
    assert_eq!(backend2.doc_count(), 2);
}

/// With safe_exit off, the checkpoint is ignored and the archive is queried.
#[test]
fn safe_exit_off_refetches_checkpointed_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let archive = StubArchive {
        submissions: vec![sample_submission("s1", 60)],
        ..Default::default()
    };
    let backend = RecordingBackend::default();
    IngestPipeline::new(week_options(dir.path()))
        .run(&archive, &backend)
        .unwrap();

    let summary = IngestPipeline::new(week_options(dir.path()).with_safe_exit(false))
        .run(&archive, &backend)
        .unwrap();
    assert_eq!(archive.call_count(), 4);
    assert_eq!(summary.rows[0].1[0].count, 1);
}

/// Empty subreddit lists fail fast, before any network activity.
#[test]
fn empty_subreddit_list_is_fatal_before_io() {
    let dir = tempfile::tempdir().unwrap();
    let archive = StubArchive::default();
    let backend = RecordingBackend::default();
    let opts = week_options(dir.path()).with_subreddits(Vec::<String>::new());

    let err = IngestPipeline::new(opts).run(&archive, &backend).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Configuration(_))
    ));
    assert_eq!(archive.call_count(), 0);
    assert_eq!(backend.doc_count(), 0);
}

/// Chunks are shared across subreddits, so summary columns line up and rows
/// preserve the configured subreddit order.
#[test]
fn summary_rows_follow_subreddit_order() {
    let dir = tempfile::tempdir().unwrap();
    let archive = StubArchive {
        submissions: vec![sample_submission("s1", 60)],
        ..Default::default()
    };
    let backend = RecordingBackend::default();
    let opts = IngestOptions::new(
        parse_date("2021-01-01").unwrap(),
        parse_date("2021-03-01").unwrap(),
    )
    .with_subreddits(["zeta", "alpha"])
    .with_granularity(Granularity::Month)
    .with_save_dir(dir.path())
    .with_progress(false);

    let summary = IngestPipeline::new(opts).run(&archive, &backend).unwrap();
    assert_eq!(summary.chunks.len(), 2);
    assert_eq!(summary.rows[0].0, "zeta");
    assert_eq!(summary.rows[1].0, "alpha");
    assert_eq!(summary.rows[0].1.len(), summary.chunks.len());
}
