//! End-to-end pipeline scenarios over decoded rows.

mod support;

use std::time::Duration;

use support::{lesson_row, pipeline, pipeline_with, text_row};
use timetable_ingest::db::repository::RepositoryError;
use timetable_ingest::db::{LocalRepository, TimetableRepository};
use timetable_ingest::models::UserId;
use timetable_ingest::{IngestError, PipelineSettings};

fn fast_settings() -> PipelineSettings {
    PipelineSettings {
        probe_timeout_ms: 50,
        commit_timeout_ms: 50,
        ..PipelineSettings::default()
    }
}

#[tokio::test]
async fn test_second_identical_upload_saves_nothing() {
    let repo = LocalRepository::new();
    let pipeline = pipeline(&repo);
    let user = UserId::new("u1");
    let rows = vec![
        lesson_row("A", "09:00", "Math"),
        lesson_row("A", "11:00", "Physics"),
        lesson_row("B", "09:00", "Math"),
    ];

    let first = pipeline.ingest_rows(&user, rows.clone()).await.unwrap();
    assert_eq!(first.saved_count, 3);
    assert_eq!(first.persisted_duplicates, 0);

    let second = pipeline.ingest_rows(&user, rows).await.unwrap();
    assert_eq!(second.saved_count, 0);
    assert_eq!(second.persisted_duplicates, 3);
    assert!(second.saved_ids.is_empty());
    assert_eq!(repo.entry_count(&user), 3);
    // The second run never issues a write.
    assert_eq!(repo.write_calls(), 1);
}

#[tokio::test]
async fn test_repeated_rows_in_one_upload_saved_once() {
    let repo = LocalRepository::new();
    let user = UserId::new("u1");
    let mut repeat = lesson_row("A", "09:00", "Math");
    // Only the end time, teacher and room differ.
    repeat[4] = timetable_ingest::parsing::RawCell::text("10:30");
    repeat[7] = timetable_ingest::parsing::RawCell::text("202");

    let summary = pipeline(&repo)
        .ingest_rows(&user, vec![lesson_row("A", "09:00", "Math"), repeat])
        .await
        .unwrap();

    assert_eq!(summary.valid_records, 2);
    assert_eq!(summary.batch_duplicates, 1);
    assert_eq!(summary.saved_count, 1);
    assert_eq!(repo.probe_calls(), 1);
}

#[tokio::test]
async fn test_rows_without_group_are_not_counted() {
    let repo = LocalRepository::new();
    let summary = pipeline(&repo)
        .ingest_rows(
            &UserId::new("u1"),
            vec![
                text_row(&["", "Mon", "", "09:00", "10:00", "Math"]),
                text_row(&["  "]),
                Vec::new(),
                lesson_row("A", "09:00", "Math"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(summary.rows_seen, 1);
    assert_eq!(summary.valid_records, 1);
    assert_eq!(summary.invalid_records, 0);
    assert_eq!(summary.saved_count, 1);
}

#[tokio::test]
async fn test_rejected_commit_persists_nothing() {
    let repo = LocalRepository::new();
    let user = UserId::new("u1");
    repo.set_reject_writes(true);

    let err = pipeline(&repo)
        .ingest_rows(&user, vec![lesson_row("A", "09:00", "Math")])
        .await
        .unwrap_err();

    assert!(err.is_store_fault());
    assert!(matches!(
        err,
        IngestError::Store(RepositoryError::TransactionError { .. })
    ));
    assert_eq!(repo.entry_count(&user), 0);
}

#[tokio::test]
async fn test_probe_timeout_is_store_fault() {
    let repo = LocalRepository::new();
    let user = UserId::new("u1");
    repo.set_probe_latency(Some(Duration::from_millis(500)));

    let err = pipeline_with(&repo, fast_settings())
        .ingest_rows(&user, vec![lesson_row("A", "09:00", "Math")])
        .await
        .unwrap_err();

    match err {
        IngestError::Store(e) => assert!(e.is_timeout()),
        other => panic!("expected store fault, got {other:?}"),
    }
    assert_eq!(repo.write_calls(), 0);
    assert_eq!(repo.entry_count(&user), 0);
}

#[tokio::test]
async fn test_failed_probe_aborts_before_commit() {
    let repo = LocalRepository::new();
    repo.set_fail_probes(true);

    let err = pipeline(&repo)
        .ingest_rows(&UserId::new("u1"), vec![lesson_row("A", "09:00", "Math")])
        .await
        .unwrap_err();

    assert!(err.is_store_fault());
    assert_eq!(repo.write_calls(), 0);
}

#[tokio::test]
async fn test_commit_timeout_is_store_fault() {
    let repo = LocalRepository::new();
    let user = UserId::new("u1");
    repo.set_write_latency(Some(Duration::from_millis(500)));

    let err = pipeline_with(&repo, fast_settings())
        .ingest_rows(&user, vec![lesson_row("A", "09:00", "Math")])
        .await
        .unwrap_err();

    assert!(err.is_store_fault());
    assert!(err.to_string().contains("Timeout error"));
    assert_eq!(repo.entry_count(&user), 0);
}

#[tokio::test]
async fn test_concurrent_same_user_uploads_persist_once() {
    let repo = LocalRepository::new();
    // Widen the probe/commit window so both uploads overlap.
    repo.set_probe_latency(Some(Duration::from_millis(20)));
    let pipeline = pipeline(&repo);
    let user = UserId::new("u1");
    let rows = vec![lesson_row("A", "09:00", "Math"), lesson_row("B", "09:00", "Math")];

    let first = {
        let pipeline = pipeline.clone();
        let user = user.clone();
        let rows = rows.clone();
        tokio::spawn(async move { pipeline.ingest_rows(&user, rows).await })
    };
    let second = {
        let pipeline = pipeline.clone();
        let user = user.clone();
        tokio::spawn(async move { pipeline.ingest_rows(&user, rows).await })
    };

    let a = first.await.unwrap().unwrap();
    let b = second.await.unwrap().unwrap();

    assert_eq!(a.saved_count + b.saved_count, 2);
    assert_eq!(a.persisted_duplicates + b.persisted_duplicates, 2);
    assert_eq!(repo.entry_count(&user), 2);
}

#[tokio::test]
async fn test_probe_concurrency_setting_bounds_in_flight_probes() {
    let repo = LocalRepository::new();
    repo.set_probe_latency(Some(Duration::from_millis(30)));
    let settings = PipelineSettings {
        probe_concurrency: 3,
        ..PipelineSettings::default()
    };
    let rows = ["08:00", "09:00", "10:00", "11:00", "12:00", "13:00"]
        .iter()
        .map(|start| lesson_row("A", start, "Math"))
        .collect();

    let summary = pipeline_with(&repo, settings)
        .ingest_rows(&UserId::new("u1"), rows)
        .await
        .unwrap();

    assert_eq!(summary.saved_count, 6);
    assert_eq!(repo.probe_calls(), 6);
    assert_eq!(repo.peak_concurrent_probes(), 3);
}

#[tokio::test]
async fn test_users_are_isolated() {
    let repo = LocalRepository::new();
    let pipeline = pipeline(&repo);
    let rows = vec![lesson_row("A", "09:00", "Math")];

    let alice = pipeline
        .ingest_rows(&UserId::new("alice"), rows.clone())
        .await
        .unwrap();
    let bob = pipeline.ingest_rows(&UserId::new("bob"), rows).await.unwrap();

    assert_eq!(alice.saved_count, 1);
    assert_eq!(bob.saved_count, 1);
    assert_eq!(repo.list_all(&UserId::new("bob")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_saved_ids_match_stored_entries() {
    let repo = LocalRepository::new();
    let user = UserId::new("u1");
    let summary = pipeline(&repo)
        .ingest_rows(
            &user,
            vec![lesson_row("A", "09:00", "Math"), lesson_row("A", "10:00", "Art")],
        )
        .await
        .unwrap();

    let stored = repo.list_all(&user).await.unwrap();
    let stored_ids: Vec<_> = stored.iter().map(|s| s.id.clone()).collect();
    assert_eq!(summary.saved_ids, stored_ids);
    assert_eq!(stored[1].entry.class_name, "Art");
}
