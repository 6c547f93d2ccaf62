//! Per-session job registry.

mod common;

use common::*;
use mangapack::config::PageFailurePolicy;
use mangapack::error::Error;
use mangapack::job::{JobRegistry, JobRequest};
use mangapack::types::ChapterSelection;
use std::sync::Arc;

fn registry(work: &std::path::Path, client: &Arc<FakeClient>, sink: &Arc<CollectingSink>) -> JobRegistry {
    let surface = RecordingSurface::new();
    let config = pipeline_config(work, 1024 * 1024, PageFailurePolicy::Abort);
    JobRegistry::new(pipeline(client, sink, &surface, config))
}

fn all_chapters(client: &FakeClient) -> ChapterSelection {
    ChapterSelection::All(client.chapters())
}

#[tokio::test]
async fn test_second_job_for_busy_session_is_rejected() {
    let work = tempfile::tempdir().unwrap();
    let client = Arc::new(FakeClient::new().with_chapter("c1", 1.0, 2, 64));
    let sink = CollectingSink::new();
    let registry = registry(work.path(), &client, &sink);

    let first = registry
        .submit(JobRequest::new("chat-9", "m1", TEST_TITLE, all_chapters(&client)))
        .unwrap();
    assert!(registry.is_active("chat-9"));

    let second = registry.submit(JobRequest::new("chat-9", "m2", TEST_TITLE, all_chapters(&client)));
    match second {
        Err(Error::JobInProgress { session }) => assert_eq!(session, "chat-9"),
        Err(other) => panic!("unexpected error {:?}", other),
        Ok(_) => panic!("second job for a busy session was accepted"),
    }

    let report = first.await.unwrap().unwrap();
    assert_eq!(report.pages, 2);
    assert!(!registry.is_active("chat-9"));
    assert_eq!(sink.parts().len(), 1);
}

#[tokio::test]
async fn test_session_is_released_after_failure() {
    let work = tempfile::tempdir().unwrap();
    let client = Arc::new(
        FakeClient::new()
            .with_chapter("c1", 1.0, 2, 64)
            .failing(&page_key("c1", 1)),
    );
    let sink = CollectingSink::new();
    let registry = registry(work.path(), &client, &sink);

    let handle = registry
        .submit(JobRequest::new("chat-3", "m1", TEST_TITLE, all_chapters(&client)))
        .unwrap();
    assert!(handle.await.unwrap().is_err());
    assert_eq!(registry.active_count(), 0);

    // The session accepts a new job once the failed one is gone
    let again = registry.submit(JobRequest::new("chat-3", "m2", TEST_TITLE, all_chapters(&client)));
    assert!(again.is_ok());
    let _ = again.unwrap().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sessions_run_side_by_side() {
    let work = tempfile::tempdir().unwrap();
    let client = Arc::new(
        FakeClient::new()
            .with_chapter("c1", 1.0, 3, 256)
            .with_chapter("c2", 2.0, 2, 256),
    );
    let sink = CollectingSink::new();
    let registry = registry(work.path(), &client, &sink);

    let a = registry
        .submit(JobRequest::new("chat-a", "m", TEST_TITLE, all_chapters(&client)))
        .unwrap();
    let b = registry
        .submit(JobRequest::new("chat-b", "m", TEST_TITLE, all_chapters(&client)))
        .unwrap();

    let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
    assert_eq!(a.pages, 5);
    assert_eq!(b.pages, 5);

    // Same title in both sessions, yet each delivered a complete archive
    let parts = sink.parts();
    assert_eq!(parts.len(), 2);
    for part in parts {
        assert_eq!(part.file_name, "Blue Period_Part_1.cbz");
        assert_eq!(part.entries.len(), 5);
    }

    assert_eq!(registry.active_count(), 0);
    assert!(!session_dir(work.path(), "chat-a").exists());
    assert!(!session_dir(work.path(), "chat-b").exists());
}
