//! Runs the backend-agnostic conformance suite against both bundled stores.

use std::sync::atomic::{AtomicUsize, Ordering};

use ifta_storage::conformance::run_conformance_suite;
use ifta_storage::{JsonDirLegStore, MemoryLegStore};

#[tokio::test]
async fn memory_store_conformance() {
    let report = run_conformance_suite(|| async { MemoryLegStore::new() }).await;
    assert!(report.total > 0);
    assert_eq!(report.failed, 0, "{report}");
}

#[tokio::test]
async fn json_dir_store_conformance() {
    let parent = tempfile::tempdir().unwrap();
    let counter = AtomicUsize::new(0);
    let report = run_conformance_suite(|| {
        let root = parent
            .path()
            .join(format!("store-{}", counter.fetch_add(1, Ordering::SeqCst)));
        async move { JsonDirLegStore::open(root).await.unwrap() }
    })
    .await;
    assert!(report.total > 0);
    assert_eq!(report.failed, 0, "{report}");
}
