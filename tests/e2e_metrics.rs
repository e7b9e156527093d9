//! E2E test for the metrics rendered at the end of a run
//!
//! Counters are process-wide, so this file holds a single test.

mod common;

use common::TestApp;
use nomad::data::{Category, PendingUpload};
use nomad::service::SyncStatus;

#[tokio::test]
async fn test_sync_run_is_counted() {
    nomad::metrics::init_metrics();
    nomad::metrics::init_metrics();

    let app = TestApp::new().await;
    app.sign_in().await;
    let path = app.write_image("lichen.jpg");
    let entry = PendingUpload::new(
        path.to_string_lossy().into_owned(),
        "Lichen on a gate".to_string(),
        Category::Verdant,
    );
    app.state.db.insert_pending_upload(&entry).await.unwrap();

    let report = app.state.on_foreground().await.unwrap();
    assert_eq!(report.status, SyncStatus::Completed);

    let text = nomad::metrics::gather_text();
    assert!(text.contains("nomad_sync_runs_total{status=\"completed\"} 1"));
    assert!(text.contains("nomad_outbox_entries_total{outcome=\"uploaded\"} 1"));
    assert!(text.contains("nomad_api_requests_total{endpoint=\"login.php\",status=\"ok\"} 1"));
    assert!(
        text.contains("nomad_api_requests_total{endpoint=\"upload_discovery.php\",status=\"ok\"} 1")
    );
    assert!(text.contains("nomad_outbox_depth 0"));
}
