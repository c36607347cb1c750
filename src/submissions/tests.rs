use serde_json::json;

use super::*;

#[tokio::test]
async fn test_mock_store_is_tenant_scoped() {
    let store = MockSubmissionStore::new();
    store.insert(fixture_submission("s1", "t1", "c1", "essay"));

    assert!(store.get_by_id("s1", "t1").await.unwrap().is_some());
    assert!(store.get_by_id("s1", "t2").await.unwrap().is_none());
    assert!(store.get_by_id("missing", "t1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_set_flagged_only_sets() {
    let store = MockSubmissionStore::new();
    store.insert(fixture_submission("s1", "t1", "c1", "essay"));

    store.set_flagged("s1", "t1").await.unwrap();
    store.set_flagged("s1", "t1").await.unwrap();

    assert!(store.is_flagged("t1", "s1"));
    assert_eq!(store.flag_writes(), 2);
}

#[tokio::test]
async fn test_set_flagged_other_tenant_leaves_row_untouched() {
    let store = MockSubmissionStore::new();
    store.insert(fixture_submission("s1", "t1", "c1", "essay"));

    store.set_flagged("s1", "t2").await.unwrap();

    assert!(!store.is_flagged("t1", "s1"));
}

#[tokio::test]
async fn test_tenant_settings_and_failures() {
    let store = MockSubmissionStore::new();
    store.set_settings("t1", json!({"plagiarism_threshold": 0.9}));

    let settings = store.get_tenant_settings("t1").await.unwrap();
    assert_eq!(settings, Some(json!({"plagiarism_threshold": 0.9})));
    assert_eq!(store.get_tenant_settings("t2").await.unwrap(), None);

    store.set_fail_settings(true);
    assert!(matches!(
        store.get_tenant_settings("t1").await,
        Err(SubmissionStoreError::Query { .. })
    ));
    assert_eq!(store.settings_reads(), 3);
}

#[tokio::test]
async fn test_closed_store_rejects_calls() {
    let store = MockSubmissionStore::new();
    store.insert(fixture_submission("s1", "t1", "c1", "essay"));

    store.close().await;

    assert!(matches!(
        store.get_by_id("s1", "t1").await,
        Err(SubmissionStoreError::Closed)
    ));
    assert_eq!(store.close_calls(), 1);
}

#[test]
fn test_error_display() {
    let err = SubmissionStoreError::Connection {
        message: "refused".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "failed to connect to submission store: refused"
    );
}
