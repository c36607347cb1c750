use std::time::Duration;

use super::*;

#[test]
fn test_decode_valid_event_ignores_unknown_fields() {
    let event = decode_event(
        br#"{"submissionId":"s1","tenantId":"t1","courseId":"c1","source":"lms","attempt":2}"#,
    )
    .unwrap();

    assert_eq!(
        event,
        SubmissionCreated {
            submission_id: "s1".to_string(),
            tenant_id: "t1".to_string(),
            course_id: "c1".to_string(),
        }
    );
}

#[test]
fn test_decode_rejects_empty_payloads() {
    assert_eq!(decode_event(b""), Err(EventError::Empty));
    assert_eq!(decode_event(b"  \n"), Err(EventError::Empty));
}

#[test]
fn test_decode_rejects_invalid_utf8() {
    assert!(matches!(
        decode_event(&[0xff, 0xfe, 0x7b]),
        Err(EventError::InvalidUtf8 { .. })
    ));
}

#[test]
fn test_decode_rejects_non_json_and_non_objects() {
    assert!(matches!(
        decode_event(b"not json"),
        Err(EventError::InvalidJson { .. })
    ));
    assert!(matches!(
        decode_event(b"[1, 2, 3]"),
        Err(EventError::InvalidJson { .. })
    ));
}

#[test]
fn test_decode_reports_missing_or_empty_fields() {
    assert_eq!(
        decode_event(br#"{"submissionId":"s1","courseId":"c1"}"#),
        Err(EventError::MissingField { field: "tenantId" })
    );
    assert_eq!(
        decode_event(br#"{"submissionId":"","tenantId":"t1","courseId":"c1"}"#),
        Err(EventError::MissingField {
            field: "submissionId"
        })
    );
    assert_eq!(
        decode_event(br#"{"submissionId":"s1","tenantId":"t1","courseId":7}"#),
        Err(EventError::MissingField { field: "courseId" })
    );
}

#[tokio::test]
async fn test_channel_delivers_in_order() {
    let (publisher, source) = channel(4);

    publisher.publish(b"one".to_vec()).await.unwrap();
    publisher.publish(b"two".to_vec()).await.unwrap();

    assert_eq!(source.next_message().await, Some(b"one".to_vec()));
    assert_eq!(source.next_message().await, Some(b"two".to_vec()));
}

#[tokio::test]
async fn test_channel_ends_when_publishers_drop() {
    let (publisher, source) = channel(4);
    publisher.publish(b"last".to_vec()).await.unwrap();
    drop(publisher);

    assert_eq!(source.next_message().await, Some(b"last".to_vec()));
    assert_eq!(source.next_message().await, None);
}

#[tokio::test]
async fn test_unsubscribe_wakes_waiting_reader() {
    let (_publisher, source) = channel(4);
    let source = std::sync::Arc::new(source);

    let reader = {
        let source = std::sync::Arc::clone(&source);
        tokio::spawn(async move { source.next_message().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    source.unsubscribe().await;

    let received = tokio::time::timeout(Duration::from_secs(1), reader)
        .await
        .expect("reader woke up")
        .unwrap();
    assert_eq!(received, None);
    assert!(source.is_unsubscribed());
}

#[tokio::test]
async fn test_publish_after_unsubscribe_is_rejected() {
    let (publisher, source) = channel(4);

    source.unsubscribe().await;
    source.unsubscribe().await;

    assert!(publisher.is_closed());
    assert_eq!(
        publisher.publish(b"late".to_vec()).await,
        Err(PublishError::Closed)
    );
}

#[tokio::test]
async fn test_drain_discards_buffered_messages() {
    let (publisher, source) = channel(4);
    publisher.publish(b"pending".to_vec()).await.unwrap();

    source.drain().await;
    source.drain().await;

    assert_eq!(source.next_message().await, None);
    assert!(publisher.is_closed());
}
