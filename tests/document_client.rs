mod common;

use common::{serve_once, settle, RecordingSender};
use docgate::telemetry::{GateEvent, MemorySink, SubmissionOutcome};
use docgate::{
    Description, Document, DocumentClient, GateError, HttpSender, Product, RateGate, SendError,
    SenderConfig,
};
use futures::future::join_all;
use std::time::Duration;
use tokio::time::Instant;

fn sample_document() -> Document {
    Document {
        description: Some(Description { participant_inn: Some("7701234567".into()) }),
        doc_id: Some("doc-42".into()),
        doc_status: Some("DRAFT".into()),
        doc_type: Some("LP_INTRODUCE_GOODS".into()),
        import_request: true,
        owner_inn: Some("7701234567".into()),
        products: vec![Product {
            tnved_code: Some("6401100000".into()),
            uit_code: Some("010460".into()),
            ..Product::default()
        }],
        reg_date: Some("2024-01-15".into()),
        ..Document::default()
    }
}

#[tokio::test(start_paused = true)]
async fn submissions_respect_the_window() {
    let window = Duration::from_secs(1);
    let sender = RecordingSender::new();
    let gate = RateGate::new(window, 2).unwrap();
    let client = DocumentClient::new(gate, sender.clone());
    let start = Instant::now();

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                client.create_document(&sample_document(), &format!("sig-{}", i)).await
            })
        })
        .collect();
    for r in join_all(handles).await {
        assert!(r.unwrap().is_ok());
    }

    let mut times: Vec<Duration> = sender.call_times().into_iter().map(|t| t - start).collect();
    times.sort();
    assert_eq!(times.len(), 5);
    assert_eq!(&times[..2], &[Duration::ZERO, Duration::ZERO]);
    assert!(times[2] >= window && times[3] >= window);
    assert!(times[4] >= window * 2);
    assert_eq!(sender.signatures().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn lock_is_not_held_during_submission() {
    let sender = RecordingSender::slow(Duration::from_secs(30));
    let gate = RateGate::new(Duration::from_secs(60), 2).unwrap();
    let client = DocumentClient::new(gate, sender.clone());
    let start = Instant::now();

    let first = {
        let client = client.clone();
        tokio::spawn(async move { client.create_document(&sample_document(), "a").await })
    };
    tokio::task::yield_now().await;

    // the first submission is still in flight, yet the second slot is free
    let admission = client.gate().acquire_timeout(Duration::from_millis(1)).await.unwrap();
    assert_eq!(admission.admitted_at, start);

    first.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn sender_errors_surface_unchanged() {
    let sink = MemorySink::new();
    let gate = RateGate::new(Duration::from_secs(1), 5).unwrap().with_sink(sink.clone());
    let client = DocumentClient::new(gate, RecordingSender::failing(422));

    let err = client.create_document(&sample_document(), "sig").await.unwrap_err();
    assert!(err.is_inner());
    match err.into_inner() {
        Some(SendError::Status { status, body }) => {
            assert_eq!(status, 422);
            assert_eq!(body, "rejected");
        }
        other => panic!("expected status error, got {:?}", other),
    }
    // the failed attempt still used its admission
    assert_eq!(client.gate().in_window(), 1);
    settle().await;
    assert_eq!(
        sink.count_where(|e| matches!(e, GateEvent::Submission(SubmissionOutcome::Failure { .. }))),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn admission_failures_are_distinguishable() {
    let sender = RecordingSender::new();
    let gate = RateGate::new(Duration::from_secs(10), 1).unwrap();
    let client = DocumentClient::new(gate, sender.clone());
    client.create_document(&sample_document(), "first").await.unwrap();

    let timed_out = client
        .create_document_timeout(&sample_document(), "second", Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(timed_out.is_timeout());
    assert!(timed_out.as_inner().is_none());

    let cancelled = client
        .create_document_until(&sample_document(), "third", tokio::time::sleep(Duration::from_millis(5)))
        .await
        .unwrap_err();
    assert!(matches!(cancelled, GateError::NotAdmitted(_)));
    assert!(cancelled.is_cancelled());

    // neither abandoned call reached the sender
    assert_eq!(sender.signatures(), vec!["first".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn successful_submission_emits_outcome() {
    let sink = MemorySink::new();
    let gate = RateGate::new(Duration::from_secs(1), 1).unwrap().with_sink(sink.clone());
    let client = DocumentClient::new(gate, RecordingSender::new());

    let body = client.create_document(&sample_document(), "sig").await.unwrap();
    assert_eq!(body, r#"{"value":"ok"}"#);
    settle().await;

    assert_eq!(sink.len(), 2);
    assert_eq!(sink.count_where(|e| matches!(e, GateEvent::Admitted { in_window: 1, .. })), 1);
    assert_eq!(
        sink.count_where(|e| matches!(e, GateEvent::Submission(SubmissionOutcome::Success { .. }))),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn payload_is_the_serialized_document() {
    let sender = RecordingSender::new();
    let client = DocumentClient::new(RateGate::new(Duration::from_secs(1), 1).unwrap(), sender.clone());
    client.create_document(&sample_document(), "sig").await.unwrap();

    let payload: serde_json::Value = serde_json::from_str(&sender.payloads()[0]).unwrap();
    assert_eq!(payload["doc_id"], "doc-42");
    assert_eq!(payload["importRequest"], true);
    assert_eq!(payload["description"]["participantInn"], "7701234567");
}

#[tokio::test]
async fn http_sender_posts_json_with_signature() {
    let (url, server) = serve_once("HTTP/1.1 200 OK", r#"{"value":"created"}"#).await;
    let sender = HttpSender::new(SenderConfig::with_endpoint(url)).unwrap();
    let client = DocumentClient::new(RateGate::new(Duration::from_secs(1), 1).unwrap(), sender);

    let body = client.create_document(&sample_document(), "sig-123").await.unwrap();
    assert_eq!(body, r#"{"value":"created"}"#);

    let request = server.await.unwrap();
    assert!(request.head.starts_with("post /api/v3/lk/documents/create"));
    assert!(request.head.contains("content-type: application/json"));
    assert!(request.head.contains("x-signature: sig-123"));
    let sent: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(sent["doc_type"], "LP_INTRODUCE_GOODS");
    assert_eq!(sent["products"][0]["tnved_code"], "6401100000");
}

#[tokio::test]
async fn http_sender_reports_non_success_status() {
    let (url, server) =
        serve_once("HTTP/1.1 503 Service Unavailable", r#"{"error":"try later"}"#).await;
    let sender = HttpSender::new(SenderConfig::with_endpoint(url)).unwrap();
    let client = DocumentClient::new(RateGate::new(Duration::from_secs(1), 1).unwrap(), sender);

    let err = client.create_document(&sample_document(), "sig").await.unwrap_err();
    match err {
        GateError::Inner(SendError::Status { status, body }) => {
            assert_eq!(status, 503);
            assert!(body.contains("try later"));
        }
        other => panic!("expected 503, got {:?}", other),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn http_sender_reports_transport_failure() {
    // bind then drop to get a port nobody is listening on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = SenderConfig {
        timeout: Duration::from_secs(2),
        ..SenderConfig::with_endpoint(format!("http://{}/create", addr))
    };
    let sender = HttpSender::new(config).unwrap();
    let client = DocumentClient::new(RateGate::new(Duration::from_secs(1), 1).unwrap(), sender);

    let err = client.submit_raw("{}".into(), "sig").await.unwrap_err();
    assert!(matches!(err, GateError::Inner(SendError::Transport(_))));
}
