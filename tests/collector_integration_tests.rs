//! Delivery against a fake collector over real HTTP.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use click_scroll_scribe::capture::input::types::{ClickRecord, ElementInfo};
use click_scroll_scribe::capture::signal::{ClickSignal, ElementNode, Signal};
use click_scroll_scribe::dispatch::{
    BatchDispatcher, CollectorPayload, DeliveryError, DispatchOutcome, HttpTransport, PageContext,
    RetentionPolicy, Transport,
};
use click_scroll_scribe::recorder::{Tracker, TrackingContext, TrackingControl};
use click_scroll_scribe::store::{
    FileStorage, LocalStore, MemoryStorage, PruneLimits, TrackedRecord, DEFAULT_STORAGE_KEY,
};
use click_scroll_scribe::TrackerConfig;
use serde_json::Value;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page() -> PageContext {
    PageContext {
        page_url: "https://shop.example/checkout".to_string(),
        user_agent: "integration-test".to_string(),
    }
}

fn context_with_click() -> TrackingContext {
    let store = LocalStore::open(
        Arc::new(MemoryStorage::new()),
        DEFAULT_STORAGE_KEY,
        PruneLimits::default(),
    );
    let ctx = TrackingContext::new(TrackingControl::new(true), store);
    ctx.record(TrackedRecord::Click(ClickRecord {
        x: 120.0,
        y: 80.0,
        x_percent: Some(12.0),
        y_percent: Some(10.0),
        page_x: 120.0,
        page_y: 880.0,
        element: ElementInfo::unknown(),
        timestamp: Utc::now(),
        source: None,
    }));
    ctx
}

async fn collector(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/track"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn batch_is_posted_as_json() {
    let server = collector(200).await;
    let transport = HttpTransport::new(&format!("{}/api/track", server.uri())).expect("transport");
    let ctx = context_with_click();
    let dispatcher = BatchDispatcher::new(
        ctx.clone(),
        Arc::new(transport),
        page(),
        Duration::from_secs(5),
        RetentionPolicy::Retain,
    );

    let outcome = dispatcher.dispatch_once().await;
    assert!(matches!(outcome, DispatchOutcome::Delivered { records: 1 }));

    let requests = server.received_requests().await.expect("request recording");
    assert_eq!(requests.len(), 1);
    let body: Value = requests[0].body_json().expect("json body");
    assert_eq!(body["pageUrl"], "https://shop.example/checkout");
    assert_eq!(body["userAgent"], "integration-test");
    assert!(body["timestamp"].is_string());
    assert_eq!(body["data"]["clicks"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"]["clicks"][0]["element"], "unknown");
    assert!(body.get("event").is_none());

    // Retained after delivery
    assert_eq!(ctx.snapshot().clicks.len(), 1);
}

#[tokio::test]
async fn server_error_keeps_data_for_next_cycle() {
    let server = collector(500).await;
    let transport = HttpTransport::new(&format!("{}/api/track", server.uri())).expect("transport");
    let ctx = context_with_click();
    let dispatcher = BatchDispatcher::new(
        ctx.clone(),
        Arc::new(transport),
        page(),
        Duration::from_secs(5),
        RetentionPolicy::DrainDelivered,
    );

    let outcome = dispatcher.dispatch_once().await;
    assert!(
        matches!(&outcome, DispatchOutcome::Failed(DeliveryError::Status(500))),
        "expected status failure, got {outcome:?}"
    );
    assert_eq!(ctx.snapshot().clicks.len(), 1);
}

#[tokio::test]
async fn unreachable_collector_is_a_network_error() {
    let transport = HttpTransport::new("http://127.0.0.1:9/api/track").expect("transport");
    let ctx = context_with_click();
    let dispatcher = BatchDispatcher::new(
        ctx.clone(),
        Arc::new(transport),
        page(),
        Duration::from_secs(5),
        RetentionPolicy::DrainDelivered,
    );

    let outcome = dispatcher.dispatch_once().await;
    assert!(matches!(outcome, DispatchOutcome::Failed(DeliveryError::Network(_))));
    assert_eq!(ctx.snapshot().clicks.len(), 1);
}

#[tokio::test]
async fn beacon_is_sent_as_plain_text() {
    let server = collector(204).await;
    let transport = HttpTransport::new(&format!("{}/api/track", server.uri())).expect("transport");
    let bundle = context_with_click().snapshot();

    assert!(transport.send_beacon(CollectorPayload::page_exit(bundle, &page())));

    let mut requests = Vec::new();
    for _ in 0..50 {
        requests = server.received_requests().await.expect("request recording");
        if !requests.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(requests.len(), 1);
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/plain"), "got {content_type}");
    let body: Value = serde_json::from_slice(&requests[0].body).expect("json text");
    assert_eq!(body["event"], "page_exit");
}

#[tokio::test]
async fn tracker_delivers_and_persists_to_disk() {
    let server = collector(200).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let endpoint = format!("{}/api/track", server.uri());

    let config = TrackerConfig {
        api_endpoint: endpoint.clone(),
        batch_interval_ms: 50,
        page_url: "https://shop.example/cart".to_string(),
        ..TrackerConfig::default()
    };
    let storage = Arc::new(FileStorage::new(dir.path()).expect("file storage"));
    let transport = Arc::new(HttpTransport::new(&endpoint).expect("transport"));
    let tracker = Tracker::initialize(config, storage, transport).expect("tracker");

    let (tx, rx) = mpsc::channel(16);
    let run = tokio::spawn(tracker.run(rx));

    tx.send(Signal::Click(ClickSignal {
        at: std::time::Instant::now(),
        client_x: 400.0,
        client_y: 300.0,
        page_x: 400.0,
        page_y: 300.0,
        viewport_width: 800.0,
        viewport_height: 600.0,
        document_height: 600.0,
        path: vec![
            ElementNode::new("button").with_id("pay").with_text("Pay now"),
            ElementNode::new("form"),
            ElementNode::new("body"),
        ],
    }))
    .await
    .expect("send click");

    tokio::time::sleep(Duration::from_millis(300)).await;
    drop(tx);
    let bundle = run.await.expect("join").expect("run");

    assert_eq!(bundle.clicks.len(), 1);
    assert_eq!(bundle.clicks[0].x_percent, Some(50.0));

    let requests = server.received_requests().await.expect("request recording");
    assert!(!requests.is_empty());
    let body: Value = requests[0].body_json().expect("json body");
    assert_eq!(body["pageUrl"], "https://shop.example/cart");
    assert_eq!(body["data"]["clicks"][0]["element"]["tag"], "button");

    // A fresh store over the same directory sees the persisted bundle
    let reopened = LocalStore::open(
        Arc::new(FileStorage::new(dir.path()).expect("file storage")),
        DEFAULT_STORAGE_KEY,
        PruneLimits::default(),
    );
    assert_eq!(reopened.bundle(), &bundle);
}
