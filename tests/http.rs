use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use std::collections::HashMap;
use std::time::Duration;

use swarmload::http::HttpExecutor;
use swarmload::types::{HttpTarget, RequestDetails};
use swarmload::{Executor, ExecutorConfig, ProtocolExecutor, Target};

// Paths used in these tests.
const INDEX_PATH: &str = "/";
const ORDERS_PATH: &str = "/orders";

fn target(url: String, method: &str, expected_status: u16) -> HttpTarget {
    HttpTarget {
        url,
        method: method.to_string(),
        headers: HashMap::new(),
        expected_status,
    }
}

fn status_of(details: &RequestDetails) -> Option<u16> {
    match details {
        RequestDetails::Http { status_code, .. } => *status_code,
        other => panic!("expected HTTP details, got {:?}", other),
    }
}

#[tokio::test]
async fn expected_status_is_a_success() {
    let server = MockServer::start_async().await;
    let index = server
        .mock_async(|when, then| {
            when.method(GET).path(INDEX_PATH);
            then.status(200).body("ok");
        })
        .await;

    let executor = HttpExecutor::new(&ExecutorConfig::default()).unwrap();
    let observation = executor
        .execute(&target(server.url(INDEX_PATH), "GET", 200), 4, 9)
        .await;

    index.assert_async().await;
    assert!(observation.success);
    assert_eq!(observation.error, None);
    assert_eq!(observation.user_id, 4);
    assert_eq!(observation.request_id, 9);
    assert!(observation.response_time > 0.0);
    match observation.details {
        RequestDetails::Http {
            status_code,
            response_size,
            ref method,
            ..
        } => {
            assert_eq!(status_code, Some(200));
            assert_eq!(response_size, 2);
            assert_eq!(method, "GET");
        }
        ref other => panic!("unexpected details {:?}", other),
    }
}

#[tokio::test]
async fn unexpected_status_is_recorded_as_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(INDEX_PATH);
            then.status(500);
        })
        .await;

    let executor = HttpExecutor::new(&ExecutorConfig::default()).unwrap();
    let observation = executor
        .execute(&target(server.url(INDEX_PATH), "GET", 200), 0, 0)
        .await;

    assert!(!observation.success);
    assert_eq!(status_of(&observation.details), Some(500));
    assert_eq!(observation.error.as_deref(), Some("Expected 200, got 500"));
}

#[tokio::test]
async fn method_and_headers_are_forwarded() {
    let server = MockServer::start_async().await;
    let orders = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(ORDERS_PATH)
                .header("x-api-key", "secret");
            then.status(201);
        })
        .await;

    let mut http = target(server.url(ORDERS_PATH), "post", 201);
    http.headers
        .insert("x-api-key".to_string(), "secret".to_string());

    let executor = ProtocolExecutor::new(&ExecutorConfig::default()).unwrap();
    let observation = executor.execute(&Target::Http(http), 1, 0).await;

    orders.assert_async().await;
    assert!(observation.success, "{:?}", observation.error);
    assert_eq!(observation.target_key(), format!("POST {}", server.url(ORDERS_PATH)));
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(INDEX_PATH);
            then.status(200).delay(Duration::from_secs(3));
        })
        .await;

    let config = ExecutorConfig {
        request_timeout: Duration::from_millis(200),
        ..ExecutorConfig::default()
    };
    let executor = HttpExecutor::new(&config).unwrap();
    let observation = executor
        .execute(&target(server.url(INDEX_PATH), "GET", 200), 0, 0)
        .await;

    assert!(!observation.success);
    assert_eq!(observation.error.as_deref(), Some("Request timeout"));
    assert_eq!(status_of(&observation.details), None);
    assert!(observation.response_time >= 0.19, "{}", observation.response_time);
    assert!(observation.response_time < 3.0, "{}", observation.response_time);
}

#[tokio::test]
async fn connection_errors_are_recorded_not_raised() {
    // Nothing listens on the discard port.
    let executor = HttpExecutor::new(&ExecutorConfig::default()).unwrap();
    let observation = executor
        .execute(&target("http://127.0.0.1:9/".to_string(), "GET", 200), 0, 0)
        .await;

    assert!(!observation.success);
    assert_eq!(status_of(&observation.details), None);
    assert!(observation.error.is_some());
}

#[tokio::test]
async fn concurrent_requests_share_one_host_slot() {
    let server = MockServer::start_async().await;
    let index = server
        .mock_async(|when, then| {
            when.method(GET).path(INDEX_PATH);
            then.status(200).delay(Duration::from_millis(200));
        })
        .await;

    let config = ExecutorConfig {
        max_connections_per_host: 1,
        ..ExecutorConfig::default()
    };
    let executor = HttpExecutor::new(&config).unwrap();
    let http = target(server.url(INDEX_PATH), "GET", 200);

    let started = std::time::Instant::now();
    let (first, second) = tokio::join!(executor.execute(&http, 0, 0), executor.execute(&http, 1, 0));

    assert!(first.success && second.success);
    index.assert_hits_async(2).await;
    // The second request waited for the first to release the slot.
    assert!(started.elapsed() >= Duration::from_millis(400));
    assert!(first.response_time.max(second.response_time) >= 0.39);
}
