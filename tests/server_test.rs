//! End-to-end tests for the embeddings server.
//!
//! These drive the real axum router with in-process requests and assert the
//! admission-control properties: bounded concurrency, permit-leak freedom,
//! health-endpoint independence, and the response surface.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use embedgate::compute::{ComputeError, Embedder, HashEmbedder};
use embedgate::{build_router, AppState, ServerConfig};

fn test_config(max_concurrent: usize) -> ServerConfig {
    ServerConfig {
        max_concurrent,
        workers: max_concurrent.max(4),
        micro_batch: 4,
        ..ServerConfig::default()
    }
}

fn router_with(embedder: Arc<dyn Embedder>, max_concurrent: usize) -> axum::Router {
    let state = Arc::new(AppState::new(test_config(max_concurrent), embedder));
    build_router(state)
}

fn embeddings_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/embeddings")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Backend that blocks for a fixed time and records peak concurrency.
struct SlowEmbedder {
    inner: HashEmbedder,
    delay: Duration,
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowEmbedder {
    fn new(delay: Duration) -> Self {
        Self {
            inner: HashEmbedder::new(16),
            delay,
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Embedder for SlowEmbedder {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ComputeError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.current.fetch_sub(1, Ordering::SeqCst);
        self.inner.embed(inputs)
    }
}

#[tokio::test]
async fn test_health_returns_ok() {
    let app = router_with(Arc::new(HashEmbedder::new(8)), 2);
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_single_string_input() {
    let app = router_with(Arc::new(HashEmbedder::new(32)), 2);
    let response = app
        .oneshot(embeddings_request(r#"{"model":"jina-code-v2","input":"hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["object"], "list");
    assert_eq!(json["model"], "jina-code-v2");
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["object"], "embedding");
    assert_eq!(json["data"][0]["index"], 0);
    assert_eq!(json["data"][0]["embedding"].as_array().unwrap().len(), 32);
}

#[tokio::test]
async fn test_batch_input_preserves_order() {
    let app = router_with(Arc::new(HashEmbedder::new(16)), 2);
    let response = app
        .oneshot(embeddings_request(
            r#"{"model":"m","input":["first","second","third"]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    for (i, entry) in data.iter().enumerate() {
        assert_eq!(entry["index"], i);
    }

    // Row 1 must be the embedding of "second", regardless of batching.
    let direct = HashEmbedder::new(16).embed(&["second".to_string()]).unwrap();
    let row: Vec<f32> = data[1]["embedding"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap() as f32)
        .collect();
    assert_eq!(row, direct[0]);
}

#[tokio::test]
async fn test_malformed_body_returns_499() {
    let app = router_with(Arc::new(HashEmbedder::new(8)), 1);
    let response = app
        .oneshot(embeddings_request(r#"{"model": "m", "input": }"#))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 499);
}

#[tokio::test]
async fn test_wrong_input_type_returns_499() {
    let app = router_with(Arc::new(HashEmbedder::new(8)), 1);
    let response = app
        .oneshot(embeddings_request(r#"{"model":"m","input":123}"#))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 499);
}

#[tokio::test]
async fn test_permit_released_after_parse_failure() {
    // Capacity 1: if the failed request leaked its permit, the follow-up
    // would hang in the gate instead of completing immediately.
    let app = router_with(Arc::new(HashEmbedder::new(8)), 1);

    let bad = app
        .clone()
        .oneshot(embeddings_request("not json at all"))
        .await
        .unwrap();
    assert_eq!(bad.status().as_u16(), 499);

    let good = tokio::time::timeout(
        Duration::from_secs(2),
        app.oneshot(embeddings_request(r#"{"model":"m","input":"ok"}"#)),
    )
    .await
    .expect("second request should be admitted without delay")
    .unwrap();
    assert_eq!(good.status(), StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_compute_failure_returns_500_and_releases_permit() {
    struct FailingEmbedder;
    impl Embedder for FailingEmbedder {
        fn dimension(&self) -> usize {
            8
        }
        fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, ComputeError> {
            Err(ComputeError::Backend("weights corrupted".into()))
        }
    }

    let app = router_with(Arc::new(FailingEmbedder), 1);

    let first = app
        .clone()
        .oneshot(embeddings_request(r#"{"model":"m","input":"x"}"#))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // Gate must be free again.
    let second = tokio::time::timeout(
        Duration::from_secs(2),
        app.oneshot(embeddings_request(r#"{"model":"m","input":"x"}"#)),
    )
    .await
    .expect("gate should not leak permits on compute failure")
    .unwrap();
    assert_eq!(second.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrency_never_exceeds_gate_capacity() {
    let capacity = 2;
    let embedder = Arc::new(SlowEmbedder::new(Duration::from_millis(50)));
    let app = router_with(Arc::clone(&embedder) as Arc<dyn Embedder>, capacity);

    let mut tasks = Vec::new();
    for i in 0..8 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            app.oneshot(embeddings_request(&format!(
                r#"{{"model":"m","input":"req {i}"}}"#
            )))
            .await
            .unwrap()
        }));
    }

    for task in tasks {
        assert_eq!(task.await.unwrap().status(), StatusCode::OK);
    }
    assert!(
        embedder.peak() <= capacity,
        "observed {} concurrent compute calls with capacity {capacity}",
        embedder.peak()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_health_answers_while_gate_saturated() {
    let capacity = 2;
    let embedder = Arc::new(SlowEmbedder::new(Duration::from_millis(300)));
    let app = router_with(Arc::clone(&embedder) as Arc<dyn Embedder>, capacity);

    // Saturate the gate with long-running compute calls.
    let mut tasks = Vec::new();
    for i in 0..capacity + 2 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            app.oneshot(embeddings_request(&format!(
                r#"{{"model":"m","input":"slow {i}"}}"#
            )))
            .await
            .unwrap()
        }));
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    let health = tokio::time::timeout(
        Duration::from_millis(200),
        app.clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap()),
    )
    .await
    .expect("health must not be gated")
    .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let metrics = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(metrics.status(), StatusCode::OK);
    let json = response_json(metrics).await;
    assert_eq!(json["gate"]["capacity"], capacity);

    for task in tasks {
        assert_eq!(task.await.unwrap().status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_empty_batch_returns_empty_list() {
    let app = router_with(Arc::new(HashEmbedder::new(8)), 1);
    let response = app
        .oneshot(embeddings_request(r#"{"model":"m","input":[]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 0);
}
