//! Integration Tests for API Endpoints
//!
//! Drives full inspection runs through the router with a simulated clock
//! and an in-memory inspector.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use url_inspector::{
    api::create_router,
    clock::{Clock, ManualClock},
    error::InspectError,
    inspection::{InspectionResult, Inspector},
    AppState, Config,
};

// == Helper Types ==

/// Answers every URL with a canned payload unless an error is scripted for it.
struct FakeInspector {
    clock: Arc<ManualClock>,
    errors: HashMap<String, InspectError>,
    calls: Mutex<Vec<String>>,
}

impl FakeInspector {
    fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            errors: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing(mut self, url: &str, error: InspectError) -> Self {
        self.errors.insert(url.to_string(), error);
        self
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Inspector for FakeInspector {
    async fn inspect(&self, property: &str, url: &str) -> Result<InspectionResult, InspectError> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(error) = self.errors.get(url) {
            return Err(error.clone());
        }
        let payload = json!({
            "inspectionResult": {
                "indexStatusResult": {
                    "verdict": "PASS",
                    "coverageState": "Submitted and indexed",
                    "pageFetchState": "SUCCESSFUL",
                    "crawledAs": "DESKTOP"
                },
                "mobileUsabilityResult": { "verdict": "PASS" }
            }
        });
        Ok(InspectionResult::from_payload(property, url, payload, self.clock.now()).unwrap())
    }
}

// == Helper Functions ==

fn test_config() -> Config {
    Config {
        inter_batch_delay_secs: 1,
        ..Config::default()
    }
}

fn create_test_app(build: impl FnOnce(Arc<ManualClock>) -> FakeInspector) -> (Router, Arc<FakeInspector>) {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()));
    let inspector = Arc::new(build(clock.clone()));
    let state = AppState::from_config(&test_config(), inspector.clone(), clock);
    (create_router(state), inspector)
}

fn inspect_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/inspect")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// == Inspect Endpoint Tests ==

#[tokio::test]
async fn test_inspect_deduplicates_input() {
    let (app, inspector) = create_test_app(FakeInspector::new);

    let response = app
        .oneshot(inspect_request(json!({
            "property": "https://example.com/",
            "urls": ["example.com/a", "example.com/a", "example.com/b"]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["results"].as_array().unwrap().len(), 2);
    assert_eq!(json["state"], "COMPLETED");
    assert_eq!(json["aborted"], false);
    assert_eq!(json["summary"]["live"], 2);
    assert_eq!(inspector.call_count(), 2);
}

#[tokio::test]
async fn test_inspect_twice_uses_cache() {
    let (app, inspector) = create_test_app(FakeInspector::new);
    let body = json!({
        "property": "https://example.com/",
        "urls": ["https://example.com/page"]
    });

    let first = app.clone().oneshot(inspect_request(body.clone())).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.clone().oneshot(inspect_request(body)).await.unwrap();
    let json = body_to_json(second.into_body()).await;
    assert_eq!(json["results"][0]["source"], "CACHED");
    assert_eq!(inspector.call_count(), 1);

    let stats = app
        .oneshot(Request::builder().uri("/cache/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let stats = body_to_json(stats.into_body()).await;
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["total_entries"], 1);
}

#[tokio::test]
async fn test_force_refresh_calls_again() {
    let (app, inspector) = create_test_app(FakeInspector::new);
    let body = json!({
        "property": "https://example.com/",
        "urls": ["https://example.com/page"],
        "force_refresh": true
    });

    app.clone().oneshot(inspect_request(body.clone())).await.unwrap();
    let response = app.oneshot(inspect_request(body)).await.unwrap();

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["results"][0]["source"], "LIVE");
    assert_eq!(inspector.call_count(), 2);
}

#[tokio::test]
async fn test_inspect_records_per_url_failures() {
    let (app, _) = create_test_app(|clock| {
        FakeInspector::new(clock).failing(
            "https://example.com/missing",
            InspectError::NotFound("URL is not part of this property".into()),
        )
    });

    let response = app
        .oneshot(inspect_request(json!({
            "property": "https://example.com/",
            "urls": ["https://example.com/missing", "mailto x", "https://example.com/ok"]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["failures"]["https://example.com/missing"]["kind"], "NOT_FOUND");
    assert_eq!(json["failures"]["mailto x"]["kind"], "INVALID_URL");
    assert_eq!(json["results"].as_array().unwrap().len(), 1);
    assert_eq!(json["summary"]["failed"], 2);
}

#[tokio::test]
async fn test_inspect_auth_failure_returns_partial_report() {
    let (app, _) = create_test_app(|clock| {
        FakeInspector::new(clock).failing(
            "https://example.com/b",
            InspectError::Auth("Request had invalid authentication credentials".into()),
        )
    });

    let response = app
        .oneshot(inspect_request(json!({
            "property": "https://example.com/",
            "urls": ["https://example.com/a", "https://example.com/b", "https://example.com/c"]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["aborted"], true);
    assert_eq!(json["state"], "ABORTED");
    assert_eq!(json["abort_reason"]["kind"], "AUTH_ERROR");
    assert_eq!(json["results"].as_array().unwrap().len(), 1);
    assert_eq!(json["not_attempted"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_inspect_rejects_empty_property() {
    let (app, _) = create_test_app(FakeInspector::new);

    let response = app
        .oneshot(inspect_request(json!({
            "property": "",
            "urls": ["https://example.com/a"]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("Property"));
}

#[tokio::test]
async fn test_inspect_rejects_malformed_json() {
    let (app, _) = create_test_app(FakeInspector::new);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/inspect")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_inspect_rejects_out_of_range_batch_size() {
    let (app, inspector) = create_test_app(FakeInspector::new);

    let response = app
        .oneshot(inspect_request(json!({
            "property": "https://example.com/",
            "urls": ["https://example.com/a"],
            "batch_size": 0
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(inspector.call_count(), 0);
}

// == Background Run Tests ==

#[tokio::test]
async fn test_background_run_reports_progress_and_result() {
    let (app, inspector) = create_test_app(FakeInspector::new);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/runs")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "property": "https://example.com/",
                        "urls": ["example.com/a", "example.com/b", "example.com/c"],
                        "batch_size": 2,
                        "inter_batch_delay_secs": 0
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let accepted = body_to_json(response.into_body()).await;
    let status_url = accepted["status_url"].as_str().unwrap().to_string();

    let mut status = Value::Null;
    for _ in 0..200 {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(&status_url).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        status = body_to_json(response.into_body()).await;
        if status.get("report").is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    assert_eq!(status["run_id"], accepted["run_id"]);
    assert_eq!(status["progress"]["state"], "COMPLETED");
    assert_eq!(status["progress"]["completed"], 3);
    assert_eq!(status["report"]["results"].as_array().unwrap().len(), 3);
    assert_eq!(inspector.call_count(), 3);
}

#[tokio::test]
async fn test_unknown_background_run() {
    let (app, _) = create_test_app(FakeInspector::new);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/runs/6f1c2b1e-3d4a-4b5c-8d9e-0a1b2c3d4e5f")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == Quota Endpoint Tests ==

#[tokio::test]
async fn test_quota_reflects_live_calls() {
    let (app, _) = create_test_app(FakeInspector::new);

    app.clone()
        .oneshot(inspect_request(json!({
            "property": "sc-domain:example.com",
            "urls": ["example.com/1", "example.com/2", "example.com/3"]
        })))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::builder().uri("/quota").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["daily_count"], 3);
    assert_eq!(json["minute_count"], 3);
    assert_eq!(json["daily_limit"], 2000);
    assert_eq!(json["per_minute_limit"], 600);
}

// == Cache Endpoint Tests ==

#[tokio::test]
async fn test_clear_cache_forces_reinspection() {
    let (app, inspector) = create_test_app(FakeInspector::new);
    let body = json!({
        "property": "https://example.com/",
        "urls": ["https://example.com/a", "https://example.com/b"]
    });

    app.clone().oneshot(inspect_request(body.clone())).await.unwrap();

    let cleared = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/cache")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(cleared.status(), StatusCode::OK);
    let json = body_to_json(cleared.into_body()).await;
    assert_eq!(json["cleared"], 2);

    app.oneshot(inspect_request(body)).await.unwrap();
    assert_eq!(inspector.call_count(), 4);
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = create_test_app(FakeInspector::new);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
}
