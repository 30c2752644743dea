//! HTTP integration tests for the Cirkl REST API
//!
//! Drives the full router (CORS, tracing, extractors) with `oneshot`; no
//! socket is bound.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use cirkl_core::CirklConfig;
use cirkl_server::http::{build_router, HttpState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn make_state() -> Arc<HttpState> {
    let config = CirklConfig::build("/nonexistent/cirkl-http-test", None)
        .expect("default config should build");
    Arc::new(HttpState::new(config))
}

fn alice_payload() -> Value {
    json!({
        "user_id": "u1",
        "connection_name": "Alice",
        "location": "Paris",
        "meeting_context": "conf",
        "authenticity_score": 0.9,
        "conversation": "hi"
    })
}

fn post_json(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/connection/add")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// ===========================================================================
// TEST 1: documented end-to-end example
// ===========================================================================
#[tokio::test]
async fn test_add_connection_end_to_end() {
    let state = make_state();
    let app = build_router(Arc::clone(&state));

    let (status, body) = send(&app, post_json(&alice_payload())).await;

    assert_eq!(status, StatusCode::OK, "body: {:?}", body);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Connexion avec Alice ajoutée");
    assert!(body["connection_id"].as_str().unwrap().starts_with("u1_"));

    let records = state.store.connections_for("u1").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].connection_name, "Alice");
    assert_eq!(records[0].location, "Paris");
    assert_eq!(records[0].authenticity_score, 0.9);
    assert_eq!(records[0].role, None);
    assert_eq!(records[0].company, None);
}

// ===========================================================================
// TEST 2: submitted optional fields are kept verbatim
// ===========================================================================
#[tokio::test]
async fn test_add_connection_keeps_optional_fields() {
    let state = make_state();
    let app = build_router(Arc::clone(&state));

    let mut payload = alice_payload();
    payload["role"] = json!("CTO");
    payload["company"] = json!("Acme");
    payload["timestamp"] = json!("2024-05-01T10:00:00");

    let (status, _) = send(&app, post_json(&payload)).await;
    assert_eq!(status, StatusCode::OK);

    let record = &state.store.connections_for("u1").unwrap()[0];
    assert_eq!(record.role.as_deref(), Some("CTO"));
    assert_eq!(record.company.as_deref(), Some("Acme"));
    assert_eq!(record.timestamp, "2024-05-01T10:00:00");
}

// ===========================================================================
// TEST 3: omitted timestamp defaults to now
// ===========================================================================
#[tokio::test]
async fn test_add_connection_default_timestamp() {
    let state = make_state();
    let app = build_router(Arc::clone(&state));

    let before = chrono::Utc::now();
    let (status, _) = send(&app, post_json(&alice_payload())).await;
    assert_eq!(status, StatusCode::OK);

    let record = &state.store.connections_for("u1").unwrap()[0];
    let stamped = chrono::DateTime::parse_from_rfc3339(&record.timestamp)
        .expect("timestamp should be ISO-8601");
    let drift = stamped.with_timezone(&chrono::Utc) - before;
    assert!(drift.num_milliseconds().abs() < 1000, "drift {:?}", drift);
}

// ===========================================================================
// TEST 4: sequential ids for the same user never repeat
// ===========================================================================
#[tokio::test]
async fn test_sequential_connection_ids_distinct() {
    let state = make_state();
    let app = build_router(Arc::clone(&state));

    let mut ids = std::collections::HashSet::new();
    for _ in 0..50 {
        let (status, body) = send(&app, post_json(&alice_payload())).await;
        assert_eq!(status, StatusCode::OK);
        ids.insert(body["connection_id"].as_str().unwrap().to_string());
    }
    assert_eq!(ids.len(), 50);
    assert_eq!(state.store.connection_count("u1").unwrap(), 50);
}

// ===========================================================================
// TEST 5: each missing required field → 422, store untouched
// ===========================================================================
#[tokio::test]
async fn test_missing_required_fields_rejected() {
    let state = make_state();
    let app = build_router(Arc::clone(&state));

    for field in [
        "user_id",
        "connection_name",
        "location",
        "meeting_context",
        "authenticity_score",
        "conversation",
    ] {
        let mut payload = alice_payload();
        payload.as_object_mut().unwrap().remove(field);

        let (status, body) = send(&app, post_json(&payload)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "missing {}", field);
        let detail = body["detail"].as_str().unwrap_or_default();
        assert!(detail.contains(field), "detail for {}: {}", field, detail);
    }

    assert_eq!(state.store.total_connections().unwrap(), 0);
    assert_eq!(state.store.user_count().unwrap(), 0);
}

// ===========================================================================
// TEST 6: wrong type and malformed JSON → 422
// ===========================================================================
#[tokio::test]
async fn test_type_mismatch_and_syntax_rejected() {
    let state = make_state();
    let app = build_router(Arc::clone(&state));

    let mut payload = alice_payload();
    payload["authenticity_score"] = json!("high");
    let (status, body) = send(&app, post_json(&payload)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());

    let req = Request::builder()
        .method("POST")
        .uri("/api/connection/add")
        .header("content-type", "application/json")
        .body(Body::from("{\"user_id\": "))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());

    assert_eq!(state.store.total_connections().unwrap(), 0);
}

// ===========================================================================
// TEST 7: body without Content-Type is read as JSON; text/plain → 422
// ===========================================================================
#[tokio::test]
async fn test_content_type_handling() {
    let state = make_state();
    let app = build_router(Arc::clone(&state));
    let raw = serde_json::to_string(&alice_payload()).unwrap();

    let req = Request::builder()
        .method("POST")
        .uri("/api/connection/add")
        .body(Body::from(raw.clone()))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "body: {:?}", body);
    assert_eq!(body["message"], "Connexion avec Alice ajoutée");
    assert_eq!(state.store.total_connections().unwrap(), 1);

    let req = Request::builder()
        .method("POST")
        .uri("/api/connection/add")
        .header("content-type", "text/plain")
        .body(Body::from(raw))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
    assert_eq!(state.store.total_connections().unwrap(), 1);
}

// ===========================================================================
// TEST 8: GET /health is idempotent and read-only
// ===========================================================================
#[tokio::test]
async fn test_health_idempotent() {
    let state = make_state();
    let app = build_router(Arc::clone(&state));

    for _ in 0..3 {
        let req = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "Cirkl Graphiti Memory");
        assert!(body["timestamp"].is_string());
    }

    assert_eq!(state.store.total_connections().unwrap(), 0);
    assert!(state.store.episodes().unwrap().is_empty());
}

// ===========================================================================
// TEST 9: CORS preflight from any origin is allowed
// ===========================================================================
#[tokio::test]
async fn test_cors_preflight_allows_any_origin() {
    let app = build_router(make_state());

    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/connection/add")
        .header(header::ORIGIN, "https://automation.example.org")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert!(resp.status().is_success(), "preflight status {}", resp.status());
    assert_eq!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("https://automation.example.org")
    );
    assert_eq!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .and_then(|v| v.to_str().ok()),
        Some("true")
    );
}

// ===========================================================================
// TEST 10: concurrent first writes for one user lose nothing
// ===========================================================================
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_for_new_user() {
    let state = make_state();
    let app = build_router(Arc::clone(&state));

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move {
                let mut payload = alice_payload();
                payload["user_id"] = json!("brand-new");
                send(&app, post_json(&payload)).await.0
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(state.store.connection_count("brand-new").unwrap(), 32);
}

// ===========================================================================
// TEST 11: unknown route → 404
// ===========================================================================
#[tokio::test]
async fn test_unknown_route_not_found() {
    let app = build_router(make_state());

    let req = Request::builder()
        .method("GET")
        .uri("/api/connection/list")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ===========================================================================
// TEST 12: numeric string score is accepted and stored as a float
// ===========================================================================
#[tokio::test]
async fn test_numeric_string_score_accepted() {
    let state = make_state();
    let app = build_router(Arc::clone(&state));

    let mut payload = alice_payload();
    payload["authenticity_score"] = json!("0.75");
    let (status, body) = send(&app, post_json(&payload)).await;

    assert_eq!(status, StatusCode::OK, "body: {:?}", body);
    let record = &state.store.connections_for("u1").unwrap()[0];
    assert_eq!(record.authenticity_score, 0.75);
}
