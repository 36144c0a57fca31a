//! Route-level tests for the administrative API.
//!
//! Each test drives the real registry through the axum router with an
//! in-memory store and stubbed containment connectors.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use vigil_actions::stub_dispatcher;
use vigil_api::{ApiServer, AppState};
use vigil_core::{
    Aes256GcmEncryptor, ChecklistExecutor, Clock, EventBus, ForensicsCollector, ForensicsConfig,
    IncidentRegistry, ManualClock, MemoryStore, NoopAuditSink, NullTelemetry, RecoveryPlanner,
    StaticRoster, Store,
};

fn test_app() -> (Router, Arc<IncidentRegistry>) {
    let store = Arc::new(MemoryStore::new());
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(Utc::now()));
    let registry = Arc::new(IncidentRegistry::new(
        store as Arc<dyn Store>,
        Arc::new(EventBus::default()),
        Arc::clone(&clock),
        Arc::new(StaticRoster::example()),
        Arc::new(ForensicsCollector::new(
            Arc::new(NullTelemetry),
            Arc::new(Aes256GcmEncryptor::generate()),
            Arc::clone(&clock),
            ForensicsConfig::default(),
        )),
        Arc::new(stub_dispatcher()),
        Arc::new(RecoveryPlanner::new(
            Arc::new(ChecklistExecutor),
            Arc::clone(&clock),
        )),
        Arc::new(NoopAuditSink),
    ));
    let router = ApiServer::with_state(AppState::new(Arc::clone(&registry))).router();
    (router, registry)
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn create_body(severity: &str) -> Value {
    json!({
        "incident_type": "data_breach",
        "severity": severity,
        "description": "bulk export of customer records",
        "source": "198.51.100.4",
        "affected_systems": ["crm"],
        "affected_users": ["u-1"],
    })
}

async fn create_incident(app: &Router, severity: &str) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/incidents",
            create_body(severity),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[tokio::test]
async fn create_returns_detail_with_timeline() {
    let (app, _) = test_app();

    let body = create_incident(&app, "high").await;
    assert_eq!(body["state"], "detected");
    assert_eq!(body["severity"], "high");
    assert_eq!(body["incident_type"], "data_breach");
    assert!(body["incident_id"].as_str().unwrap().starts_with("INC-"));
    assert_eq!(body["timeline"].as_array().unwrap().len(), 1);
    assert!(!body["responders"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn critical_incident_is_contained_on_create() {
    let (app, _) = test_app();

    let body = create_incident(&app, "critical").await;
    assert_eq!(body["state"], "contained");
    assert_eq!(body["severity"], "critical");
}

#[tokio::test]
async fn unknown_severity_is_rejected() {
    let (app, _) = test_app();

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/incidents",
            create_body("catastrophic"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn missing_incident_returns_404() {
    let (app, _) = test_app();

    let response = app
        .oneshot(get_request(&format!("/api/v1/incidents/{}", Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn invalid_transition_returns_conflict_with_allowed_targets() {
    let (app, _) = test_app();

    let created = create_incident(&app, "medium").await;
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/v1/incidents/{}/state", id),
            json!({"new_state": "eradicated"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_TRANSITION");
    let allowed = body["details"]["allowed"].as_array().unwrap();
    assert!(allowed.contains(&json!("triaged")));
    assert!(allowed.contains(&json!("contained")));
}

#[tokio::test]
async fn valid_transition_updates_timeline() {
    let (app, _) = test_app();

    let created = create_incident(&app, "low").await;
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/v1/incidents/{}/state", id),
            json!({"new_state": "triaged", "notes": "confirmed by analyst", "actor": "alice"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["state"], "triaged");
    let timeline = body["timeline"].as_array().unwrap();
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[1]["actor"], "alice");
}

#[tokio::test]
async fn contain_endpoint_runs_defaults_and_advances() {
    let (app, registry) = test_app();

    let created = create_incident(&app, "high").await;
    let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/incidents/{}/contain", id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let outcome = body_json(response).await;
    assert!(outcome["failed"].as_array().unwrap().is_empty());
    assert!(!outcome["successful"].as_array().unwrap().is_empty());

    let incident = registry.get_incident(id).await.unwrap();
    assert_eq!(incident.state.as_str(), "contained");
}

#[tokio::test]
async fn list_filters_by_severity() {
    let (app, _) = test_app();

    create_incident(&app, "low").await;
    create_incident(&app, "high").await;

    let response = app
        .oneshot(get_request("/api/v1/incidents?severity=high&per_page=10"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["severity"], "high");
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn forensics_snapshot_can_be_collected_and_listed() {
    let (app, _) = test_app();

    let created = create_incident(&app, "medium").await;
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(format!("/api/v1/incidents/{}/forensics", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(get_request(&format!("/api/v1/incidents/{}/forensics", id)))
        .await
        .unwrap();
    let body = body_json(response).await;
    // One snapshot at creation, one collected above.
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn recover_plans_without_executing() {
    let (app, registry) = test_app();

    let created = create_incident(&app, "medium").await;
    let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();

    let response = app
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/incidents/{}/recover", id),
            json!({"execute": false}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(!body["plan"]["steps"].as_array().unwrap().is_empty());
    assert!(body.get("execution").is_none());

    let incident = registry.get_incident(id).await.unwrap();
    assert_eq!(incident.state.as_str(), "detected");
}

#[tokio::test]
async fn playbooks_cover_every_incident_type() {
    let (app, _) = test_app();

    let response = app.oneshot(get_request("/api/v1/playbooks")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let playbooks = body.as_array().unwrap();
    assert_eq!(playbooks.len(), vigil_core::IncidentType::ALL.len());
    for playbook in playbooks {
        assert!(!playbook["containment_actions"].as_array().unwrap().is_empty());
        assert!(!playbook["recovery_steps"].as_array().unwrap().is_empty());
    }
}

#[tokio::test]
async fn statistics_reflect_created_incidents() {
    let (app, _) = test_app();

    create_incident(&app, "low").await;
    create_incident(&app, "high").await;

    let response = app.oneshot(get_request("/api/v1/statistics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["open"], 2);
    assert_eq!(body["by_severity"]["high"], 1);
    assert_eq!(body["operations"]["incidents_created"], 2);
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let (app, _) = test_app();

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert!(!body["version"].as_str().unwrap().is_empty());
}
