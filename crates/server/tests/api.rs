//! API endpoint integration tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use talkback_config::Settings;
use talkback_server::{create_router, AppState};

fn build_test_router() -> axum::Router {
    let state = AppState::new(Settings::default(), None);
    create_router(state)
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_ready_endpoint_reports_sessions() {
    let app = build_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ready");
    assert_eq!(json["sessions"], 0);
}

#[tokio::test]
async fn test_unseen_session_has_no_turns() {
    let app = build_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/sessions/nobody")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["session_id"], "nobody");
    assert_eq!(json["turns"], 0);
}

#[tokio::test]
async fn test_metrics_absent_without_recorder() {
    let app = build_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
