//! HTTP Endpoints
//!
//! REST API for the voice agent.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::Serialize;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use talkback_pipeline::{TurnRequest, TurnResponse, DEFAULT_SESSION_ID};

use crate::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Chat endpoints
        .route("/api/chat", post(chat))
        .route("/api/chat/json", post(chat_json))

        // Session introspection
        .route("/api/sessions/{id}", get(get_session))

        // Health checks
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))

        // Metrics
        .route("/metrics", get(metrics_endpoint))

        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if state.config.server.cors_enabled {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        );
    }

    router.with_state(state)
}

/// Parse the multipart request, run one turn to completion, and archive the
/// audio on both sides when configured.
async fn run_turn(
    state: &AppState,
    headers: &HeaderMap,
    mut multipart: Multipart,
) -> Result<(String, TurnResponse), StatusCode> {
    let session_id = headers
        .get("x-session-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut audio = None;
    let mut override_text = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!(error = %e, "malformed multipart request");
        StatusCode::BAD_REQUEST
    })? {
        match field.name() {
            Some("file") => {
                let bytes = field.bytes().await.map_err(|e| {
                    tracing::warn!(error = %e, "failed reading audio part");
                    StatusCode::BAD_REQUEST
                })?;
                audio = Some(bytes.to_vec());
            }
            Some("text") => {
                let text = field.text().await.map_err(|e| {
                    tracing::warn!(error = %e, "failed reading text part");
                    StatusCode::BAD_REQUEST
                })?;
                override_text = Some(text);
            }
            _ => {}
        }
    }

    let request = TurnRequest {
        session_id,
        audio,
        override_text,
    };

    let session_label = request
        .session_id
        .clone()
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());
    let request_id = uuid::Uuid::new_v4();
    tracing::info!(
        request_id = %request_id,
        session_id = %session_label,
        audio_bytes = request.audio.as_ref().map(Vec::len).unwrap_or(0),
        has_text = request.override_text.is_some(),
        "chat request received"
    );

    if let Some(archive) = &state.archive {
        if let Some(bytes) = &request.audio {
            archive.save_upload(&session_label, bytes).await;
        }
    }

    // Run on a detached task so a client disconnect cannot cancel the
    // pipeline mid-flight and leave the store in a partial state.
    let orchestrator = state.orchestrator.clone();
    let turn = tokio::spawn(async move { orchestrator.handle_turn(request).await })
        .await
        .map_err(|e| {
            tracing::error!(request_id = %request_id, error = %e, "turn task panicked");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            tracing::error!(request_id = %request_id, error = %e, "turn failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if let Some(archive) = &state.archive {
        archive.save_response(&session_label, &turn.audio_wav).await;
    }

    Ok((session_label, turn))
}

/// Chat endpoint: WAV body plus the reply text in the `X-Assistant-Text`
/// header, URL-encoded with newlines flattened.
async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<impl IntoResponse, StatusCode> {
    let (_, turn) = run_turn(&state, &headers, multipart).await?;

    let flattened = turn.assistant_text.replace(['\n', '\r'], " ");
    let encoded = urlencoding::encode(&flattened).into_owned();

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/wav"));
    let value = HeaderValue::from_str(&encoded).map_err(|e| {
        tracing::error!(error = %e, "assistant text not header-safe after encoding");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    response_headers.insert(HeaderName::from_static("x-assistant-text"), value);

    Ok((response_headers, turn.audio_wav))
}

/// Chat response (JSON variant)
#[derive(Debug, Serialize)]
struct ChatJsonResponse {
    assistant_text: String,
    audio_base64: String,
}

/// Chat endpoint returning JSON with base64 audio.
async fn chat_json(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<ChatJsonResponse>, StatusCode> {
    let (_, turn) = run_turn(&state, &headers, multipart).await?;

    Ok(Json(ChatJsonResponse {
        assistant_text: turn.assistant_text,
        audio_base64: base64::engine::general_purpose::STANDARD.encode(&turn.audio_wav),
    }))
}

/// Get session info
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "session_id": id,
        "turns": state.store.turn_count(&id),
    }))
}

/// Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ready",
        "sessions": state.store.session_count(),
    }))
}

/// Prometheus exposition
async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talkback_config::Settings;

    #[test]
    fn test_router_creation() {
        let state = AppState::new(Settings::default(), None);
        let _ = create_router(state);
    }
}
