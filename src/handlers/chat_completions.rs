use crate::{
    backend::BackendClient,
    error::AppError,
    health::HealthHandle,
    logger::{InteractionLogger, InteractionRecord},
    relay, status_page,
};
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderName, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

const BACKEND_DOWN_MESSAGE: &str =
    "The LLM backend is currently unavailable. Open / for status.";
const BACKEND_UNREACHABLE_MESSAGE: &str = "\n[Error] Could not reach the LLM backend.";

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub backend: BackendClient,
    pub health: HealthHandle,
    pub logger: InteractionLogger,
}

/// Handle POST /v1/chat/completions and POST /chat/completions
///
/// The body stays an opaque `Value` end to end so unknown fields pass through
/// untouched; only `stream` (and, downstream, `messages`) are inspected.
pub async fn handle_chat_completions(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidRequestBody(format!("Invalid JSON body: {}", e)))?;

    let is_stream = payload
        .get("stream")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    tracing::info!(stream = is_stream, "Handling chat completion request");

    if is_stream {
        Ok(handle_streaming(&state, payload).await)
    } else {
        handle_buffered(&state, payload).await
    }
}

async fn handle_buffered(state: &AppState, payload: Value) -> Result<Response, AppError> {
    // Known-down shortcut; the backend call would fail anyway.
    if state.health.is_down() {
        state
            .logger
            .append(InteractionRecord::new(
                503,
                payload,
                json!({"error": "backend marked down"}),
            ))
            .await;
        return Ok(fallback_page(state));
    }

    match state.backend.forward_buffered(&payload).await {
        Ok((status, body)) => {
            state
                .logger
                .append(InteractionRecord::new(
                    status.as_u16(),
                    payload,
                    body.clone(),
                ))
                .await;
            Ok((status, Json(body)).into_response())
        }
        Err(AppError::BackendUnreachable(err)) => {
            tracing::error!(error = %err, "Error contacting backend");
            state
                .logger
                .append(InteractionRecord::new(
                    503,
                    payload,
                    json!({"error": "backend unreachable"}),
                ))
                .await;
            Ok(fallback_page(state))
        }
        Err(other) => Err(other),
    }
}

async fn handle_streaming(state: &AppState, payload: Value) -> Response {
    if state.health.is_down() {
        state
            .logger
            .append(InteractionRecord::new(
                503,
                payload,
                json!({"stream": true, "full_reply": ""}),
            ))
            .await;
        return sse_response(relay::synthetic_failure_body(BACKEND_DOWN_MESSAGE));
    }

    match state.backend.forward_streaming(&payload).await {
        Ok(response) => {
            let body = relay::relay_stream(response, state.logger.clone(), payload);
            sse_response(body)
        }
        Err(err) => {
            tracing::error!(error = %err, "Streaming error contacting backend");
            state
                .logger
                .append(InteractionRecord::new(
                    502,
                    payload,
                    json!({"stream": true, "full_reply": ""}),
                ))
                .await;
            sse_response(relay::synthetic_failure_body(BACKEND_UNREACHABLE_MESSAGE))
        }
    }
}

fn fallback_page(state: &AppState) -> Response {
    let page = status_page::render_status_page(&state.health.snapshot());
    (StatusCode::SERVICE_UNAVAILABLE, Html(page)).into_response()
}

fn sse_response(body: Body) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        body,
    )
        .into_response()
}
