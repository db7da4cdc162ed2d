use crate::{handlers::chat_completions::AppState, status_page};
use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    Json,
};
use serde_json::{json, Value};

const PROBE_BODY_PREVIEW_LIMIT: usize = 500;

/// GET / — human-readable status page.
pub async fn root_page(State(state): State<AppState>) -> Html<String> {
    Html(status_page::render_status_page(&state.health.snapshot()))
}

/// GET /health — machine-readable snapshot of the shared health state.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.health.snapshot();
    Json(json!({
        "status": snapshot.status,
        "last_ok_utc": snapshot.last_ok,
    }))
}

/// GET /backend/health — inline probe. Shares the monitor's state and update
/// rule, so the displayed status reflects whichever check ran most recently.
pub async fn backend_probe(State(state): State<AppState>) -> Json<Value> {
    let url = state.backend.models_url();

    match state.backend.probe_models().await {
        Ok((status, text)) => {
            let ok = status == StatusCode::OK;
            state.health.record(ok);
            let preview: String = text.chars().take(PROBE_BODY_PREVIEW_LIMIT).collect();
            Json(json!({
                "ok": ok,
                "status_code": status.as_u16(),
                "text": preview,
                "url": url,
            }))
        }
        Err(err) => {
            state.health.record(false);
            Json(json!({
                "ok": false,
                "error": err.to_string(),
                "url": url,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthStatus;
    use crate::{backend::BackendClient, health::HealthHandle, logger::InteractionLogger};

    fn create_test_state(base_url: &str) -> AppState {
        AppState {
            backend: BackendClient::new(&crate::config::BackendConfig {
                base_url: base_url.to_string(),
                api_key: None,
                probe_timeout_seconds: 1,
                request_timeout_seconds: 120,
            }),
            health: HealthHandle::new(),
            logger: InteractionLogger::new("logs"),
        }
    }

    #[tokio::test]
    async fn test_health_check_reports_snapshot() {
        let state = create_test_state("http://127.0.0.1:9/v1");
        state.health.record(true);

        let Json(body) = health_check(State(state)).await;
        assert_eq!(body["status"], "ok");
        assert!(body["last_ok_utc"].is_string());
    }

    #[tokio::test]
    async fn test_health_check_unknown_has_null_last_ok() {
        let state = create_test_state("http://127.0.0.1:9/v1");

        let Json(body) = health_check(State(state)).await;
        assert_eq!(body["status"], "unknown");
        assert!(body["last_ok_utc"].is_null());
    }

    #[tokio::test]
    async fn test_backend_probe_failure_marks_down() {
        let state = create_test_state("http://127.0.0.1:9/v1");

        let Json(body) = backend_probe(State(state.clone())).await;
        assert_eq!(body["ok"], false);
        assert!(body["error"].is_string());
        assert_eq!(state.health.snapshot().status, HealthStatus::Down);
    }
}
