use crate::handlers::chat_completions::AppState;
use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// GET /v1/models — proxy to the backend's model listing, relaying status,
/// body, and content type unchanged.
pub async fn list_models(State(state): State<AppState>) -> Response {
    let response = match state.backend.fetch_models().await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(error = %err, "Failed to proxy model listing");
            return (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": {"message": err.to_string(), "type": "backend_unreachable"}})),
            )
                .into_response();
        }
    };

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));

    match response.bytes().await {
        Ok(body) => (status, [(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Failed to read model listing body");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": {"message": err.to_string(), "type": "backend_bad_response"}})),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backend::BackendClient, health::HealthHandle, logger::InteractionLogger};

    #[tokio::test]
    async fn test_list_models_unreachable_is_bad_gateway() {
        let state = AppState {
            backend: BackendClient::new(&crate::config::BackendConfig {
                base_url: "http://127.0.0.1:9/v1".to_string(),
                api_key: None,
                probe_timeout_seconds: 1,
                request_timeout_seconds: 120,
            }),
            health: HealthHandle::new(),
            logger: InteractionLogger::new("logs"),
        };

        let response = list_models(State(state)).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
