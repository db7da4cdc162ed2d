use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// Request body is not parseable JSON
    InvalidRequestBody(String),
    /// Connection to the backend failed before any response bytes
    BackendUnreachable(String),
    /// Backend responded, but not with what we can relay
    BackendBadResponse { status: StatusCode, message: String },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequestBody(msg) => write!(f, "Invalid request body: {}", msg),
            Self::BackendUnreachable(msg) => write!(f, "Backend unreachable: {}", msg),
            Self::BackendBadResponse { status, message } => {
                write!(f, "Bad backend response ({}): {}", status, message)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::InvalidRequestBody(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::BackendUnreachable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            Self::BackendBadResponse { status, message } => (*status, message.clone()),
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type_name(&self),
            }
        }));

        (status, body).into_response()
    }
}

fn error_type_name(error: &AppError) -> &'static str {
    match error {
        AppError::InvalidRequestBody(_) => "invalid_request_body",
        AppError::BackendUnreachable(_) => "backend_unreachable",
        AppError::BackendBadResponse { .. } => "backend_bad_response",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AppError::BackendUnreachable("connection refused".to_string());
        assert_eq!(
            error.to_string(),
            "Backend unreachable: connection refused"
        );
    }

    #[test]
    fn test_error_type_name() {
        assert_eq!(
            error_type_name(&AppError::InvalidRequestBody("x".to_string())),
            "invalid_request_body"
        );
        assert_eq!(
            error_type_name(&AppError::BackendBadResponse {
                status: StatusCode::BAD_GATEWAY,
                message: "x".to_string(),
            }),
            "backend_bad_response"
        );
    }

    #[tokio::test]
    async fn test_error_response_status() {
        let response = AppError::InvalidRequestBody("expected value".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::BackendBadResponse {
            status: StatusCode::BAD_GATEWAY,
            message: "Backend returned non-JSON response".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
