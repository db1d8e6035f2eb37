//! API errors and their HTTP mapping.
//!
//! Every error body keeps the success shape's `questions` field (always
//! empty) so a client that only reads `questions` needs no special case.

use crate::upstream::UpstreamError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub questions: Vec<serde_json::Value>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Upstream(ref e) = self {
            tracing::error!(error = %e, "Upstream model call failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
            questions: Vec::new(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn upstream_error_is_bad_gateway_with_empty_questions() {
        let resp = ApiError::Upstream(UpstreamError::Api("rate limited".into())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["questions"], serde_json::json!([]));
        assert!(v["error"].as_str().unwrap().contains("rate limited"));
    }

    #[test]
    fn bad_request_status() {
        assert_eq!(
            ApiError::BadRequest("no image".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
