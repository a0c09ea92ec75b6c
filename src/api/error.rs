//! API error type with `IntoResponse`.
//!
//! Domain errors map to a status by their kind. The body is always
//! `{"error": <code>, "message": <text>}`.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::{ErrorKind, TurnoutError};

#[derive(Debug)]
pub enum ApiError {
    /// A domain or storage failure
    Domain(TurnoutError),

    /// The request could not be parsed (400)
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message),
            Self::Domain(e) => match e.kind() {
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found", e.to_string()),
                ErrorKind::Conflict => (StatusCode::CONFLICT, "conflict", e.to_string()),
                ErrorKind::Validation => (StatusCode::BAD_REQUEST, "bad_request", e.to_string()),
                ErrorKind::Internal => {
                    // Log the actual error, return generic message
                    tracing::error!(error = %e, "Internal error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal_error",
                        "an internal error occurred".to_string(),
                    )
                }
            },
        };

        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

impl From<TurnoutError> for ApiError {
    fn from(e: TurnoutError) -> Self {
        Self::Domain(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;
    use crate::domain::{EventId, RequestId};

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_conflict_echoes_rule() {
        let response = ApiError::from(TurnoutError::ParticipantLimitReached(EventId(1)))
            .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["error"], "conflict");
        assert_eq!(body["message"], "Participant limit reached.");
    }

    #[tokio::test]
    async fn test_not_found_is_404() {
        let response = ApiError::from(TurnoutError::RequestNotFound(RequestId(5))).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_internal_error_is_masked() {
        let error = TurnoutError::Other(anyhow::anyhow!("connection reset"));
        let response = ApiError::from(error).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "an internal error occurred");
    }

    #[tokio::test]
    async fn test_bad_request_is_400() {
        let response = ApiError::BadRequest("missing start".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
