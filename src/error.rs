//! HTTP error type and the JSON error envelope.
//!
//! Every failure leaves the API as
//! `{"error": true, "message": ..., "status_code": ...}` plus `detail` or
//! `details` where they apply.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::ai::AiError;
use crate::db::DbLockError;
use crate::state::AppState;

pub type ApiResult<T> = Result<T, ApiError>;

/// One rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation error")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// A generation provider failed or returned unusable output
    #[error("{message}: {detail}")]
    Upstream { message: String, detail: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{} not found", what))
    }

    pub fn upstream(message: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ApiError::Upstream {
            message: message.into(),
            detail: err.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream { .. } | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        ApiError::Internal(format!("database error: {}", e))
    }
}

impl From<DbLockError> for ApiError {
    fn from(e: DbLockError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<AiError> for ApiError {
    fn from(e: AiError) -> Self {
        ApiError::upstream("Content generation failed", e)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: bool,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a [FieldError]>,
    status_code: u16,
}

fn envelope(
    status: StatusCode,
    message: &str,
    detail: Option<&str>,
    details: Option<&[FieldError]>,
) -> Response {
    let body = ErrorBody {
        error: true,
        message,
        detail,
        details,
        status_code: status.as_u16(),
    };
    (status, Json(body)).into_response()
}

/// Internal error text, carried on the response for [`expose_internal_errors`]
#[derive(Clone)]
struct InternalDetail(String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Validation(fields) => {
                envelope(status, "Validation error", None, Some(fields.as_slice()))
            }
            ApiError::Unauthorized(message) => {
                let mut response = envelope(status, &message, Some(&message), None);
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::BadRequest(message)
            | ApiError::Forbidden(message)
            | ApiError::NotFound(message) => envelope(status, &message, Some(&message), None),
            ApiError::Upstream { message, detail } => {
                tracing::error!("{}: {}", message, detail);
                envelope(status, &message, Some(&detail), None)
            }
            ApiError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                let mut response = envelope(status, "Internal server error", None, None);
                response.extensions_mut().insert(InternalDetail(detail));
                response
            }
        }
    }
}

/// Middleware that adds the internal error text to 500 responses when the
/// server runs in debug mode.
pub async fn expose_internal_errors(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    if !state.config.server.debug {
        return response;
    }
    match response.extensions_mut().remove::<InternalDetail>() {
        Some(InternalDetail(detail)) => envelope(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            Some(&detail),
            None,
        ),
        None => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_envelope() {
        let response = ApiError::validation("topic", "Topic cannot be empty").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["error"], true);
        assert_eq!(body["status_code"], 422);
        assert_eq!(body["details"][0]["field"], "topic");
        assert!(body.get("detail").is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_sets_challenge_header() {
        let response = ApiError::Unauthorized("Invalid credentials".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[tokio::test]
    async fn test_internal_hides_detail() {
        let response = ApiError::Internal("disk on fire".into()).into_response();
        assert!(response.extensions().get::<InternalDetail>().is_some());

        let body = body_json(response).await;
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("detail").is_none());
    }

    fn internal_error_server(debug: bool) -> axum_test::TestServer {
        use axum::{middleware, routing::get, Router};
        use std::sync::Arc;

        let mut config = crate::config::Config::default();
        config.server.debug = debug;
        let state = AppState::new(
            crate::db::init_memory_db().unwrap(),
            config,
            Arc::new(crate::ai::Unconfigured("Gemini")),
            Arc::new(crate::ai::Unconfigured("D-ID")),
        );
        let app = Router::new()
            .route(
                "/fail",
                get(|| async { Err::<(), _>(ApiError::Internal("disk on fire".into())) }),
            )
            .layer(middleware::from_fn_with_state(state.clone(), expose_internal_errors))
            .with_state(state);
        axum_test::TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn test_debug_exposes_internal_detail() {
        let response = internal_error_server(true).get("/fail").await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["detail"], "disk on fire");
        assert_eq!(body["status_code"], 500);
    }

    #[tokio::test]
    async fn test_release_keeps_internal_detail_private() {
        let response = internal_error_server(false).get("/fail").await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("detail").is_none());
    }

    #[tokio::test]
    async fn test_upstream_carries_detail() {
        let response = ApiError::upstream("Error generating flashcards", "quota exceeded").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Error generating flashcards");
        assert_eq!(body["detail"], "quota exceeded");
    }
}
