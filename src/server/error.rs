use crate::jobs::JobError;
use crate::output::UrlError;
use crate::{CrawlError, ValidationError};
use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors returned by API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("{0}")]
    NotFound(String),

    #[error("failed to crawl {} after {} attempt(s): {}", .0.url, .0.attempt_count, .0.error)]
    CrawlFailed(UrlError),

    #[error("internal server error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl From<JobError> for ApiError {
    fn from(e: JobError) -> Self {
        match e {
            JobError::NotFound(_) => ApiError::NotFound(e.to_string()),
            JobError::InvalidTransition { .. } => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<CrawlError> for ApiError {
    fn from(e: CrawlError) -> Self {
        match e {
            CrawlError::Validation(e) => ApiError::Validation(e),
            CrawlError::Job(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Validation(_) | ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::CrawlFailed(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// JSON body extractor whose rejections use the API error format
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
