use crate::models::ErrorResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Terminal failures for a single edit request. Nothing here is retried.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("Missing required parameter: imageData and prompt are both required")]
    MissingParameter,
    #[error("The provider blocked this request: {reason}")]
    BlockedByProvider { reason: String },
    #[error("The provider returned no candidates")]
    EmptyOutput,
    #[error("The provider returned a candidate with no content")]
    EmptyCandidate,
    #[error("The provider returned text instead of an image")]
    TextInsteadOfImage { excerpt: String },
    #[error("The provider returned no usable output")]
    NoUsableOutput,
    #[error("Provider call failed")]
    ProviderCallFailed { detail: String },
}

impl EditError {
    fn status(&self) -> StatusCode {
        match self {
            EditError::MissingParameter => StatusCode::BAD_REQUEST,
            EditError::BlockedByProvider { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            EditError::TextInsteadOfImage { excerpt } => Some(excerpt.clone()),
            EditError::ProviderCallFailed { detail } => Some(detail.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for EditError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
            details: self.details(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<reqwest::Error> for EditError {
    fn from(e: reqwest::Error) -> Self {
        let detail = if e.is_timeout() {
            format!("provider call timed out: {}", e)
        } else {
            e.to_string()
        };
        EditError::ProviderCallFailed { detail }
    }
}
