use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::llm_client::LlmError;
use crate::store::StoreError;
use crate::ui;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("No resumes have been indexed yet. Upload at least one PDF first.")]
    StoreUnavailable,

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM error: {0}")]
    Completion(#[from] LlmError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Validation(_) | AppError::Upload(_) => StatusCode::BAD_REQUEST,
            AppError::StoreUnavailable => StatusCode::CONFLICT,
            AppError::Embedding(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Completion(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Message shown on the page. Completion-service detail is only included
    /// when `expose_detail` is set; everything else is safe to show as is.
    pub fn user_message(&self, expose_detail: bool) -> String {
        match self {
            AppError::Completion(e) if expose_detail => {
                format!("The language model request failed: {e}")
            }
            AppError::Completion(e) if e.is_auth() => {
                "The language model rejected the API key. Check the configured key.".to_string()
            }
            AppError::Completion(_) => {
                "The language model request failed. Try again shortly.".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Emits the error through tracing at a level matching its cause.
    pub fn log(&self) {
        match self {
            AppError::Validation(_) | AppError::Upload(_) | AppError::StoreUnavailable => {
                tracing::warn!("{self}")
            }
            _ => tracing::error!("{self}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();
        let body = ui::render_error_page(status, &self.user_message(false));
        (status, Html(body)).into_response()
    }
}
