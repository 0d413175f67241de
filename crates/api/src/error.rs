use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use eggbank_core::error::CoreError;
use eggbank_db::StoreError;
use eggbank_pipeline::PipelineError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain, store and pipeline errors and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The caller could not be identified.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type Classified = (StatusCode, &'static str, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core(core),
            AppError::Pipeline(err) => classify_pipeline(err),
            AppError::Store(err) => classify_store(err),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core(err: &CoreError) -> Classified {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Internal(msg) => internal(msg),
    }
}

fn classify_pipeline(err: &PipelineError) -> Classified {
    match err {
        PipelineError::AlreadyStarted { .. } => {
            (StatusCode::CONFLICT, "ALREADY_STARTED", err.to_string())
        }
        PipelineError::BatchNotFound(_)
        | PipelineError::RequestNotFound(_)
        | PipelineError::FrameNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        PipelineError::Core(core) => classify_core(core),
        PipelineError::Store(store) => classify_store(store),
        PipelineError::InferenceFailed { .. } | PipelineError::Queue(_) => {
            internal(&err.to_string())
        }
    }
}

fn classify_store(err: &StoreError) -> Classified {
    match err {
        StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        StoreError::AlreadyExists { .. } => (StatusCode::CONFLICT, "CONFLICT", err.to_string()),
        StoreError::InvalidBlobPath(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", err.to_string()),
        StoreError::Database(_) | StoreError::Serialization(_) | StoreError::Io(_) => {
            internal(&err.to_string())
        }
    }
}

/// Log the detail and return a sanitized 500.
fn internal(detail: &str) -> Classified {
    tracing::error!(error = %detail, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
