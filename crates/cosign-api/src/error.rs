//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use cosign_core::{authorize::Denial, workflow::WorkflowError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("{0}")]
  Denied(Denial),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("precondition failed")]
  PreconditionFailed,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    ApiError::Store(Box::new(e))
  }
}

impl<E> From<WorkflowError<E>> for ApiError
where
  E: std::error::Error + Send + Sync + 'static,
{
  fn from(e: WorkflowError<E>) -> Self {
    use cosign_core::Error as Core;

    match e {
      WorkflowError::Store(e) => ApiError::store(e),
      WorkflowError::NotFound(id) => {
        ApiError::NotFound(format!("document {id} not found"))
      }
      WorkflowError::Denied(denial) => ApiError::Denied(denial),
      WorkflowError::Invalid(e @ Core::InvalidTransition { .. }) => {
        ApiError::Conflict(e.to_string())
      }
      WorkflowError::Invalid(e @ Core::SignerNotFound(_)) => {
        ApiError::NotFound(e.to_string())
      }
      WorkflowError::Invalid(e) => ApiError::BadRequest(e.to_string()),
      e @ WorkflowError::Contention { .. } => ApiError::Conflict(e.to_string()),
      WorkflowError::PreconditionFailed { .. } => ApiError::PreconditionFailed,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, json!({ "error": m }))
      }
      ApiError::Denied(denial) => (
        StatusCode::FORBIDDEN,
        json!({ "error": denial.to_string(), "reason": denial.code() }),
      ),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, json!({ "error": m })),
      ApiError::PreconditionFailed => (
        StatusCode::PRECONDITION_FAILED,
        json!({ "error": "document has changed" }),
      ),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
      }
    };
    (status, Json(body)).into_response()
  }
}
