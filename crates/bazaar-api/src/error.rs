//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error renders as `{"error": <message>, "code": <CODE>}`. Access
//! errors and storage failures get generic messages so that neither other
//! owners' records nor database details leak to the client.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use bazaar_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("missing or invalid x-actor-id header")]
  Unauthenticated,

  #[error(transparent)]
  Core(#[from] CoreError),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    let ApiError::Core(e) = self else {
      return StatusCode::UNAUTHORIZED;
    };
    match e {
      CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
      CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
      CoreError::DuplicateRedemption { .. }
      | CoreError::DuplicateCode(_)
      | CoreError::DuplicateAddress => StatusCode::CONFLICT,
      CoreError::ContentionRetry => StatusCode::SERVICE_UNAVAILABLE,
      CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
      _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
  }

  fn code(&self) -> &'static str {
    match self {
      ApiError::Unauthenticated => "UNAUTHENTICATED",
      ApiError::Core(e) => e.code(),
    }
  }

  fn message(&self) -> String {
    match self {
      ApiError::Core(CoreError::NotFound { .. }) => "not found".to_owned(),
      ApiError::Core(CoreError::Forbidden(_)) => "forbidden".to_owned(),
      ApiError::Core(CoreError::Storage(_)) => "internal storage error".to_owned(),
      other => other.to_string(),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::warn!(error = %self, %status, "request failed");
    }
    let body = json!({ "error": self.message(), "code": self.code() });
    (status, Json(body)).into_response()
  }
}
