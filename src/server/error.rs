use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::cache::{FetchError, Kind};
use crate::proxy::ProxyError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
  pub success: bool,
  pub message: &'static str,
  pub error: String,
}

/// Failure response in the `{success: false, message, error}` envelope.
#[derive(Debug)]
pub struct ApiError {
  status: StatusCode,
  message: &'static str,
  error: String,
}

impl ApiError {
  pub fn new(status: StatusCode, message: &'static str, error: impl Into<String>) -> Self {
    Self {
      status,
      message,
      error: error.into(),
    }
  }

  pub fn upstream_invalid(kind: Kind, reason: String) -> Self {
    let message = match kind {
      Kind::Profile => "Failed to fetch LeetCode data",
      Kind::Analysis => "Failed to analyze profile",
    };
    Self::new(StatusCode::BAD_GATEWAY, message, reason)
  }

  pub fn upstream_unreachable(err: &FetchError) -> Self {
    Self::new(
      StatusCode::SERVICE_UNAVAILABLE,
      "Upstream service unavailable",
      err.to_string(),
    )
  }

  pub fn internal(error: impl Into<String>) -> Self {
    Self::new(
      StatusCode::INTERNAL_SERVER_ERROR,
      "Internal server error",
      error,
    )
  }
}

impl From<ProxyError> for ApiError {
  fn from(err: ProxyError) -> Self {
    match err {
      ProxyError::InvalidSubject => {
        Self::new(StatusCode::BAD_REQUEST, "Username is required", err.to_string())
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let body = ApiErrorBody {
      success: false,
      message: self.message,
      error: self.error,
    };
    (self.status, Json(body)).into_response()
  }
}
