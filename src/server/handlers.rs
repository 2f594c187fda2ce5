use axum::extract::{Path, State};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::cache::{FetchOutcome, Kind};
use crate::leetcode::api_types::success_body;

use super::error::ApiError;
use super::AppState;

pub const CACHE_HEADER: &str = "x-cache";
pub const DEGRADED_HEADER: &str = "x-cache-degraded";

pub async fn home() -> Json<Value> {
  Json(json!({
    "success": true,
    "message": "This is the home page",
  }))
}

pub async fn health() -> Json<Value> {
  Json(json!({
    "status": "healthy",
    "message": "Profile proxy is running",
  }))
}

pub async fn fetch_profile(
  State(state): State<AppState>,
  Path(username): Path<String>,
) -> Result<Response, ApiError> {
  respond(state, Kind::Profile, username).await
}

pub async fn analyze_profile(
  State(state): State<AppState>,
  Path(username): Path<String>,
) -> Result<Response, ApiError> {
  respond(state, Kind::Analysis, username).await
}

async fn respond(state: AppState, kind: Kind, subject: String) -> Result<Response, ApiError> {
  // Spawned so a dropped connection doesn't cancel a fetch whose result
  // the next caller can still use.
  let proxy = state.proxy.clone();
  let outcome = tokio::spawn(async move { proxy.resolve(kind, &subject).await })
    .await
    .map_err(|e| {
      tracing::error!(%kind, error = %e, "resolve task failed");
      ApiError::internal(e.to_string())
    })??;

  match outcome {
    FetchOutcome::CacheHit(data) => Ok(ok_response(kind, data, true, false)),
    FetchOutcome::FreshFetch {
      data,
      cache_write_failed,
    } => Ok(ok_response(kind, data, false, cache_write_failed)),
    FetchOutcome::UpstreamInvalid(reason) => Err(ApiError::upstream_invalid(kind, reason)),
    FetchOutcome::UpstreamUnreachable(err) => Err(ApiError::upstream_unreachable(&err)),
  }
}

fn ok_response(kind: Kind, data: Value, hit: bool, degraded: bool) -> Response {
  let message = match (kind, hit) {
    (Kind::Profile, true) => "Profile fetched from cache",
    (Kind::Profile, false) => "Profile fetched from API",
    (Kind::Analysis, true) => "Profile analysis fetched from cache",
    (Kind::Analysis, false) => "Profile analysis fetched from API",
  };

  let mut response = Json(success_body(message, data)).into_response();
  let headers = response.headers_mut();
  headers.insert(
    CACHE_HEADER,
    HeaderValue::from_static(if hit { "hit" } else { "miss" }),
  );
  if degraded {
    headers.insert(DEGRADED_HEADER, HeaderValue::from_static("write-failed"));
  }
  response
}
