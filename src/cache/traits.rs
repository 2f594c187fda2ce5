//! Core traits and types for the read-through cache.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Transport-level failure reported by an upstream fetcher.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
  #[error("upstream did not answer within {0:?}")]
  Timeout(Duration),
  #[error("upstream request failed: {0}")]
  Transport(String),
  #[error("upstream answered {status}: {}", .detail.as_deref().unwrap_or("no usable body"))]
  Status { status: u16, detail: Option<String> },
}

/// A network client returning the raw payload for a subject.
///
/// Both upstream services are consumed through this one method so either
/// can be replaced or faked on its own.
#[async_trait]
pub trait Fetcher: Send + Sync {
  async fn fetch(&self, subject: &str) -> Result<Value, FetchError>;
}

/// Result of one `resolve` call. Never persisted.
#[derive(Debug)]
pub enum FetchOutcome {
  /// Served from the store without touching the upstream
  CacheHit(Value),
  /// Fetched, validated and (unless `cache_write_failed`) stored
  FreshFetch {
    data: Value,
    cache_write_failed: bool,
  },
  /// Upstream answered but has no usable data for this subject
  UpstreamInvalid(String),
  /// Upstream could not be reached; plausibly transient
  UpstreamUnreachable(FetchError),
}

#[cfg(test)]
impl FetchOutcome {
  /// The payload, for outcomes that carry one.
  pub fn data(&self) -> Option<&Value> {
    match self {
      Self::CacheHit(data) | Self::FreshFetch { data, .. } => Some(data),
      _ => None,
    }
  }

  pub fn is_hit(&self) -> bool {
    matches!(self, Self::CacheHit(_))
  }
}
