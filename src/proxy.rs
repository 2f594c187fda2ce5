//! Read-through cache proxy in front of the profile and analysis services.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheKey, CacheLayer, FetchError, FetchOutcome, Fetcher, Kind};
use crate::leetcode::api_types;

/// Default bound on a single upstream call.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Caller errors detected before any I/O.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProxyError {
  #[error("subject must not be empty")]
  InvalidSubject,
}

/// Stateless proxy over an injected store and one fetcher per kind.
///
/// Every `resolve` is one linear pass: lookup, then on a miss fetch,
/// validate, store. There is no retry and no per-key deduplication, so two
/// concurrent misses on the same cold key both reach the upstream.
#[derive(Clone)]
pub struct CacheProxy {
  cache: CacheLayer,
  profile: Arc<dyn Fetcher>,
  analysis: Arc<dyn Fetcher>,
  fetch_timeout: Duration,
}

impl CacheProxy {
  pub fn new(cache: CacheLayer, profile: Arc<dyn Fetcher>, analysis: Arc<dyn Fetcher>) -> Self {
    Self {
      cache,
      profile,
      analysis,
      fetch_timeout: DEFAULT_FETCH_TIMEOUT,
    }
  }

  /// Bound every upstream call, whatever the fetcher does internally.
  pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
    self.fetch_timeout = timeout;
    self
  }

  fn fetcher(&self, kind: Kind) -> &dyn Fetcher {
    match kind {
      Kind::Profile => self.profile.as_ref(),
      Kind::Analysis => self.analysis.as_ref(),
    }
  }

  /// Produce an outcome for `(kind, subject)`, preferring cached data.
  #[tracing::instrument(skip(self))]
  pub async fn resolve(&self, kind: Kind, subject: &str) -> Result<FetchOutcome, ProxyError> {
    if subject.trim().is_empty() {
      return Err(ProxyError::InvalidSubject);
    }

    let key = CacheKey::new(kind, subject);
    if let Some(cached) = self.cache.lookup(&key) {
      tracing::debug!(%key, "cache hit");
      return Ok(FetchOutcome::CacheHit(cached));
    }
    tracing::debug!(%key, "cache miss, fetching from upstream");

    let raw = match tokio::time::timeout(self.fetch_timeout, self.fetcher(kind).fetch(subject)).await
    {
      Ok(Ok(raw)) => raw,
      Ok(Err(e)) => {
        tracing::warn!(%key, error = %e, "upstream unreachable");
        return Ok(FetchOutcome::UpstreamUnreachable(e));
      }
      Err(_) => {
        tracing::warn!(%key, timeout = ?self.fetch_timeout, "upstream timed out");
        return Ok(FetchOutcome::UpstreamUnreachable(FetchError::Timeout(
          self.fetch_timeout,
        )));
      }
    };

    let data = match api_types::validate(kind, &raw) {
      Ok(data) => data,
      Err(reason) => {
        tracing::warn!(%key, %reason, "upstream returned no usable data, not caching");
        return Ok(FetchOutcome::UpstreamInvalid(reason));
      }
    };

    let cache_write_failed = !self.cache.store(&key, &data);
    tracing::info!(%key, cache_write_failed, "fetched fresh data from upstream");

    Ok(FetchOutcome::FreshFetch {
      data,
      cache_write_failed,
    })
  }
}
