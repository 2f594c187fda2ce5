//! Cache layer that turns store faults into misses and flags.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::key::CacheKey;
use super::storage::CacheStorage;

/// Default lifetime of a cached entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Cache layer over a storage backend.
///
/// A failing store never fails the caller: reads degrade to a miss and
/// writes report `false`.
pub struct CacheLayer {
  storage: Arc<dyn CacheStorage>,
  /// How long a written entry stays visible
  ttl: Duration,
}

impl CacheLayer {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
    Self {
      storage,
      ttl: DEFAULT_TTL,
    }
  }

  /// Set the lifetime of written entries.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  /// Look up a cached payload.
  ///
  /// Store errors, empty payloads and undecodable payloads all count as a miss.
  pub fn lookup(&self, key: &CacheKey) -> Option<Value> {
    let raw = match self.storage.read(key.as_str()) {
      Ok(Some(raw)) if !raw.is_empty() => raw,
      Ok(_) => return None,
      Err(e) => {
        tracing::warn!(%key, error = %e, "cache read failed, treating as miss");
        return None;
      }
    };

    match serde_json::from_str(&raw) {
      Ok(value) => Some(value),
      Err(e) => {
        tracing::warn!(%key, error = %e, "cached payload is not valid JSON, treating as miss");
        None
      }
    }
  }

  /// Write a payload under `key` with the configured ttl. Returns whether it stuck.
  pub fn store(&self, key: &CacheKey, value: &Value) -> bool {
    let payload = match serde_json::to_string(value) {
      Ok(payload) => payload,
      Err(e) => {
        tracing::warn!(%key, error = %e, "failed to serialize payload for cache");
        return false;
      }
    };

    match self
      .storage
      .write_with_expiry(key.as_str(), &payload, self.ttl)
    {
      Ok(()) => true,
      Err(e) => {
        tracing::warn!(%key, error = %e, "cache write failed");
        false
      }
    }
  }
}

impl Clone for CacheLayer {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      ttl: self.ttl,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{Kind, MemoryStorage};
  use color_eyre::{eyre::eyre, Result};
  use serde_json::json;

  struct BrokenStorage;

  impl CacheStorage for BrokenStorage {
    fn read(&self, _key: &str) -> Result<Option<String>> {
      Err(eyre!("connection refused"))
    }

    fn write_with_expiry(&self, _key: &str, _payload: &str, _ttl: Duration) -> Result<()> {
      Err(eyre!("connection refused"))
    }
  }

  #[test]
  fn test_store_then_lookup() {
    let layer = CacheLayer::new(Arc::new(MemoryStorage::new()));
    let key = CacheKey::new(Kind::Profile, "alice");

    assert_eq!(layer.lookup(&key), None);
    assert!(layer.store(&key, &json!({"ranking": 42})));
    assert_eq!(layer.lookup(&key), Some(json!({"ranking": 42})));
  }

  #[test]
  fn test_faults_are_absorbed() {
    let layer = CacheLayer::new(Arc::new(BrokenStorage));
    let key = CacheKey::new(Kind::Analysis, "alice");

    assert_eq!(layer.lookup(&key), None);
    assert!(!layer.store(&key, &json!({})));
  }

  #[test]
  fn test_garbage_and_empty_payloads_miss() {
    let storage = Arc::new(MemoryStorage::new());
    storage
      .write_with_expiry("profile:alice", "not json", DEFAULT_TTL)
      .unwrap();
    storage
      .write_with_expiry("profile:bob", "", DEFAULT_TTL)
      .unwrap();
    let layer = CacheLayer::new(storage);

    assert_eq!(layer.lookup(&CacheKey::new(Kind::Profile, "alice")), None);
    assert_eq!(layer.lookup(&CacheKey::new(Kind::Profile, "bob")), None);
  }

  #[test]
  fn test_with_ttl() {
    let layer =
      CacheLayer::new(Arc::new(MemoryStorage::new())).with_ttl(Duration::from_secs(5));
    assert_eq!(layer.ttl(), Duration::from_secs(5));
  }
}
