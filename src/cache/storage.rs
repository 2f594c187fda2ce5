//! Cache storage trait and its SQLite, in-memory and no-op backends.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Trait for cache storage backends.
///
/// Payloads are opaque strings; the backend alone enforces expiry.
pub trait CacheStorage: Send + Sync {
  /// Get the live payload stored under `key`, if any.
  fn read(&self, key: &str) -> Result<Option<String>>;

  /// Store `payload` under `key`, replacing any prior entry, expiring after `ttl`.
  fn write_with_expiry(&self, key: &str, payload: &str, ttl: Duration) -> Result<()>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn read(&self, _key: &str) -> Result<Option<String>> {
    Ok(None) // Always miss
  }

  fn write_with_expiry(&self, _key: &str, _payload: &str, _ttl: Duration) -> Result<()> {
    Ok(()) // Discard
  }
}

/// In-process storage with per-entry expiry.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStorage for MemoryStorage {
  fn read(&self, key: &str) -> Result<Option<String>> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    match entries.get(key) {
      Some((payload, expires_at)) if Instant::now() < *expires_at => Ok(Some(payload.clone())),
      Some(_) => {
        entries.remove(key);
        Ok(None)
      }
      None => Ok(None),
    }
  }

  fn write_with_expiry(&self, key: &str, payload: &str, ttl: Duration) -> Result<()> {
    let now = Instant::now();
    let expires_at = now
      .checked_add(ttl)
      .ok_or_else(|| eyre!("ttl {:?} is out of range", ttl))?;

    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    // Sweep on write so keys that are never read again don't pile up.
    entries.retain(|_, (_, at)| now < *at);
    entries.insert(key.to_string(), (payload.to_string(), expires_at));
    Ok(())
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (or create) the store at `path`, or the default location.
  pub fn open(path: Option<&Path>) -> Result<Self> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path()?,
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    storage.purge_expired()?;

    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("leetproxy").join("cache.db"))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }

  /// Drop rows whose expiry has passed. Returns how many were removed.
  pub fn purge_expired(&self) -> Result<usize> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let removed = conn
      .execute(
        "DELETE FROM cache_entries WHERE expires_at <= ?",
        params![Utc::now().timestamp_millis()],
      )
      .map_err(|e| eyre!("Failed to purge expired entries: {}", e))?;

    if removed > 0 {
      tracing::debug!(removed, "purged expired cache entries");
    }
    Ok(removed)
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    -- unix epoch milliseconds
    expires_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_expires
    ON cache_entries(expires_at);
"#;

impl CacheStorage for SqliteStorage {
  fn read(&self, key: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT payload FROM cache_entries WHERE key = ? AND expires_at > ?",
        params![key, Utc::now().timestamp_millis()],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache entry {}: {}", key, e))
  }

  fn write_with_expiry(&self, key: &str, payload: &str, ttl: Duration) -> Result<()> {
    let expires_at: DateTime<Utc> = chrono::Duration::from_std(ttl)
      .ok()
      .and_then(|ttl| Utc::now().checked_add_signed(ttl))
      .ok_or_else(|| eyre!("ttl {:?} is out of range", ttl))?;

    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO cache_entries (key, payload, expires_at) VALUES (?, ?, ?)",
        params![key, payload, expires_at.timestamp_millis()],
      )
      .map_err(|e| eyre!("Failed to store cache entry {}: {}", key, e))?;

    Ok(())
  }
}
