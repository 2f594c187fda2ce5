//! Generic read-through caching primitives.
//!
//! This module knows nothing about the upstream services. It provides:
//! - Deterministic keys per `(kind, subject)`
//! - A key/value store trait with expiring writes, plus backends
//! - A layer that absorbs store faults
//! - The `Fetcher` seam and the `FetchOutcome` returned by the proxy

mod key;
mod layer;
mod storage;
mod traits;

pub use key::{CacheKey, Kind};
pub use layer::CacheLayer;
pub use storage::{CacheStorage, MemoryStorage, NoopStorage, SqliteStorage};
pub use traits::{FetchError, FetchOutcome, Fetcher};
