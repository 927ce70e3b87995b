//! Local caching layer for offline-first effort browsing.
//!
//! This module provides:
//! - A key-value storage seam (SQLite, in-memory, or disabled)
//! - Timestamped envelopes behind a typed `CacheKey`
//! - An optional archive keeping individual entities by id
//! - An age-based freshness policy

mod freshness;
mod storage;
mod store;
mod traits;

pub use freshness::{is_fresh, FreshnessPolicy, FRESHNESS_WINDOW_HOURS, MAX_FRESHNESS_HOURS};
pub use storage::{CacheStorage, EntityArchive, MemoryStorage, NoopStorage, SqliteStorage};
#[cfg(test)]
pub use storage::FailingStorage;
pub use store::CacheStore;
pub use traits::{CacheKey, CacheRecord, Cacheable, EntityKind};
