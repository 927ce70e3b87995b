//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

/// Trait for entities that can be archived individually by id.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Unique identifier for this entity (e.g., effort id)
  fn cache_key(&self) -> String;

  /// Entity type name for storage organization (e.g., "effort")
  fn entity_type() -> &'static str;
}

/// Kind of entity a cache record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
  /// Effort list for a segment
  Efforts,
  /// Segment summary recorded on visit
  Segment,
}

impl EntityKind {
  /// Prefix used for the storage key.
  pub fn prefix(self) -> &'static str {
    match self {
      EntityKind::Efforts => "efforts_",
      EntityKind::Segment => "segment_",
    }
  }

  /// Name of the envelope field holding the payload.
  pub fn payload_field(self) -> &'static str {
    match self {
      EntityKind::Efforts => "efforts",
      EntityKind::Segment => "segment",
    }
  }

  pub fn all() -> &'static [EntityKind] {
    &[EntityKind::Efforts, EntityKind::Segment]
  }
}

/// Typed cache key: entity kind plus id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
  pub kind: EntityKind,
  pub id: u64,
}

impl CacheKey {
  pub fn efforts(segment_id: u64) -> Self {
    Self {
      kind: EntityKind::Efforts,
      id: segment_id,
    }
  }

  pub fn segment(segment_id: u64) -> Self {
    Self {
      kind: EntityKind::Segment,
      id: segment_id,
    }
  }

  /// The string key used in the underlying storage.
  pub fn storage_key(&self) -> String {
    format!("{}{}", self.kind.prefix(), self.id)
  }

  /// Whether a raw storage key belongs to any cache record.
  pub fn is_record_key(key: &str) -> bool {
    EntityKind::all().iter().any(|kind| {
      key
        .strip_prefix(kind.prefix())
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    })
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.storage_key())
  }
}

/// A cached payload together with the instant it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord<T> {
  pub key: CacheKey,
  pub payload: T,
  pub stored_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_storage_keys() {
    assert_eq!(CacheKey::efforts(42).storage_key(), "efforts_42");
    assert_eq!(CacheKey::segment(7).storage_key(), "segment_7");
  }

  #[test]
  fn test_is_record_key() {
    assert!(CacheKey::is_record_key("efforts_42"));
    assert!(CacheKey::is_record_key("segment_1"));
    assert!(!CacheKey::is_record_key("strava-segment-history"));
    assert!(!CacheKey::is_record_key("efforts_"));
    assert!(!CacheKey::is_record_key("efforts_cache_12"));
  }
}
