//! Typed cache store writing timestamped envelopes into a key-value storage.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::storage::{CacheStorage, EntityArchive};
use super::traits::{CacheKey, CacheRecord, Cacheable, EntityKind};
use crate::error::CacheError;

const TIMESTAMP_FIELD: &str = "timestamp";

/// Cache store shared by every consumer of cached data.
///
/// Reads and writes never fail: storage and serialization problems are
/// logged and become a miss or a no-op.
#[derive(Clone)]
pub struct CacheStore {
  storage: Arc<dyn CacheStorage>,
  archive: Option<Arc<dyn EntityArchive>>,
}

impl CacheStore {
  pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
    Self {
      storage,
      archive: None,
    }
  }

  /// Attach a secondary archive that receives individual entities.
  pub fn with_archive(mut self, archive: Arc<dyn EntityArchive>) -> Self {
    self.archive = Some(archive);
    self
  }

  /// Look up a record; corrupt or unreadable entries read as absent.
  pub fn get<T: DeserializeOwned>(&self, key: CacheKey) -> Option<CacheRecord<T>> {
    match self.read(key) {
      Ok(record) => record,
      Err(e) => {
        warn!(key = %key, error = %e, "treating cached record as missing");
        None
      }
    }
  }

  /// Overwrite the record under `key`, stamping it with the current time.
  pub fn put<T: Serialize>(&self, key: CacheKey, payload: &T) {
    if let Err(e) = self.write(key, payload, Utc::now()) {
      warn!(key = %key, error = %e, "skipping cache write");
    }
  }

  /// Store a list and archive each entity by id.
  pub fn put_entities<T: Cacheable>(&self, key: CacheKey, entities: &[T]) {
    self.put(key, &entities);
    self.archive_entities(entities);
  }

  /// Remove every cache record, leaving other keys (such as history) intact.
  pub fn clear(&self) -> usize {
    let keys = match self.storage.keys() {
      Ok(keys) => keys,
      Err(e) => {
        warn!(error = %e, "could not list cached records");
        return 0;
      }
    };

    let mut removed = 0;
    for key in keys.iter().filter(|k| CacheKey::is_record_key(k)) {
      match self.storage.remove_item(key) {
        Ok(()) => removed += 1,
        Err(e) => warn!(key = %key, error = %e, "could not remove cached record"),
      }
    }
    debug!(removed, "cleared local cache");
    removed
  }

  /// Ids of the records of a kind currently stored.
  pub fn record_ids(&self, kind: EntityKind) -> Vec<u64> {
    let keys = match self.storage.keys() {
      Ok(keys) => keys,
      Err(e) => {
        warn!(error = %e, "could not list cached records");
        return Vec::new();
      }
    };

    keys
      .iter()
      .filter(|k| CacheKey::is_record_key(k))
      .filter_map(|k| k.strip_prefix(kind.prefix())?.parse().ok())
      .collect()
  }

  /// Number of records of a kind currently stored.
  pub fn record_count(&self, kind: EntityKind) -> usize {
    self.record_ids(kind).len()
  }

  /// Number of archived entities of a type, if an archive is attached.
  pub fn archived_count(&self, entity_type: &str) -> Option<usize> {
    let archive = self.archive.as_ref()?;
    archive.entity_count(entity_type).ok()
  }

  fn read<T: DeserializeOwned>(&self, key: CacheKey) -> Result<Option<CacheRecord<T>>, CacheError> {
    let storage_key = key.storage_key();
    let corrupt = |reason: String| CacheError::ReadCorrupt {
      key: storage_key.clone(),
      reason,
    };

    let raw = match self.storage.get_item(&storage_key) {
      Ok(Some(raw)) => raw,
      Ok(None) => return Ok(None),
      Err(e) => return Err(corrupt(e.to_string())),
    };

    let mut envelope: Map<String, Value> =
      serde_json::from_str(&raw).map_err(|e| corrupt(e.to_string()))?;

    let stored_at = envelope
      .get(TIMESTAMP_FIELD)
      .and_then(Value::as_str)
      .ok_or_else(|| corrupt("missing timestamp".to_string()))
      .and_then(|ts| {
        DateTime::parse_from_rfc3339(ts)
          .map(|dt| dt.with_timezone(&Utc))
          .map_err(|e| corrupt(format!("bad timestamp '{}': {}", ts, e)))
      })?;

    let field = key.kind.payload_field();
    let payload = envelope
      .remove(field)
      .ok_or_else(|| corrupt(format!("missing '{}' field", field)))?;
    let payload = serde_json::from_value(payload).map_err(|e| corrupt(e.to_string()))?;

    Ok(Some(CacheRecord {
      key,
      payload,
      stored_at,
    }))
  }

  fn write<T: Serialize>(
    &self,
    key: CacheKey,
    payload: &T,
    stored_at: DateTime<Utc>,
  ) -> Result<(), CacheError> {
    let storage_key = key.storage_key();
    let failure = |reason: String| CacheError::WriteFailure {
      key: storage_key.clone(),
      reason,
    };

    let payload = serde_json::to_value(payload).map_err(|e| failure(e.to_string()))?;

    let mut envelope = Map::new();
    envelope.insert(key.kind.payload_field().to_string(), payload);
    envelope.insert(
      TIMESTAMP_FIELD.to_string(),
      Value::String(stored_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );

    let raw = serde_json::to_string(&envelope).map_err(|e| failure(e.to_string()))?;
    self
      .storage
      .set_item(&storage_key, &raw)
      .map_err(|e| failure(e.to_string()))
  }

  fn archive_entities<T: Cacheable>(&self, entities: &[T]) {
    // No archive configured: nothing to do
    let Some(archive) = &self.archive else {
      return;
    };

    let rows: Vec<(String, Vec<u8>)> = entities
      .iter()
      .filter_map(|entity| match serde_json::to_vec(entity) {
        Ok(data) => Some((entity.cache_key(), data)),
        Err(e) => {
          warn!(key = %entity.cache_key(), error = %e, "could not serialize entity for archive");
          None
        }
      })
      .collect();

    if let Err(e) = archive.put_entities(T::entity_type(), &rows) {
      warn!(error = %e, "could not archive entities");
    }
  }
}
