//! Bounded most-recently-viewed list of segments, kept in the local store.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::cache::CacheStorage;
use crate::segments::types::SegmentSummary;

/// Storage key of the history list.
pub const HISTORY_STORAGE_KEY: &str = "strava-segment-history";

/// Entries kept before the oldest is evicted.
pub const MAX_HISTORY: usize = 10;

/// A visited segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecencyEntry {
  pub id: u64,
  pub name: String,
  #[serde(default)]
  pub distance: Option<f64>,
  #[serde(default)]
  pub elevation_gain: Option<f64>,
  #[serde(default)]
  pub city: Option<String>,
  #[serde(default)]
  pub state: Option<String>,
  #[serde(rename = "lastViewed")]
  pub last_viewed: DateTime<Utc>,
}

impl RecencyEntry {
  fn from_summary(segment: &SegmentSummary, last_viewed: DateTime<Utc>) -> Self {
    Self {
      id: segment.id,
      name: segment.name.clone(),
      distance: segment.distance,
      elevation_gain: segment.elevation_gain,
      city: segment.city.clone(),
      state: segment.state.clone(),
      last_viewed,
    }
  }
}

/// Recently viewed segments, newest first.
#[derive(Clone)]
pub struct SegmentHistory {
  storage: Arc<dyn CacheStorage>,
}

impl SegmentHistory {
  pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
    Self { storage }
  }

  /// Move `segment` to the front, stamped with the current time.
  pub fn add_segment(&self, segment: &SegmentSummary) {
    self.add_segment_at(segment, Utc::now());
  }

  fn add_segment_at(&self, segment: &SegmentSummary, viewed_at: DateTime<Utc>) {
    let mut entries = self.entries();
    entries.retain(|e| e.id != segment.id);
    entries.insert(0, RecencyEntry::from_summary(segment, viewed_at));
    entries.truncate(MAX_HISTORY);

    if let Err(e) = self.save(&entries) {
      warn!(error = %e, "could not save segment history");
    }
  }

  /// Stored entries; empty when nothing is stored or the list is unreadable.
  pub fn entries(&self) -> Vec<RecencyEntry> {
    match self.load() {
      Ok(entries) => entries,
      Err(e) => {
        warn!(error = %e, "could not load segment history");
        Vec::new()
      }
    }
  }

  /// Entries other than `current`, at most `limit` of them.
  pub fn recent_excluding(&self, current: u64, limit: usize) -> Vec<RecencyEntry> {
    self
      .entries()
      .into_iter()
      .filter(|e| e.id != current)
      .take(limit)
      .collect()
  }

  pub fn find(&self, id: u64) -> Option<RecencyEntry> {
    self.entries().into_iter().find(|e| e.id == id)
  }

  pub fn clear(&self) {
    if let Err(e) = self.storage.remove_item(HISTORY_STORAGE_KEY) {
      warn!(error = %e, "could not clear segment history");
    }
  }

  fn load(&self) -> Result<Vec<RecencyEntry>> {
    match self.storage.get_item(HISTORY_STORAGE_KEY)? {
      Some(raw) => {
        serde_json::from_str(&raw).map_err(|e| eyre!("Malformed segment history: {}", e))
      }
      None => Ok(Vec::new()),
    }
  }

  fn save(&self, entries: &[RecencyEntry]) -> Result<()> {
    let raw = serde_json::to_string(entries)
      .map_err(|e| eyre!("Failed to serialize segment history: {}", e))?;
    self.storage.set_item(HISTORY_STORAGE_KEY, &raw)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStorage;
  use chrono::Duration;

  fn history() -> (SegmentHistory, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::default());
    (SegmentHistory::new(storage.clone()), storage)
  }

  fn segment(id: u64) -> SegmentSummary {
    SegmentSummary {
      id,
      name: format!("Climb {}", id),
      distance: Some(1200.0),
      elevation_gain: Some(85.0),
      city: Some("Boulder".to_string()),
      state: None,
    }
  }

  fn ids(history: &SegmentHistory) -> Vec<u64> {
    history.entries().iter().map(|e| e.id).collect()
  }

  #[test]
  fn test_empty_history() {
    let (history, _) = history();
    assert!(history.entries().is_empty());
  }

  #[test]
  fn test_newest_first() {
    let (history, _) = history();
    history.add_segment(&segment(1));
    history.add_segment(&segment(2));
    history.add_segment(&segment(3));
    assert_eq!(ids(&history), vec![3, 2, 1]);
  }

  #[test]
  fn test_readding_moves_to_front_without_duplicates() {
    let (history, _) = history();
    let start = Utc::now();
    history.add_segment_at(&segment(1), start);
    history.add_segment_at(&segment(2), start + Duration::minutes(1));
    history.add_segment_at(&segment(1), start + Duration::minutes(2));

    assert_eq!(ids(&history), vec![1, 2]);
    assert_eq!(history.entries()[0].last_viewed, start + Duration::minutes(2));
  }

  #[test]
  fn test_bounded_to_max_entries() {
    let (history, _) = history();
    for id in 1..=25 {
      history.add_segment(&segment(id));
      assert!(history.entries().len() <= MAX_HISTORY);
    }

    let expected: Vec<u64> = (16..=25).rev().collect();
    assert_eq!(ids(&history), expected);
  }

  #[test]
  fn test_clear() {
    let (history, storage) = history();
    history.add_segment(&segment(1));
    history.clear();
    assert!(history.entries().is_empty());
    assert_eq!(storage.get_item(HISTORY_STORAGE_KEY).unwrap(), None);
  }

  #[test]
  fn test_malformed_history_reads_as_empty() {
    let (history, storage) = history();
    storage.set_item(HISTORY_STORAGE_KEY, "{oops").unwrap();
    assert!(history.entries().is_empty());

    // And recovers on the next write
    history.add_segment(&segment(4));
    assert_eq!(ids(&history), vec![4]);
  }

  #[test]
  fn test_stored_shape_uses_last_viewed_key() {
    let (history, storage) = history();
    history.add_segment(&segment(1));

    let raw = storage.get_item(HISTORY_STORAGE_KEY).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(value[0]["lastViewed"].is_string());
    assert_eq!(value[0]["name"], "Climb 1");
  }

  #[test]
  fn test_recent_excluding_current() {
    let (history, _) = history();
    for id in 1..=8 {
      history.add_segment(&segment(id));
    }

    let recent: Vec<u64> = history
      .recent_excluding(8, 5)
      .iter()
      .map(|e| e.id)
      .collect();
    assert_eq!(recent, vec![7, 6, 5, 4, 3]);
    assert_eq!(history.find(2).map(|e| e.name), Some("Climb 2".to_string()));
    assert!(history.find(99).is_none());
  }
}
