use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One attempt at a segment, as returned by the efforts endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effort {
  pub id: u64,
  pub start_date: DateTime<Utc>,
  /// Seconds
  pub elapsed_time: u64,
  #[serde(default)]
  pub moving_time: Option<u64>,
  /// Meters
  #[serde(default)]
  pub distance: f64,
  #[serde(default)]
  pub average_heartrate: Option<f64>,
  #[serde(default)]
  pub max_heartrate: Option<f64>,
  #[serde(default)]
  pub average_watts: Option<f64>,
  /// Vertical ascent in meters per hour
  #[serde(default)]
  pub vam: Option<f64>,
  #[serde(default = "untitled")]
  pub name: String,
  pub activity_id: u64,
}

fn untitled() -> String {
  "Untitled".to_string()
}

/// Segment details recorded when a segment is visited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
  pub id: u64,
  pub name: String,
  pub distance: Option<f64>,
  pub elevation_gain: Option<f64>,
  pub city: Option<String>,
  pub state: Option<String>,
}

impl SegmentSummary {
  /// Summary carrying only an id and a placeholder name
  pub fn unnamed(id: u64) -> Self {
    Self {
      id,
      name: format!("Segment {}", id),
      distance: None,
      elevation_gain: None,
      city: None,
      state: None,
    }
  }
}

/// Server-side cache statistics
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CacheStats {
  #[serde(default)]
  pub total_files: u64,
  /// Bytes
  #[serde(default)]
  pub total_size: u64,
  #[serde(default)]
  pub by_type: BTreeMap<String, u64>,
}

impl CacheStats {
  pub fn count(&self, cache_type: &str) -> u64 {
    self.by_type.get(cache_type).copied().unwrap_or(0)
  }

  /// Activities plus their heart-rate streams
  pub fn activity_count(&self) -> u64 {
    self.count("activity") + self.count("streams")
  }
}

/// Error body sent with non-2xx responses
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  pub error: Option<String>,
  #[serde(default)]
  pub needs_reauth: bool,
}

/// Body of a successful cache clear
#[derive(Debug, Default, Deserialize)]
pub struct ApiMessage {
  pub message: Option<String>,
}
