//! Age-based usability check for cached records.

use chrono::{DateTime, Duration, Utc};

use super::traits::CacheRecord;

/// Hours a cached record stays usable.
pub const FRESHNESS_WINDOW_HOURS: i64 = 24;

/// Longest window accepted, one year.
pub const MAX_FRESHNESS_HOURS: i64 = 24 * 365;

/// Decides whether a cached record is still usable, based on its age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
  window: Duration,
}

impl Default for FreshnessPolicy {
  fn default() -> Self {
    Self::from_hours(FRESHNESS_WINDOW_HOURS)
  }
}

impl FreshnessPolicy {
  /// Window of `hours`, held within `0..=MAX_FRESHNESS_HOURS`.
  pub fn from_hours(hours: i64) -> Self {
    Self {
      window: Duration::hours(hours.clamp(0, MAX_FRESHNESS_HOURS)),
    }
  }

  pub fn window(&self) -> Duration {
    self.window
  }

  /// Check a record against the current time.
  pub fn is_fresh<T>(&self, record: &CacheRecord<T>) -> bool {
    self.is_fresh_at(record.stored_at, Utc::now())
  }

  /// Fresh while `now - stored_at` is below the window.
  ///
  /// A negative age (clock skew) counts as fresh.
  pub fn is_fresh_at(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - stored_at < self.window
  }
}

/// Check a record against a window given in hours.
pub fn is_fresh<T>(record: &CacheRecord<T>, window_hours: i64) -> bool {
  FreshnessPolicy::from_hours(window_hours).is_fresh(record)
}
