mod efforts;
mod history;

pub use efforts::EffortsView;
pub use history::HistoryView;

use std::sync::Arc;

use crate::cache::{CacheKey, CacheStore, FreshnessPolicy};
use crate::history::SegmentHistory;
use crate::segments::types::SegmentSummary;

/// What every view needs to load and record segments
pub struct ViewContext<A> {
  pub api: Arc<A>,
  pub cache: CacheStore,
  pub history: SegmentHistory,
  pub policy: FreshnessPolicy,
  /// Reloads allowed after the backend reports an expired session
  pub max_reloads: u32,
}

impl<A> Clone for ViewContext<A> {
  fn clone(&self) -> Self {
    Self {
      api: Arc::clone(&self.api),
      cache: self.cache.clone(),
      history: self.history.clone(),
      policy: self.policy,
      max_reloads: self.max_reloads,
    }
  }
}

impl<A> ViewContext<A> {
  /// Name and details for a segment from the cache or history
  pub fn segment_summary(&self, id: u64) -> SegmentSummary {
    self
      .cache
      .get::<SegmentSummary>(CacheKey::segment(id))
      .map(|record| record.payload)
      .or_else(|| {
        self.history.find(id).map(|entry| SegmentSummary {
          id,
          name: entry.name,
          distance: entry.distance,
          elevation_gain: entry.elevation_gain,
          city: entry.city,
          state: entry.state,
        })
      })
      .unwrap_or_else(|| SegmentSummary::unnamed(id))
  }

  /// Move a segment to the front of the history and remember its details
  pub fn record_visit(&self, segment: &SegmentSummary) {
    self.history.add_segment(segment);
    self.cache.put(CacheKey::segment(segment.id), segment);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStorage;

  fn context() -> ViewContext<()> {
    let storage = Arc::new(MemoryStorage::default());
    ViewContext {
      api: Arc::new(()),
      cache: CacheStore::new(storage.clone()),
      history: SegmentHistory::new(storage),
      policy: FreshnessPolicy::default(),
      max_reloads: 1,
    }
  }

  #[test]
  fn test_segment_summary_falls_back_to_placeholder() {
    let ctx = context();
    assert_eq!(ctx.segment_summary(5), SegmentSummary::unnamed(5));
  }

  #[test]
  fn test_record_visit_remembers_details() {
    let ctx = context();
    let segment = SegmentSummary {
      distance: Some(4850.0),
      city: Some("Woodside".to_string()),
      ..SegmentSummary::unnamed(42)
    };
    ctx.record_visit(&SegmentSummary {
      name: "Old La Honda".to_string(),
      ..segment
    });

    let summary = ctx.segment_summary(42);
    assert_eq!(summary.name, "Old La Honda");
    assert_eq!(summary.distance, Some(4850.0));
    assert_eq!(ctx.history.entries()[0].id, 42);
  }
}
