//! Caching implementations for segment types.

use crate::cache::Cacheable;

use super::types::Effort;

impl Cacheable for Effort {
  fn cache_key(&self) -> String {
    self.id.to_string()
  }

  fn entity_type() -> &'static str {
    "effort"
  }
}
