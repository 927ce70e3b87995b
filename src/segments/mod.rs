mod cache;
pub mod client;
pub mod types;

use std::future::Future;

use crate::error::FetchError;
use types::Effort;

/// Remote source of segment efforts.
pub trait EffortsApi: Send + Sync + 'static {
  /// Fetch the efforts of a segment, asking for coarser data in fallback mode.
  fn segment_efforts(
    &self,
    segment_id: u64,
    fallback: bool,
  ) -> impl Future<Output = Result<Vec<Effort>, FetchError>> + Send;
}
