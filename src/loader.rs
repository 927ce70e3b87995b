//! Stale-while-revalidate loading of segment efforts.
//!
//! `EffortLoader::load` answers synchronously from the local cache when it
//! holds a fresh, non-empty effort list, and always revalidates against the
//! backend on a spawned task. The returned [`RevalidateHandle`] resolves to
//! a [`LoadOutcome`] once the background phase is over; progress is also
//! reported as [`LoadEvent`]s on the event channel.
//!
//! # Example
//!
//! ```ignore
//! let load = loader.load(segment_id);
//! if let Some(cached) = &load.cached {
//!     render(cached);
//! }
//! match load.handle.await {
//!     LoadOutcome::Success { efforts, .. } => render(&efforts),
//!     LoadOutcome::Degraded { .. } => {} // keep showing cached efforts
//!     LoadOutcome::Error(e) => render_error(&e),
//! }
//! ```

use futures::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheStore, FreshnessPolicy};
use crate::error::FetchError;
use crate::event::{Event, LoadEvent};
use crate::segments::types::Effort;
use crate::segments::EffortsApi;

/// Wait before re-running a rate-limited load in fallback mode.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Wait between a session-expired notice and the reload request.
pub const RELOAD_DELAY: Duration = Duration::from_secs(2);

/// How a load ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
  /// Fresh efforts arrived and were cached.
  Success {
    efforts: Vec<Effort>,
    /// Cached efforts had been served before these arrived
    refreshed: bool,
    /// Fetched in fallback mode
    fallback: bool,
  },
  /// Refresh failed while cached efforts were already served.
  Degraded { reason: String },
  /// Nothing to show.
  Error(FetchError),
}

/// Result of starting a load.
pub struct Load {
  /// Cached efforts served immediately, if any were fresh
  pub cached: Option<Vec<Effort>>,
  /// Completion of the background revalidation
  pub handle: RevalidateHandle,
}

/// Future resolving to the outcome of a background revalidation.
///
/// Dropping the handle does not abort the revalidation.
pub struct RevalidateHandle {
  inner: JoinHandle<LoadOutcome>,
}

impl RevalidateHandle {
  /// The outcome if the revalidation is over, without waiting for it.
  ///
  /// Once this returns `Some` the handle is spent and must be dropped.
  pub fn try_outcome(&mut self) -> Option<LoadOutcome> {
    if !self.inner.is_finished() {
      return None;
    }
    self.now_or_never()
  }
}

impl Future for RevalidateHandle {
  type Output = LoadOutcome;

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    Pin::new(&mut self.inner).poll(cx).map(|joined| {
      joined.unwrap_or_else(|e| {
        warn!(error = %e, "revalidation task ended abnormally");
        LoadOutcome::Error(FetchError::remote(None, None))
      })
    })
  }
}

/// Loads efforts cache-first and keeps the cache up to date.
pub struct EffortLoader<A> {
  api: Arc<A>,
  cache: CacheStore,
  policy: FreshnessPolicy,
  /// Set once on the first rate limit; never cleared for this loader
  fallback_mode: Arc<AtomicBool>,
  retry_delay: Duration,
  reload_delay: Duration,
  events: mpsc::UnboundedSender<Event>,
}

impl<A> Clone for EffortLoader<A> {
  fn clone(&self) -> Self {
    Self {
      api: Arc::clone(&self.api),
      cache: self.cache.clone(),
      policy: self.policy,
      fallback_mode: Arc::clone(&self.fallback_mode),
      retry_delay: self.retry_delay,
      reload_delay: self.reload_delay,
      events: self.events.clone(),
    }
  }
}

impl<A: EffortsApi> EffortLoader<A> {
  pub fn new(api: Arc<A>, cache: CacheStore, events: mpsc::UnboundedSender<Event>) -> Self {
    Self {
      api,
      cache,
      policy: FreshnessPolicy::default(),
      fallback_mode: Arc::new(AtomicBool::new(false)),
      retry_delay: RETRY_DELAY,
      reload_delay: RELOAD_DELAY,
      events,
    }
  }

  pub fn with_policy(mut self, policy: FreshnessPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn fallback_mode(&self) -> bool {
    self.fallback_mode.load(Ordering::SeqCst)
  }

  /// Fresh, non-empty cached efforts for a segment.
  pub fn cached_efforts(&self, segment_id: u64) -> Option<Vec<Effort>> {
    let record = self.cache.get::<Vec<Effort>>(CacheKey::efforts(segment_id))?;

    if !self.policy.is_fresh(&record) {
      debug!(
        key = %record.key,
        stored_at = %record.stored_at,
        window_hours = self.policy.window().num_hours(),
        "cached efforts are stale"
      );
      return None;
    }

    Some(record.payload).filter(|efforts| !efforts.is_empty())
  }

  /// Start loading the efforts of a segment.
  ///
  /// Returns immediately; the remote call runs in the background.
  pub fn load(&self, segment_id: u64) -> Load {
    let cached = self.cached_efforts(segment_id);

    match &cached {
      Some(efforts) => {
        debug!(segment_id, count = efforts.len(), "serving efforts from cache");
        self.emit(LoadEvent::ServedFromCache {
          segment_id,
          count: efforts.len(),
        });
      }
      None => self.emit(LoadEvent::Loading { segment_id }),
    }

    let loader = self.clone();
    let served_cache = cached.is_some();
    let inner = tokio::spawn(async move { loader.revalidate(segment_id, served_cache).await });

    Load {
      cached,
      handle: RevalidateHandle { inner },
    }
  }

  async fn revalidate(self, segment_id: u64, served_cache: bool) -> LoadOutcome {
    let fallback = self.fallback_mode();
    let result = self.api.segment_efforts(segment_id, fallback).await;

    match result {
      Ok(efforts) => {
        let outcome = self.on_success(segment_id, efforts, served_cache, fallback);
        self.emit(LoadEvent::Settled);
        outcome
      }
      Err(err) if served_cache => {
        warn!(segment_id, error = %err, "refresh failed, keeping cached efforts");
        self.emit(LoadEvent::RefreshFailed);
        self.emit(LoadEvent::Settled);
        LoadOutcome::Degraded {
          reason: err.to_string(),
        }
      }
      Err(err) => self.on_failure(segment_id, err).await,
    }
  }

  fn on_success(
    &self,
    segment_id: u64,
    efforts: Vec<Effort>,
    refreshed: bool,
    fallback: bool,
  ) -> LoadOutcome {
    info!(segment_id, count = efforts.len(), fallback, "loaded efforts");
    self.cache.put_entities(CacheKey::efforts(segment_id), &efforts);

    let count = efforts.len();
    if refreshed {
      self.emit(LoadEvent::Refreshed { count });
    } else {
      self.emit(LoadEvent::Loaded { count });
    }
    if efforts.is_empty() {
      self.emit(LoadEvent::NoEfforts);
    }
    if fallback {
      self.emit(LoadEvent::FallbackNotice);
    }

    LoadOutcome::Success {
      efforts,
      refreshed,
      fallback,
    }
  }

  /// Failure with nothing cached: reauth, fallback retry, or error.
  async fn on_failure(&self, segment_id: u64, err: FetchError) -> LoadOutcome {
    match err {
      FetchError::SessionExpired { .. } => {
        warn!(segment_id, "session expired, scheduling reload");
        self.emit(LoadEvent::SessionExpired);
        self.schedule_reload();
        self.emit(LoadEvent::Settled);
        LoadOutcome::Error(err)
      }
      FetchError::RateLimited { .. } if !self.fallback_mode.swap(true, Ordering::SeqCst) => {
        warn!(segment_id, "rate limited, retrying in fallback mode");
        self.emit(LoadEvent::FallbackEnabled);
        self.emit(LoadEvent::Settled);
        tokio::time::sleep(self.retry_delay).await;
        self.load(segment_id).handle.await
      }
      err => {
        warn!(segment_id, error = %err, "could not load efforts");
        self.emit(LoadEvent::Failed(err.to_string()));
        self.emit(LoadEvent::Settled);
        LoadOutcome::Error(err)
      }
    }
  }

  fn schedule_reload(&self) {
    let events = self.events.clone();
    let delay = self.reload_delay;
    tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      let _ = events.send(Event::Load(LoadEvent::ReloadRequested));
    });
  }

  fn emit(&self, event: LoadEvent) {
    // Receiver may have been dropped
    let _ = self.events.send(Event::Load(event));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheStorage, FailingStorage, MemoryStorage};
  use chrono::{Duration as ChronoDuration, SecondsFormat, TimeZone, Utc};
  use std::collections::VecDeque;
  use std::sync::Mutex;

  /// Backend answering from a fixed script and recording each call.
  struct ScriptedApi {
    responses: Mutex<VecDeque<Result<Vec<Effort>, FetchError>>>,
    calls: Mutex<Vec<(u64, bool)>>,
  }

  impl ScriptedApi {
    fn new(responses: Vec<Result<Vec<Effort>, FetchError>>) -> Arc<Self> {
      Arc::new(Self {
        responses: Mutex::new(responses.into()),
        calls: Mutex::new(Vec::new()),
      })
    }

    fn calls(&self) -> Vec<(u64, bool)> {
      self.calls.lock().unwrap().clone()
    }
  }

  impl EffortsApi for ScriptedApi {
    fn segment_efforts(
      &self,
      segment_id: u64,
      fallback: bool,
    ) -> impl Future<Output = Result<Vec<Effort>, FetchError>> + Send {
      self.calls.lock().unwrap().push((segment_id, fallback));
      let next = self
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(FetchError::remote(Some(500), None)));
      async move { next }
    }
  }

  fn efforts(n: u64) -> Vec<Effort> {
    (1..=n)
      .map(|i| Effort {
        id: i,
        start_date: Utc.with_ymd_and_hms(2024, 5, i as u32, 8, 0, 0).unwrap(),
        elapsed_time: 300 + i,
        moving_time: None,
        distance: 1500.0,
        average_heartrate: Some(140.0),
        max_heartrate: Some(160.0),
        average_watts: Some(250.0),
        vam: Some(1200.0),
        name: format!("Ride {}", i),
        activity_id: 100 + i,
      })
      .collect()
  }

  struct Harness {
    api: Arc<ScriptedApi>,
    storage: Arc<MemoryStorage>,
    loader: EffortLoader<ScriptedApi>,
    rx: mpsc::UnboundedReceiver<Event>,
  }

  fn harness(responses: Vec<Result<Vec<Effort>, FetchError>>) -> Harness {
    let api = ScriptedApi::new(responses);
    let storage = Arc::new(MemoryStorage::default());
    let cache = CacheStore::new(storage.clone());
    let (tx, rx) = mpsc::unbounded_channel();
    let loader = EffortLoader::new(api.clone(), cache, tx);
    Harness {
      api,
      storage,
      loader,
      rx,
    }
  }

  fn drain(rx: &mut mpsc::UnboundedReceiver<Event>) -> Vec<LoadEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
      if let Event::Load(e) = event {
        events.push(e);
      }
    }
    events
  }

  fn cached_count(h: &Harness, segment_id: u64) -> Option<usize> {
    CacheStore::new(h.storage.clone())
      .get::<Vec<Effort>>(CacheKey::efforts(segment_id))
      .map(|r| r.payload.len())
  }

  #[tokio::test]
  async fn test_fresh_cache_served_then_refreshed() {
    let mut h = harness(vec![Ok(efforts(5))]);
    CacheStore::new(h.storage.clone()).put(CacheKey::efforts(42), &efforts(3));

    let load = h.loader.load(42);
    assert_eq!(load.cached.as_ref().map(Vec::len), Some(3));

    let outcome = load.handle.await;
    match outcome {
      LoadOutcome::Success {
        efforts,
        refreshed,
        fallback,
      } => {
        assert_eq!(efforts.len(), 5);
        assert!(refreshed);
        assert!(!fallback);
      }
      other => panic!("unexpected outcome: {:?}", other),
    }

    assert_eq!(cached_count(&h, 42), Some(5));
    let events = drain(&mut h.rx);
    assert_eq!(
      events,
      vec![
        LoadEvent::ServedFromCache {
          segment_id: 42,
          count: 3
        },
        LoadEvent::Refreshed { count: 5 },
        LoadEvent::Settled,
      ]
    );
  }

  #[tokio::test]
  async fn test_empty_cache_loads_from_network() {
    let mut h = harness(vec![Ok(efforts(2))]);

    let load = h.loader.load(7);
    assert!(load.cached.is_none());

    let outcome = load.handle.await;
    assert!(matches!(
      outcome,
      LoadOutcome::Success {
        refreshed: false,
        ..
      }
    ));
    assert_eq!(cached_count(&h, 7), Some(2));

    let events = drain(&mut h.rx);
    assert_eq!(events[0], LoadEvent::Loading { segment_id: 7 });
    assert!(events.contains(&LoadEvent::Loaded { count: 2 }));
  }

  #[tokio::test]
  async fn test_stale_cache_is_not_served() {
    let mut h = harness(vec![Ok(efforts(1))]);
    let stored_at = (Utc::now() - ChronoDuration::hours(25)).to_rfc3339_opts(SecondsFormat::Millis, true);
    let envelope = serde_json::json!({ "efforts": efforts(3), "timestamp": stored_at });
    h.storage
      .set_item("efforts_42", &envelope.to_string())
      .unwrap();

    let load = h.loader.load(42);
    assert!(load.cached.is_none());
    load.handle.await;

    assert_eq!(drain(&mut h.rx)[0], LoadEvent::Loading { segment_id: 42 });
  }

  #[tokio::test]
  async fn test_zero_window_never_serves_cache() {
    let h = harness(vec![Ok(efforts(1))]);
    CacheStore::new(h.storage.clone()).put(CacheKey::efforts(42), &efforts(3));
    let loader = h.loader.clone().with_policy(FreshnessPolicy::from_hours(0));

    assert!(loader.cached_efforts(42).is_none());
    assert!(h.loader.cached_efforts(42).is_some());
  }

  #[tokio::test]
  async fn test_empty_cached_list_counts_as_missing() {
    let h = harness(vec![Ok(efforts(1))]);
    CacheStore::new(h.storage.clone()).put(CacheKey::efforts(42), &Vec::<Effort>::new());

    let load = h.loader.load(42);
    assert!(load.cached.is_none());
    assert!(matches!(
      load.handle.await,
      LoadOutcome::Success {
        refreshed: false,
        ..
      }
    ));
  }

  #[tokio::test]
  async fn test_cache_write_failure_still_succeeds() {
    let api = ScriptedApi::new(vec![Ok(efforts(3))]);
    let storage = Arc::new(FailingStorage::default());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let loader = EffortLoader::new(api, CacheStore::new(storage.clone()), tx);

    let load = loader.load(42);
    assert!(load.cached.is_none());

    match load.handle.await {
      LoadOutcome::Success {
        efforts, refreshed, ..
      } => {
        assert_eq!(efforts.len(), 3);
        assert!(!refreshed);
      }
      other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(storage.write_attempts(), 1);
    assert!(drain(&mut rx).contains(&LoadEvent::Loaded { count: 3 }));
  }

  #[tokio::test]
  async fn test_try_outcome_once_finished() {
    let h = harness(vec![Ok(efforts(2))]);
    let mut handle = h.loader.load(42).handle;

    let outcome = loop {
      if let Some(outcome) = handle.try_outcome() {
        break outcome;
      }
      tokio::task::yield_now().await;
    };
    assert!(matches!(outcome, LoadOutcome::Success { .. }));
  }

  #[tokio::test]
  async fn test_no_efforts_signal() {
    let mut h = harness(vec![Ok(Vec::new())]);

    h.loader.load(42).handle.await;

    assert!(drain(&mut h.rx).contains(&LoadEvent::NoEfforts));
  }

  #[tokio::test(start_paused = true)]
  async fn test_rate_limit_switches_to_fallback_and_retries_once() {
    let mut h = harness(vec![
      Err(FetchError::RateLimited { message: None }),
      Ok(efforts(4)),
    ]);
    let start = tokio::time::Instant::now();

    let outcome = h.loader.load(42).handle.await;

    assert!(start.elapsed() >= RETRY_DELAY);
    assert_eq!(h.api.calls(), vec![(42, false), (42, true)]);
    assert!(h.loader.fallback_mode());
    assert!(matches!(
      outcome,
      LoadOutcome::Success {
        fallback: true,
        refreshed: false,
        ..
      }
    ));

    let events = drain(&mut h.rx);
    assert!(events.contains(&LoadEvent::FallbackEnabled));
    assert!(events.contains(&LoadEvent::FallbackNotice));
    assert!(!events.iter().any(|e| matches!(e, LoadEvent::Failed(_))));
  }

  #[tokio::test(start_paused = true)]
  async fn test_second_rate_limit_does_not_retry_again() {
    let mut h = harness(vec![
      Err(FetchError::RateLimited { message: None }),
      Err(FetchError::RateLimited {
        message: Some("Too many requests".into()),
      }),
    ]);

    let outcome = h.loader.load(42).handle.await;

    assert_eq!(h.api.calls().len(), 2);
    assert!(matches!(
      outcome,
      LoadOutcome::Error(FetchError::RateLimited { .. })
    ));
    assert!(drain(&mut h.rx).contains(&LoadEvent::Failed("Too many requests".into())));
  }

  #[tokio::test(start_paused = true)]
  async fn test_fallback_mode_persists_for_later_loads() {
    let h = harness(vec![
      Err(FetchError::RateLimited { message: None }),
      Ok(efforts(1)),
      Ok(efforts(1)),
    ]);

    h.loader.load(42).handle.await;
    h.loader.load(43).handle.await;

    assert_eq!(h.api.calls(), vec![(42, false), (42, true), (43, true)]);
  }

  #[tokio::test]
  async fn test_server_error_with_cache_degrades() {
    let mut h = harness(vec![Err(FetchError::remote(Some(500), None))]);
    let cache = CacheStore::new(h.storage.clone());
    cache.put(CacheKey::efforts(42), &efforts(3));
    let before = cache.get::<Vec<Effort>>(CacheKey::efforts(42)).unwrap();

    let load = h.loader.load(42);
    assert_eq!(load.cached.as_ref().map(Vec::len), Some(3));

    let outcome = load.handle.await;
    assert!(matches!(outcome, LoadOutcome::Degraded { .. }));

    let after = cache.get::<Vec<Effort>>(CacheKey::efforts(42)).unwrap();
    assert_eq!(after, before);

    let events = drain(&mut h.rx);
    assert!(events.contains(&LoadEvent::RefreshFailed));
    assert!(!events.iter().any(|e| matches!(e, LoadEvent::Failed(_))));
  }

  #[tokio::test]
  async fn test_rate_limit_with_cache_degrades_without_fallback() {
    let h = harness(vec![Err(FetchError::RateLimited { message: None })]);
    CacheStore::new(h.storage.clone()).put(CacheKey::efforts(42), &efforts(3));

    let outcome = h.loader.load(42).handle.await;

    assert!(matches!(outcome, LoadOutcome::Degraded { .. }));
    assert!(!h.loader.fallback_mode());
    assert_eq!(h.api.calls().len(), 1);
  }

  #[tokio::test]
  async fn test_server_error_without_cache_fails() {
    let mut h = harness(vec![Err(FetchError::remote(
      Some(500),
      Some("Failed to fetch efforts".into()),
    ))]);

    let outcome = h.loader.load(42).handle.await;

    assert!(matches!(
      outcome,
      LoadOutcome::Error(FetchError::Remote {
        status: Some(500),
        ..
      })
    ));
    assert!(drain(&mut h.rx).contains(&LoadEvent::Failed("Failed to fetch efforts".into())));
    assert_eq!(cached_count(&h, 42), None);
  }

  #[tokio::test(start_paused = true)]
  async fn test_session_expired_schedules_reload_without_retry() {
    let mut h = harness(vec![Err(FetchError::from_response(
      401,
      Some("Not authenticated".into()),
      true,
    ))]);

    let outcome = h.loader.load(42).handle.await;
    assert!(matches!(
      outcome,
      LoadOutcome::Error(FetchError::SessionExpired { .. })
    ));

    let events = drain(&mut h.rx);
    assert!(events.contains(&LoadEvent::SessionExpired));
    assert!(!events.contains(&LoadEvent::ReloadRequested));

    let reload = tokio::time::timeout(std::time::Duration::from_secs(5), async {
      loop {
        match h.rx.recv().await {
          Some(Event::Load(LoadEvent::ReloadRequested)) => return true,
          Some(_) => continue,
          None => return false,
        }
      }
    })
    .await;

    assert!(matches!(reload, Ok(true)));
    assert_eq!(h.api.calls(), vec![(42, false)]);
  }
}
