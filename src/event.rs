use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::segments::types::CacheStats;

/// Signals emitted while loading the efforts of a segment
#[derive(Debug, Clone, PartialEq)]
pub enum LoadEvent {
  /// Fresh cached efforts were handed to the caller; a refresh follows
  ServedFromCache { segment_id: u64, count: usize },
  /// Nothing usable cached; the caller has to wait for the network
  Loading { segment_id: u64 },
  /// Network data replaced efforts served from cache
  Refreshed { count: usize },
  /// Network data arrived with nothing served beforehand
  Loaded { count: usize },
  /// The segment has no efforts
  NoEfforts,
  /// Data was fetched in fallback mode
  FallbackNotice,
  /// Refresh failed; cached efforts stay on screen
  RefreshFailed,
  /// Rate limited; switching to fallback mode and retrying
  FallbackEnabled,
  /// The backend asked for reauthentication
  SessionExpired,
  /// Time to reload the whole view
  ReloadRequested,
  /// Load failed with nothing to show
  Failed(String),
  /// The remote phase of a load is over
  Settled,
}

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for redraws and polling pending loads
  Tick,
  Load(LoadEvent),
  /// Server cache statistics arrived
  Stats(CacheStats),
  /// A background task failed
  Error(String),
}

/// Event channel fed by terminal input, the loader and background tasks
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  pub fn new() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self { tx, rx }
  }

  /// Sender for producers of events
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Forward terminal key presses into the channel, with a tick whenever
  /// `tick_rate` passes without input.
  ///
  /// The reader stops once the receiving side is gone.
  pub fn start_input(&self, tick_rate: Duration) {
    let tx = self.tx.clone();

    tokio::task::spawn_blocking(move || loop {
      let event = match event::poll(tick_rate) {
        Ok(true) => match event::read() {
          Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Event::Key(key),
          // Resizes and focus changes just need a redraw
          Ok(_) => Event::Tick,
          Err(e) => Event::Error(format!("Failed to read terminal input: {}", e)),
        },
        Ok(false) => Event::Tick,
        Err(e) => Event::Error(format!("Failed to poll terminal input: {}", e)),
      };

      if tx.send(event).is_err() {
        break;
      }
    });
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }

  /// Take every event that is already queued
  pub fn drain(&mut self) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = self.rx.try_recv() {
      events.push(event);
    }
    events
  }
}

impl Default for EventHandler {
  fn default() -> Self {
    Self::new()
  }
}
