use crate::cache::{
  is_fresh, CacheKey, CacheStorage, CacheStore, EntityKind, FreshnessPolicy, MemoryStorage,
  NoopStorage, SqliteStorage,
};
use crate::commands::{CacheAction, Command, EffortsArgs, HistoryAction};
use crate::config::{CacheConfig, Config};
use crate::event::{Event, EventHandler};
use crate::history::SegmentHistory;
use crate::segments::client::SegmentClient;
use crate::ui;
use crate::ui::renderfns::cache_stats_line;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{EffortsView, HistoryView, ViewContext};
use chrono::Utc;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Terminal input is polled this often; every view ticks at the same rate
const TICK_RATE: Duration = Duration::from_millis(250);

/// Main application state
pub struct App {
  /// Application configuration
  config: Config,

  /// Backend client
  client: Arc<SegmentClient>,

  /// Local cache of efforts and segment summaries
  cache: CacheStore,

  /// Recently viewed segments
  history: SegmentHistory,

  /// Terminal input, ticks and background task results
  events: EventHandler,

  /// Open views, the one on screen last
  view_stack: Vec<Box<dyn View>>,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let client = Arc::new(SegmentClient::new(&config)?);
    let (storage, cache) = open_cache(&config.cache);
    let history = SegmentHistory::new(storage);

    Ok(Self {
      config,
      client,
      cache,
      history,
      events: EventHandler::new(),
      view_stack: Vec::new(),
      should_quit: false,
    })
  }

  pub async fn run(&mut self, command: Command) -> Result<()> {
    match command {
      Command::Efforts(args) => {
        let view = self.efforts_view(&args);
        self.run_tui(Box::new(view)).await
      }
      Command::History { action: None } => {
        let view = HistoryView::new(self.context());
        self.run_tui(Box::new(view)).await
      }
      Command::History {
        action: Some(HistoryAction::Clear),
      } => {
        self.history.clear();
        println!("History cleared");
        Ok(())
      }
      Command::Cache {
        action: CacheAction::Stats,
      } => self.show_cache_stats().await,
      Command::Cache {
        action: CacheAction::Clear { local: true },
      } => {
        let removed = self.cache.clear();
        println!("Removed {} local cache records", removed);
        Ok(())
      }
      Command::Cache {
        action: CacheAction::Clear { local: false },
      } => {
        let message = self.client.clear_cache().await?;
        println!("{}", message);
        Ok(())
      }
    }
  }

  fn context(&self) -> ViewContext<SegmentClient> {
    ViewContext {
      api: Arc::clone(&self.client),
      cache: self.cache.clone(),
      history: self.history.clone(),
      policy: FreshnessPolicy::from_hours(self.config.cache.freshness_hours),
      max_reloads: self.config.session.max_reloads,
    }
  }

  fn efforts_view(&self, args: &EffortsArgs) -> EffortsView<SegmentClient> {
    let ctx = self.context();
    let mut segment = ctx.segment_summary(args.segment_id);
    if let Some(name) = &args.name {
      segment.name = name.clone();
    }
    EffortsView::new(
      ctx,
      segment,
      args.filter(Utc::now().date_naive()),
      args.sort_state(),
    )
  }

  async fn run_tui(&mut self, root: Box<dyn View>) -> Result<()> {
    self.view_stack = vec![root];
    self.load_stats();
    self.events.start_input(TICK_RATE);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let server_url = self.config.server.url.clone();
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, &mut self.view_stack, &server_url))?;

      match self.events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {
        for view in &mut self.view_stack {
          view.tick();
        }
      }
      Event::Error(ref e) => {
        warn!(error = %e, "background task failed");
        self.broadcast(&event);
      }
      Event::Stats(_) | Event::Load(_) => self.broadcast(&event),
    }
  }

  fn broadcast(&mut self, event: &Event) {
    for view in &mut self.view_stack {
      view.on_event(event);
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let Some(top) = self.view_stack.last_mut() else {
      self.should_quit = true;
      return;
    };

    match top.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Push(view) => {
        info!(view = %view.breadcrumb_label(), "opening view");
        self.view_stack.push(view);
      }
      ViewAction::Pop => {
        self.view_stack.pop();
        match self.view_stack.last_mut() {
          Some(view) => view.on_focus(),
          None => self.should_quit = true,
        }
      }
    }
  }

  async fn show_cache_stats(&self) -> Result<()> {
    let hours = self.config.cache.freshness_hours;
    let effort_lists = self.cache.record_ids(EntityKind::Efforts);
    let fresh = effort_lists
      .iter()
      .filter_map(|id| self.cache.get::<serde_json::Value>(CacheKey::efforts(*id)))
      .filter(|record| is_fresh(record, hours))
      .count();

    println!(
      "Local cache: {} effort lists ({} fresh), {} segments",
      effort_lists.len(),
      fresh,
      self.cache.record_count(EntityKind::Segment)
    );
    if let Some(archived) = self.cache.archived_count("effort") {
      println!("Archived efforts: {}", archived);
    }

    let stats = self.client.get_cache_stats().await?;
    println!("{}", cache_stats_line(&stats));
    Ok(())
  }

  fn load_stats(&self) {
    let client = Arc::clone(&self.client);
    let tx = self.events.sender();

    tokio::spawn(async move {
      match client.get_cache_stats().await {
        Ok(stats) => {
          let _ = tx.send(Event::Stats(stats));
        }
        Err(e) => {
          let _ = tx.send(Event::Error(format!("Could not load server cache stats: {}", e)));
        }
      }
    });
  }
}

/// Storage for history, and the cache store built on it
fn open_cache(config: &CacheConfig) -> (Arc<dyn CacheStorage>, CacheStore) {
  let (storage, cache) = match SqliteStorage::open(config.path.as_deref()) {
    Ok(sqlite) => {
      let sqlite = Arc::new(sqlite);
      let storage: Arc<dyn CacheStorage> = sqlite.clone();
      (storage.clone(), CacheStore::new(storage).with_archive(sqlite))
    }
    Err(e) => {
      warn!(error = %e, "local cache unavailable, keeping it in memory");
      let storage: Arc<dyn CacheStorage> = Arc::new(MemoryStorage::default());
      (storage.clone(), CacheStore::new(storage))
    }
  };

  if config.enabled {
    (storage, cache)
  } else {
    info!("local cache disabled");
    (storage, CacheStore::new(Arc::new(NoopStorage)))
  }
}
