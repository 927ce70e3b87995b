use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};
use std::sync::Arc;
use tracing::{info, warn};

use super::{HistoryView, ViewContext};
use crate::error::FetchError;
use crate::event::{Event, EventHandler, LoadEvent};
use crate::filters::{EffortFilter, EffortStats, SortField, SortState};
use crate::history::RecencyEntry;
use crate::loader::{EffortLoader, LoadOutcome, RevalidateHandle};
use crate::segments::types::{CacheStats, Effort, SegmentSummary};
use crate::segments::EffortsApi;
use crate::ui::components::{FilterEvent, FilterForm, KeyResult};
use crate::ui::notice;
use crate::ui::renderfns::{
  cache_stats_line, clamp_selection, format_date, format_km, format_reading, format_time,
  notice_color, truncate,
};
use crate::ui::view::{Shortcut, View, ViewAction};

/// Other recent segments listed under the table
const RECENT_STRIP_LEN: usize = 5;

const NO_EFFORTS: &str =
  "No efforts found. You haven't completed this segment yet, or Strava is still syncing your activities.";

/// Where the efforts on screen came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataSource {
  Cache,
  Network,
  Fallback,
}

#[derive(Debug, Clone)]
struct Notice {
  text: String,
  color: Color,
}

/// Efforts of one segment: cached first, refreshed in the background,
/// filtered and sorted on the client
pub struct EffortsView<A> {
  ctx: ViewContext<A>,
  segment: SegmentSummary,
  loader: EffortLoader<A>,
  /// Loader events for this view only
  events: EventHandler,
  pending: Option<RevalidateHandle>,
  /// Everything loaded, before filtering
  efforts: Vec<Effort>,
  shown: Vec<Effort>,
  source: Option<DataSource>,
  filter: EffortFilter,
  sort: SortState,
  table_state: TableState,
  filter_form: FilterForm,
  refreshing: bool,
  notice: Option<Notice>,
  error: Option<String>,
  no_efforts: bool,
  reloads: u32,
  recent: Vec<RecencyEntry>,
  server_stats: Option<CacheStats>,
}

impl<A: EffortsApi> EffortsView<A> {
  /// Record the visit and start loading
  pub fn new(
    ctx: ViewContext<A>,
    segment: SegmentSummary,
    filter: EffortFilter,
    sort: SortState,
  ) -> Self {
    ctx.record_visit(&segment);
    let events = EventHandler::new();
    let loader = build_loader(&ctx, &events);
    let recent = ctx.history.recent_excluding(segment.id, RECENT_STRIP_LEN);

    let mut view = Self {
      ctx,
      segment,
      loader,
      events,
      pending: None,
      efforts: Vec::new(),
      shown: Vec::new(),
      source: None,
      filter,
      sort,
      table_state: TableState::default(),
      filter_form: FilterForm::new(),
      refreshing: false,
      notice: None,
      error: None,
      no_efforts: false,
      reloads: 0,
      recent,
      server_stats: None,
    };
    view.load();
    view
  }

  fn load(&mut self) {
    let load = self.loader.load(self.segment.id);
    if let Some(cached) = load.cached {
      self.efforts = cached;
      self.source = Some(DataSource::Cache);
      self.apply();
    }
    self.pending = Some(load.handle);
    self.refreshing = true;
    self.no_efforts = false;
  }

  /// Start over with a new loader, out of fallback mode
  fn reload(&mut self) {
    if self.reloads >= self.ctx.max_reloads {
      warn!(segment_id = self.segment.id, reloads = self.reloads, "reload limit reached");
      return;
    }
    self.reloads += 1;
    info!(segment_id = self.segment.id, reloads = self.reloads, "reloading after session expiry");

    self.loader = build_loader(&self.ctx, &self.events);
    self.efforts.clear();
    self.source = None;
    self.error = None;
    self.apply();
    self.load();
  }

  fn set_filter(&mut self, filter: EffortFilter) {
    self.filter = filter;
    self.apply();
  }

  /// Re-run filter and sort over everything loaded
  fn apply(&mut self) {
    let mut shown = self.filter.apply(&self.efforts);
    self.sort.sort(&mut shown);
    self.shown = shown;
    self
      .table_state
      .select(clamp_selection(self.table_state.selected(), self.shown.len()));
  }

  fn on_load_event(&mut self, event: LoadEvent) {
    match &event {
      LoadEvent::ServedFromCache { .. } | LoadEvent::Loading { .. } => self.refreshing = true,
      LoadEvent::NoEfforts => self.no_efforts = true,
      LoadEvent::Settled => self.refreshing = false,
      LoadEvent::ReloadRequested => {
        self.reload();
        return;
      }
      _ => {}
    }

    if let Some(text) = notice(&event) {
      self.notice = Some(Notice {
        text,
        color: notice_color(&event),
      });
    }
  }

  fn on_outcome(&mut self, outcome: LoadOutcome) {
    let segment_id = self.segment.id;
    match outcome {
      LoadOutcome::Success {
        efforts,
        refreshed,
        fallback,
      } => {
        info!(segment_id, refreshed, fallback, count = efforts.len(), "efforts ready");
        if self.segment.distance.is_none() {
          if let Some(first) = efforts.first() {
            self.segment.distance = Some(first.distance);
            self.ctx.record_visit(&self.segment);
          }
        }

        self.efforts = efforts;
        self.source = Some(if fallback {
          DataSource::Fallback
        } else {
          DataSource::Network
        });
        self.error = None;
        self.apply();
      }
      LoadOutcome::Degraded { reason } => {
        info!(segment_id, reason = %reason, "kept cached efforts");
      }
      // A reload request follows
      LoadOutcome::Error(FetchError::SessionExpired { .. })
        if self.reloads < self.ctx.max_reloads => {}
      LoadOutcome::Error(e) => {
        warn!(segment_id, status = ?e.status(), "no efforts to show");
        self.error = Some(e.to_string());
      }
    }
  }

  fn render_summary(&self, frame: &mut Frame, area: Rect) {
    let mut details = vec![self.segment.name.clone()];
    if let Some(distance) = self.segment.distance {
      details.push(format_km(distance));
    }
    if let Some(city) = &self.segment.city {
      details.push(city.clone());
    }

    let block = Block::default()
      .title(format!(" {} ", details.join(" • ")))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let stats_line = match EffortStats::compute(&self.shown) {
      Some(stats) => stats_line(&stats),
      None => Line::from(Span::styled(
        "No statistics",
        Style::default().fg(Color::DarkGray),
      )),
    };

    let mut status = Vec::new();
    if self.refreshing {
      status.push(Span::styled(
        "Refreshing... ",
        Style::default().fg(Color::Yellow).bold(),
      ));
    }
    if let (Some(error), false) = (&self.error, self.efforts.is_empty()) {
      status.push(Span::styled(
        format!("Error: {}", error),
        Style::default().fg(Color::Red),
      ));
    } else if let Some(notice) = &self.notice {
      status.push(Span::styled(
        notice.text.as_str(),
        Style::default().fg(notice.color),
      ));
    }

    let paragraph = Paragraph::new(vec![stats_line, Line::from(status)]).block(block);
    frame.render_widget(paragraph, area);
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let source = match self.source {
      Some(DataSource::Cache) => " (cached)",
      Some(DataSource::Fallback) => " (fallback: activity-level heart rate)",
      Some(DataSource::Network) | None => "",
    };
    let block = Block::default()
      .title(format!(
        " Efforts ({} of {}){} ",
        self.shown.len(),
        self.efforts.len(),
        source
      ))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.shown.is_empty() {
      let (content, color) = if !self.efforts.is_empty() {
        (
          "No efforts match the current filters. Press c to clear them.".to_string(),
          Color::DarkGray,
        )
      } else if let Some(error) = &self.error {
        (format!("Error: {}", error), Color::Red)
      } else if self.no_efforts {
        (NO_EFFORTS.to_string(), Color::DarkGray)
      } else {
        ("Loading efforts...".to_string(), Color::DarkGray)
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: true });
      frame.render_widget(paragraph, area);
      return;
    }

    self
      .table_state
      .select(clamp_selection(self.table_state.selected(), self.shown.len()));

    let arrow = self.sort.direction.arrow();
    let header = Row::new(COLUMNS.iter().map(|(title, field)| {
      if *field == Some(self.sort.field) {
        Cell::from(format!("{} {}", title, arrow)).style(Style::default().fg(Color::Yellow).bold())
      } else {
        Cell::from(*title).style(Style::default().fg(Color::Cyan))
      }
    }));

    let rows = self.shown.iter().map(|effort| {
      Row::new(vec![
        Cell::from(format_date(&effort.start_date)),
        Cell::from(truncate(&effort.name, 40)),
        Cell::from(format_time(effort.elapsed_time)),
        Cell::from(effort.moving_time.map_or_else(|| "N/A".to_string(), format_time)),
        Cell::from(format_reading(effort.average_heartrate, "bpm")),
        Cell::from(format_reading(effort.max_heartrate, "bpm")),
        Cell::from(format_reading(effort.average_watts, "W")),
        Cell::from(format_reading(effort.vam, "m/h")),
      ])
    });

    let widths = [
      Constraint::Length(13),
      Constraint::Min(20),
      Constraint::Length(9),
      Constraint::Length(9),
      Constraint::Length(10),
      Constraint::Length(10),
      Constraint::Length(9),
      Constraint::Length(10),
    ];

    let table = Table::new(rows, widths)
      .header(header)
      .block(block)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }

  fn render_status_lines(&self, frame: &mut Frame, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);
    let mut lines = vec![Line::from(Span::styled(filter_summary(&self.filter), dim))];

    if !self.recent.is_empty() {
      let names: Vec<String> = self
        .recent
        .iter()
        .map(|e| format!("{} ({})", truncate(&e.name, 25), e.id))
        .collect();
      lines.push(Line::from(vec![
        Span::styled("Recent: ", Style::default().fg(Color::Cyan)),
        Span::styled(names.join(" | "), dim),
      ]));
    }
    if let Some(stats) = &self.server_stats {
      lines.push(Line::from(Span::styled(cache_stats_line(stats), dim)));
    }

    frame.render_widget(Paragraph::new(lines), area);
  }
}

fn build_loader<A: EffortsApi>(ctx: &ViewContext<A>, events: &EventHandler) -> EffortLoader<A> {
  EffortLoader::new(Arc::clone(&ctx.api), ctx.cache.clone(), events.sender()).with_policy(ctx.policy)
}

/// Table columns and the sort field each one shows
const COLUMNS: [(&str, Option<SortField>); 8] = [
  ("Date", Some(SortField::StartDate)),
  ("Activity", Some(SortField::Name)),
  ("Time", Some(SortField::ElapsedTime)),
  ("Moving", None),
  ("Avg HR", Some(SortField::AverageHeartrate)),
  ("Max HR", Some(SortField::MaxHeartrate)),
  ("Power", Some(SortField::AverageWatts)),
  ("VAM", Some(SortField::Vam)),
];

fn stats_line(stats: &EffortStats) -> Line<'static> {
  let optional = |value: Option<u64>, unit: &str| match value {
    Some(v) => format!("{} {}", v, unit),
    None => "N/A".to_string(),
  };
  let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));

  Line::from(vec![
    label("Efforts "),
    Span::raw(stats.total_efforts.to_string()),
    label("  Best "),
    Span::styled(format_time(stats.best_time), Style::default().fg(Color::Green).bold()),
    label("  Average "),
    Span::raw(format_time(stats.avg_time)),
    label("  Avg HR "),
    Span::raw(optional(stats.avg_heartrate, "bpm")),
    label("  Avg power "),
    Span::raw(optional(stats.avg_power, "W")),
    label("  Avg VAM "),
    Span::raw(optional(stats.avg_vam, "m/h")),
  ])
}

fn filter_summary(filter: &EffortFilter) -> String {
  if !filter.is_active() {
    return "Filters: none".to_string();
  }

  let range = |name: &str, min: Option<f64>, max: Option<f64>, unit: &str| match (min, max) {
    (Some(min), Some(max)) => Some(format!("{} {}-{}{}", name, min, max, unit)),
    (Some(min), None) => Some(format!("{} >= {}{}", name, min, unit)),
    (None, Some(max)) => Some(format!("{} <= {}{}", name, max, unit)),
    (None, None) => None,
  };
  let dates = match (filter.start_date, filter.end_date) {
    (Some(start), Some(end)) => Some(format!("{} to {}", start, end)),
    (Some(start), None) => Some(format!("from {}", start)),
    (None, Some(end)) => Some(format!("until {}", end)),
    (None, None) => None,
  };

  let parts: Vec<String> = [
    range("HR", filter.min_heartrate, filter.max_heartrate, " bpm"),
    range("Power", filter.min_power, filter.max_power, " W"),
    dates,
  ]
  .into_iter()
  .flatten()
  .collect();
  format!("Filters: {}", parts.join(" · "))
}

impl<A: EffortsApi> View for EffortsView<A> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.filter_form.handle_key(key) {
      KeyResult::Handled => return ViewAction::None,
      KeyResult::Event(
        FilterEvent::Changed(filter) | FilterEvent::Submitted(filter) | FilterEvent::Cancelled(filter),
      ) => {
        self.set_filter(filter);
        return ViewAction::None;
      }
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char(c @ '1'..='7') => {
        let index = c.to_digit(10).map_or(0, |d| d as usize - 1);
        if let Some(field) = SortField::all_variants().get(index) {
          self.sort.toggle(*field);
          self.apply();
        }
      }
      KeyCode::Char('s') => {
        self.sort.toggle(self.sort.field);
        self.apply();
      }
      KeyCode::Char('f') | KeyCode::Char('/') => self.filter_form.open(&self.filter),
      KeyCode::Char('d') => self.set_filter(EffortFilter::defaults(Utc::now().date_naive())),
      KeyCode::Char('c') => self.set_filter(EffortFilter::default()),
      KeyCode::Char('r') => self.load(),
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Enter => {
        let selected = self.table_state.selected().and_then(|i| self.shown.get(i));
        if let Some(effort) = selected {
          self.notice = Some(Notice {
            text: format!("https://www.strava.com/activities/{}", effort.activity_id),
            color: Color::Cyan,
          });
        }
      }
      KeyCode::Char('h') => return ViewAction::Push(Box::new(HistoryView::new(self.ctx.clone()))),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::vertical([
      Constraint::Length(4),
      Constraint::Min(3),
      Constraint::Length(3),
    ])
    .split(area);

    self.render_summary(frame, chunks[0]);
    self.render_table(frame, chunks[1]);
    self.render_status_lines(frame, chunks[2]);
    self.filter_form.render_overlay(frame, chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    truncate(&self.segment.name, 30)
  }

  fn tick(&mut self) {
    for event in self.events.drain() {
      if let Event::Load(load_event) = event {
        self.on_load_event(load_event);
      }
    }

    let outcome = self.pending.as_mut().and_then(RevalidateHandle::try_outcome);
    if let Some(outcome) = outcome {
      self.pending = None;
      self.on_outcome(outcome);
    }
  }

  fn on_event(&mut self, event: &Event) {
    if let Event::Stats(stats) = event {
      self.server_stats = Some(stats.clone());
    }
  }

  fn on_focus(&mut self) {
    self.recent = self
      .ctx
      .history
      .recent_excluding(self.segment.id, RECENT_STRIP_LEN);
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    if self.filter_form.is_active() {
      return vec![
        Shortcut::new("tab", "next field"),
        Shortcut::new("enter", "apply"),
        Shortcut::new("esc", "cancel"),
      ];
    }
    vec![
      Shortcut::new("1-7", "sort"),
      Shortcut::new("s", "flip"),
      Shortcut::new("f", "filter"),
      Shortcut::new("d", "defaults"),
      Shortcut::new("c", "clear"),
      Shortcut::new("r", "refresh"),
      Shortcut::new("h", "history"),
      Shortcut::new("q", "back"),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheKey, CacheStore, FreshnessPolicy, MemoryStorage};
  use crate::filters::SortDirection;
  use crate::history::SegmentHistory;
  use crate::loader::RELOAD_DELAY;
  use crate::ui::render_to_string;
  use chrono::TimeZone;
  use crossterm::event::KeyModifiers;
  use std::future::Future;
  use std::time::Duration;

  /// Backend answering every request the same way
  struct FixedApi {
    result: Result<Vec<Effort>, FetchError>,
  }

  impl EffortsApi for FixedApi {
    fn segment_efforts(
      &self,
      _segment_id: u64,
      _fallback: bool,
    ) -> impl Future<Output = Result<Vec<Effort>, FetchError>> + Send {
      let result = self.result.clone();
      async move { result }
    }
  }

  fn effort(id: u64, day: u32, time: u64, hr: Option<f64>) -> Effort {
    Effort {
      id,
      start_date: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap(),
      elapsed_time: time,
      moving_time: Some(time),
      distance: 1500.0,
      average_heartrate: hr,
      max_heartrate: None,
      average_watts: Some(250.0),
      vam: None,
      name: format!("Ride {}", id),
      activity_id: 900 + id,
    }
  }

  fn sample() -> Vec<Effort> {
    vec![
      effort(1, 1, 421, Some(130.0)),
      effort(2, 5, 400, Some(150.0)),
      effort(3, 7, 450, None),
    ]
  }

  fn context(result: Result<Vec<Effort>, FetchError>) -> ViewContext<FixedApi> {
    let storage = Arc::new(MemoryStorage::default());
    ViewContext {
      api: Arc::new(FixedApi { result }),
      cache: CacheStore::new(storage.clone()),
      history: SegmentHistory::new(storage),
      policy: FreshnessPolicy::default(),
      max_reloads: 1,
    }
  }

  fn view(ctx: ViewContext<FixedApi>) -> EffortsView<FixedApi> {
    EffortsView::new(
      ctx,
      SegmentSummary::unnamed(42),
      EffortFilter::default(),
      SortState::default(),
    )
  }

  fn key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
  }

  fn text(view: &mut EffortsView<FixedApi>) -> String {
    render_to_string(120, 24, |frame| {
      let area = frame.area();
      view.render(frame, area)
    })
  }

  async fn settle(view: &mut EffortsView<FixedApi>) {
    for _ in 0..100 {
      view.tick();
      if view.pending.is_none() && !view.refreshing {
        return;
      }
      tokio::task::yield_now().await;
    }
    panic!("load did not settle");
  }

  fn ids(efforts: &[Effort]) -> Vec<u64> {
    efforts.iter().map(|e| e.id).collect()
  }

  #[tokio::test]
  async fn test_cached_efforts_then_refresh_indicator_clears() {
    let ctx = context(Ok(sample()));
    ctx.cache.put(CacheKey::efforts(42), &sample()[..2].to_vec());

    let mut view = view(ctx);
    assert_eq!(view.source, Some(DataSource::Cache));
    assert_eq!(view.efforts.len(), 2);
    assert!(text(&mut view).contains("Refreshing..."));

    settle(&mut view).await;
    assert_eq!(view.source, Some(DataSource::Network));
    let screen = text(&mut view);
    assert!(!screen.contains("Refreshing"));
    assert!(screen.contains("Data refreshed (3 efforts)"));
    assert!(screen.contains("Efforts (3 of 3)"));
    assert!(screen.contains("Mar 7, 2024"));
  }

  #[tokio::test]
  async fn test_number_keys_toggle_sort() {
    let mut view = view(context(Ok(sample())));
    settle(&mut view).await;
    assert_eq!(ids(&view.shown), vec![3, 2, 1]);

    view.handle_key(key('3'));
    assert_eq!(
      view.sort,
      SortState::new(SortField::ElapsedTime, SortDirection::Desc)
    );
    assert_eq!(ids(&view.shown), vec![3, 1, 2]);

    view.handle_key(key('3'));
    assert_eq!(view.sort.direction, SortDirection::Asc);
    assert_eq!(ids(&view.shown), vec![2, 1, 3]);
    assert!(text(&mut view).contains("Time ▲"));

    // Missing heart rate stays last
    view.handle_key(key('4'));
    assert_eq!(ids(&view.shown), vec![2, 1, 3]);
  }

  #[tokio::test]
  async fn test_filter_form_applies_while_typing() {
    let mut view = view(context(Ok(sample())));
    settle(&mut view).await;

    view.handle_key(key('f'));
    for c in "140".chars() {
      view.handle_key(key(c));
    }
    assert_eq!(view.filter.min_heartrate, Some(140.0));
    assert_eq!(ids(&view.shown), vec![2]);
    assert_eq!(view.shortcuts()[0], Shortcut::new("tab", "next field"));
    assert!(text(&mut view).contains("Filters: HR >= 140 bpm"));

    view.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
    assert_eq!(view.filter, EffortFilter::default());
    assert_eq!(view.shown.len(), 3);
  }

  #[tokio::test]
  async fn test_defaults_key_ends_on_utc_today() {
    let mut view = view(context(Ok(sample())));
    view.handle_key(key('d'));
    assert_eq!(view.filter, EffortFilter::defaults(Utc::now().date_naive()));

    view.handle_key(key('c'));
    assert!(!view.filter.is_active());
  }

  #[tokio::test]
  async fn test_no_efforts_message() {
    let mut view = view(context(Ok(Vec::new())));
    settle(&mut view).await;

    assert!(view.no_efforts);
    assert!(text(&mut view).contains("No efforts found."));
  }

  #[tokio::test]
  async fn test_error_without_cache() {
    let mut view = view(context(Err(FetchError::remote(
      Some(500),
      Some("Failed to fetch efforts".into()),
    ))));
    settle(&mut view).await;

    assert!(text(&mut view).contains("Error: Failed to fetch efforts"));
  }

  #[tokio::test(start_paused = true)]
  async fn test_session_expiry_reloads_once() {
    let expired = FetchError::from_response(401, Some("Not authenticated".into()), true);
    let mut view = view(context(Err(expired)));

    settle(&mut view).await;
    assert!(view.error.is_none());

    tokio::time::sleep(RELOAD_DELAY + Duration::from_millis(10)).await;
    view.tick();
    assert_eq!(view.reloads, 1);

    settle(&mut view).await;
    tokio::time::sleep(RELOAD_DELAY + Duration::from_millis(10)).await;
    view.tick();
    assert_eq!(view.reloads, 1);
    assert_eq!(
      view.error.as_deref(),
      Some("Session expired: Not authenticated")
    );
  }

  #[tokio::test]
  async fn test_enter_shows_activity_link() {
    let mut view = view(context(Ok(sample())));
    settle(&mut view).await;

    view.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
    assert!(text(&mut view).contains("https://www.strava.com/activities/903"));
  }

  #[tokio::test]
  async fn test_server_stats_and_visit_recorded() {
    let ctx = context(Ok(sample()));
    let history = ctx.history.clone();
    let mut view = view(ctx);
    settle(&mut view).await;

    view.on_event(&Event::Stats(CacheStats {
      total_files: 3,
      total_size: 1536,
      ..Default::default()
    }));
    assert!(text(&mut view).contains("Server cache: 3 files, 1.5 KB"));

    let entry = &history.entries()[0];
    assert_eq!(entry.id, 42);
    assert_eq!(entry.distance, Some(1500.0));
  }

  #[test]
  fn test_filter_summary() {
    assert_eq!(filter_summary(&EffortFilter::default()), "Filters: none");
    let today = chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    assert_eq!(
      filter_summary(&EffortFilter::defaults(today)),
      "Filters: HR 125-140 bpm · Power 200-350 W · 2020-01-01 to 2024-06-01"
    );
  }
}
