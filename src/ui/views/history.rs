use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use super::{EffortsView, ViewContext};
use crate::filters::{EffortFilter, SortState};
use crate::history::RecencyEntry;
use crate::segments::types::SegmentSummary;
use crate::segments::EffortsApi;
use crate::ui::renderfns::{clamp_selection, format_km, format_relative_time};
use crate::ui::view::{Shortcut, View, ViewAction};

/// Recently viewed segments; Enter opens one
pub struct HistoryView<A> {
  ctx: ViewContext<A>,
  entries: Vec<RecencyEntry>,
  list_state: ListState,
}

impl<A: EffortsApi> HistoryView<A> {
  pub fn new(ctx: ViewContext<A>) -> Self {
    let mut view = Self {
      ctx,
      entries: Vec::new(),
      list_state: ListState::default(),
    };
    view.reload();
    view
  }

  fn reload(&mut self) {
    self.entries = self.ctx.history.entries();
    self
      .list_state
      .select(clamp_selection(self.list_state.selected(), self.entries.len()));
  }

  fn selected(&self) -> Option<&RecencyEntry> {
    self.list_state.selected().and_then(|i| self.entries.get(i))
  }

  fn move_selection(&mut self, down: bool) {
    if self.entries.is_empty() {
      return;
    }
    let current = self.list_state.selected().unwrap_or(0);
    let next = if down {
      (current + 1).min(self.entries.len() - 1)
    } else {
      current.saturating_sub(1)
    };
    self.list_state.select(Some(next));
  }
}

/// "4.85 km • 396m elevation • Woodside, CA"
fn entry_details(entry: &RecencyEntry) -> String {
  let mut parts = Vec::new();
  if let Some(distance) = entry.distance {
    parts.push(format_km(distance));
  }
  if let Some(gain) = entry.elevation_gain {
    parts.push(format!("{}m elevation", gain.round() as i64));
  }
  let place: Vec<&str> = [entry.city.as_deref(), entry.state.as_deref()]
    .into_iter()
    .flatten()
    .collect();
  if !place.is_empty() {
    parts.push(place.join(", "));
  }
  parts.join(" • ")
}

impl<A: EffortsApi> View for HistoryView<A> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Enter => {
        if let Some(entry) = self.selected() {
          let segment = SegmentSummary {
            id: entry.id,
            name: entry.name.clone(),
            distance: entry.distance,
            elevation_gain: entry.elevation_gain,
            city: entry.city.clone(),
            state: entry.state.clone(),
          };
          let view = EffortsView::new(
            self.ctx.clone(),
            segment,
            EffortFilter::default(),
            SortState::default(),
          );
          return ViewAction::Push(Box::new(view));
        }
      }
      KeyCode::Char('x') => {
        self.ctx.history.clear();
        self.reload();
      }
      KeyCode::Char('r') => self.reload(),
      KeyCode::Char('j') | KeyCode::Down => self.move_selection(true),
      KeyCode::Char('k') | KeyCode::Up => self.move_selection(false),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" Recently viewed ({}) ", self.entries.len()))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.entries.is_empty() {
      let paragraph = Paragraph::new("No recently viewed segments.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let now = Utc::now();
    let items: Vec<ListItem> = self
      .entries
      .iter()
      .map(|entry| {
        let title = Line::from(vec![
          Span::styled(entry.name.clone(), Style::default().bold()),
          Span::styled(format!("  #{}", entry.id), Style::default().fg(Color::DarkGray)),
          Span::styled(
            format!("  {}", format_relative_time(entry.last_viewed, now)),
            Style::default().fg(Color::Cyan),
          ),
        ]);
        let details = Line::from(Span::styled(
          format!("  {}", entry_details(entry)),
          Style::default().fg(Color::DarkGray),
        ));
        ListItem::new(vec![title, details])
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn breadcrumb_label(&self) -> String {
    "History".to_string()
  }

  fn on_focus(&mut self) {
    self.reload();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("enter", "open"),
      Shortcut::new("x", "clear"),
      Shortcut::new("r", "reload"),
      Shortcut::new("q", "back"),
    ]
  }
}
