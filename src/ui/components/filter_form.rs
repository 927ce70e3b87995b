use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::filters::{bound, EffortFilter};

const LABELS: [&str; 6] = ["Min HR", "Max HR", "Min power", "Max power", "From", "To"];
const LABEL_WIDTH: u16 = 11;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Events the parent view reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum FilterEvent {
  /// Every field parses; apply this filter while the form stays open
  Changed(EffortFilter),
  /// Form closed with this filter
  Submitted(EffortFilter),
  /// Form closed; restore the filter it was opened with
  Cancelled(EffortFilter),
}

/// Overlay form editing the range filters, applied as you type
#[derive(Debug, Clone, Default)]
pub struct FilterForm {
  inputs: Vec<TextInput>,
  focused: usize,
  active: bool,
  original: EffortFilter,
  invalid: Option<usize>,
}

impl FilterForm {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Open the form with the fields of `current`
  pub fn open(&mut self, current: &EffortFilter) {
    let number = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
    let date = |d: Option<NaiveDate>| {
      d.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
    };

    self.inputs = [
      number(current.min_heartrate),
      number(current.max_heartrate),
      number(current.min_power),
      number(current.max_power),
      date(current.start_date),
      date(current.end_date),
    ]
    .iter()
    .map(|v| TextInput::with_value(v))
    .collect();
    self.focused = 0;
    self.active = true;
    self.original = current.clone();
    self.invalid = None;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FilterEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        self.focused = (self.focused + 1) % LABELS.len();
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focused = (self.focused + LABELS.len() - 1) % LABELS.len();
        return KeyResult::Handled;
      }
      _ => {}
    }

    let Some(input) = self.inputs.get_mut(self.focused) else {
      return KeyResult::Handled;
    };

    match input.handle_key(key) {
      InputResult::Consumed => match self.parse() {
        Ok(filter) => {
          self.invalid = None;
          KeyResult::Event(FilterEvent::Changed(filter))
        }
        Err(field) => {
          self.invalid = Some(field);
          KeyResult::Handled
        }
      },
      InputResult::Submitted(_) => match self.parse() {
        Ok(filter) => {
          self.active = false;
          KeyResult::Event(FilterEvent::Submitted(filter))
        }
        Err(field) => {
          self.invalid = Some(field);
          self.focused = field;
          KeyResult::Handled
        }
      },
      InputResult::Cancelled => {
        self.active = false;
        KeyResult::Event(FilterEvent::Cancelled(self.original.clone()))
      }
      // The form keeps the keyboard while open
      InputResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Filter from the fields, or the index of the first field that doesn't parse
  fn parse(&self) -> Result<EffortFilter, usize> {
    let number = |i: usize| -> Result<Option<f64>, usize> {
      let text = self.inputs.get(i).map_or("", |input| input.value().trim());
      if text.is_empty() {
        return Ok(None);
      }
      match text.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(bound(Some(v))),
        _ => Err(i),
      }
    };
    let date = |i: usize| -> Result<Option<NaiveDate>, usize> {
      let text = self.inputs.get(i).map_or("", |input| input.value().trim());
      if text.is_empty() {
        return Ok(None);
      }
      NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map(Some)
        .map_err(|_| i)
    };

    Ok(EffortFilter {
      min_heartrate: number(0)?,
      max_heartrate: number(1)?,
      min_power: number(2)?,
      max_power: number(3)?,
      start_date: date(4)?,
      end_date: date(5)?,
    })
  }

  /// Render the form over the top left of `area` if open
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let height = LABELS.len() as u16 + 3;
    let overlay_area = Rect::new(area.x + 1, area.y + 1, 44, height).intersection(area);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Filters ");
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let mut lines: Vec<Line> = LABELS
      .iter()
      .zip(&self.inputs)
      .enumerate()
      .map(|(i, (label, input))| {
        let label_style = if self.invalid == Some(i) {
          Style::default().fg(Color::Red)
        } else if i == self.focused {
          Style::default().fg(Color::Yellow).bold()
        } else {
          Style::default().fg(Color::DarkGray)
        };
        Line::from(vec![
          Span::styled(
            format!("{:<width$}", label, width = LABEL_WIDTH as usize),
            label_style,
          ),
          Span::raw(input.value().to_string()),
        ])
      })
      .collect();
    lines.push(Line::from(Span::styled(
      "Tab next  Enter apply  Esc cancel",
      Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(Paragraph::new(lines), inner);

    if let Some(input) = self.inputs.get(self.focused) {
      let x = inner.x + LABEL_WIDTH + input.cursor_position() as u16;
      let y = inner.y + self.focused as u16;
      if x < inner.right() && y < inner.bottom() {
        frame.set_cursor_position(Position::new(x, y));
      }
    }
  }
}
