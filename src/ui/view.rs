use crossterm::event::KeyEvent;
use ratatui::prelude::*;

use crate::event::Event;

/// A key hint shown in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortcut {
  pub key: &'static str,
  pub label: &'static str,
}

impl Shortcut {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self { key, label }
  }
}

/// What the App should do after a view handled a key
pub enum ViewAction {
  None,
  /// Open a view on top of this one
  Push(Box<dyn View>),
  /// Close this view
  Pop,
}

/// A screen on the App's view stack.
///
/// Views own their data and pending loads, and poll them from `tick`.
pub trait View {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  fn render(&mut self, frame: &mut Frame, area: Rect);

  fn breadcrumb_label(&self) -> String;

  /// Called on every tick, for every view on the stack
  fn tick(&mut self) {}

  /// Events shared by the whole App, such as server cache stats
  fn on_event(&mut self, _event: &Event) {}

  /// The view above this one was closed
  fn on_focus(&mut self) {}

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![Shortcut::new("q", "back")]
  }
}
