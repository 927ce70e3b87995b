pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use ratatui::prelude::*;

use crate::event::LoadEvent;
use renderfns::{draw_footer, draw_header};
use view::View;

/// Draw the top view of the stack between the header and the breadcrumb footer
pub fn draw(frame: &mut Frame, views: &mut [Box<dyn View>], server_url: &str) {
  let chunks = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(1),
    Constraint::Length(1),
  ])
  .split(frame.area());

  let breadcrumb: Vec<String> = views.iter().map(|v| v.breadcrumb_label()).collect();
  let Some(top) = views.last_mut() else {
    return;
  };

  draw_header(frame, chunks[0], server_url, &top.shortcuts());
  top.render(frame, chunks[1]);
  draw_footer(frame, chunks[2], &breadcrumb);
}

/// Notice line for a loader event, if it has one
pub fn notice(event: &LoadEvent) -> Option<String> {
  let text = match event {
    LoadEvent::ServedFromCache { segment_id, count } => format!(
      "Loaded {} efforts for segment {} from cache. Refreshing...",
      count, segment_id
    ),
    LoadEvent::Loading { segment_id } => format!("Loading efforts for segment {}...", segment_id),
    LoadEvent::Refreshed { count } => format!("Data refreshed ({} efforts)", count),
    LoadEvent::Loaded { count } => format!("Loaded {} efforts", count),
    LoadEvent::RefreshFailed => "Could not refresh data, showing cached version".to_string(),
    LoadEvent::FallbackEnabled => {
      "Rate limit exceeded. Switching to fallback mode (activity-level heart rate).".to_string()
    }
    LoadEvent::FallbackNotice => {
      "Fallback mode: heart rate values are activity averages, not segment-specific.".to_string()
    }
    LoadEvent::SessionExpired => "Session expired. Reloading...".to_string(),
    LoadEvent::NoEfforts
    | LoadEvent::ReloadRequested
    | LoadEvent::Failed(_)
    | LoadEvent::Settled => return None,
  };
  Some(text)
}

/// Render into an in-memory terminal and return the screen, one line per row
#[cfg(test)]
pub fn render_to_string(width: u16, height: u16, draw: impl FnOnce(&mut Frame)) -> String {
  use ratatui::backend::TestBackend;
  use ratatui::Terminal;

  let mut terminal = match Terminal::new(TestBackend::new(width, height)) {
    Ok(terminal) => terminal,
    Err(e) => panic!("test terminal: {}", e),
  };
  if let Err(e) = terminal.draw(draw) {
    panic!("draw failed: {}", e);
  }

  let buffer = terminal.backend().buffer();
  (0..height)
    .map(|y| {
      (0..width)
        .map(|x| buffer[(x, y)].symbol())
        .collect::<String>()
    })
    .collect::<Vec<_>>()
    .join("\n")
}
