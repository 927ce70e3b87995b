use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use url::Url;

use crate::ui::view::Shortcut;

/// Draw the header bar with the app name, backend host and key hints
pub fn draw_header(frame: &mut Frame, area: Rect, server_url: &str, shortcuts: &[Shortcut]) {
  let mut spans = vec![
    Span::styled(" segview ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", server_host(server_url)),
      Style::default().fg(Color::White),
    ),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::raw(" "),
  ];

  for (i, shortcut) in shortcuts.iter().enumerate() {
    if i > 0 {
      spans.push(Span::raw("  "));
    }
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Host and port of the backend, or the configured string if it doesn't parse
fn server_host(server_url: &str) -> String {
  let Ok(url) = Url::parse(server_url) else {
    return server_url.to_string();
  };
  match (url.host_str(), url.port()) {
    (Some(host), Some(port)) => format!("{}:{}", host, port),
    (Some(host), None) => host.to_string(),
    (None, _) => server_url.to_string(),
  }
}
