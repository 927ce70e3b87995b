use chrono::{DateTime, Utc};
use ratatui::prelude::Color;

use crate::event::LoadEvent;
use crate::segments::types::CacheStats;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Seconds as "M:SS", or "H:MM:SS" from an hour up
pub fn format_time(seconds: u64) -> String {
  let hours = seconds / 3600;
  let minutes = (seconds % 3600) / 60;
  let secs = seconds % 60;
  if hours > 0 {
    format!("{}:{:02}:{:02}", hours, minutes, secs)
  } else {
    format!("{}:{:02}", minutes, secs)
  }
}

/// Byte count with a binary unit and one decimal
pub fn format_bytes(bytes: u64) -> String {
  const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
  if bytes == 0 {
    return "0 B".to_string();
  }

  let mut value = bytes as f64;
  let mut unit = 0;
  while value >= 1024.0 && unit < UNITS.len() - 1 {
    value /= 1024.0;
    unit += 1;
  }

  let rounded = (value * 10.0).round() / 10.0;
  if rounded.fract() == 0.0 {
    format!("{} {}", rounded as u64, UNITS[unit])
  } else {
    format!("{:.1} {}", rounded, UNITS[unit])
  }
}

pub fn format_date(date: &DateTime<Utc>) -> String {
  date.format("%b %-d, %Y").to_string()
}

/// Meters as kilometers with two decimals
pub fn format_km(meters: f64) -> String {
  format!("{:.2} km", meters / 1000.0)
}

/// "2 hours ago" style age of `then` relative to `now`
pub fn format_relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let diff = now - then;
  let plural = |n: i64, unit: &str| format!("{} {}{} ago", n, unit, if n == 1 { "" } else { "s" });

  if diff.num_days() > 0 {
    plural(diff.num_days(), "day")
  } else if diff.num_hours() > 0 {
    plural(diff.num_hours(), "hour")
  } else if diff.num_minutes() > 0 {
    plural(diff.num_minutes(), "minute")
  } else {
    "Just now".to_string()
  }
}

/// Optional reading rounded to a whole number with a unit, or "N/A"
pub fn format_reading(value: Option<f64>, unit: &str) -> String {
  match value.filter(|v| *v != 0.0) {
    Some(v) => format!("{} {}", v.round() as i64, unit),
    None => "N/A".to_string(),
  }
}

/// One-line summary of the backend's cache
pub fn cache_stats_line(stats: &CacheStats) -> String {
  format!(
    "Server cache: {} files, {}, {} segments, {} activities",
    stats.total_files,
    format_bytes(stats.total_size),
    stats.count("segment"),
    stats.activity_count()
  )
}

/// Selection kept inside a list of `len` rows; the first row when nothing was selected
pub fn clamp_selection(selected: Option<usize>, len: usize) -> Option<usize> {
  if len == 0 {
    None
  } else {
    Some(selected.map_or(0, |i| i.min(len - 1)))
  }
}

/// Display color for a loader notice
pub fn notice_color(event: &LoadEvent) -> Color {
  match event {
    LoadEvent::RefreshFailed | LoadEvent::FallbackEnabled | LoadEvent::FallbackNotice => {
      Color::Yellow
    }
    LoadEvent::SessionExpired | LoadEvent::Failed(_) => Color::Red,
    LoadEvent::Refreshed { .. } | LoadEvent::Loaded { .. } => Color::Green,
    _ => Color::Cyan,
  }
}
