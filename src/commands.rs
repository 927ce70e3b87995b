//! Command-line commands and sort-field lookup

use chrono::NaiveDate;
use clap::{Args, Subcommand};

use crate::filters::{bound, EffortFilter, SortDirection, SortField, SortState};

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Show the efforts of a segment, cache first
  Efforts(EffortsArgs),
  /// List recently viewed segments
  History {
    #[command(subcommand)]
    action: Option<HistoryAction>,
  },
  /// Inspect or clear caches
  Cache {
    #[command(subcommand)]
    action: CacheAction,
  },
}

#[derive(Subcommand, Debug)]
pub enum HistoryAction {
  /// Forget every recently viewed segment
  Clear,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
  /// Show server cache statistics
  Stats,
  /// Clear expired server cache entries, or the local cache with --local
  Clear {
    #[arg(long)]
    local: bool,
  },
}

#[derive(Args, Debug, Clone)]
pub struct EffortsArgs {
  /// Segment id
  pub segment_id: u64,

  /// Segment name to remember in history
  #[arg(long)]
  pub name: Option<String>,

  #[arg(long)]
  pub min_hr: Option<f64>,
  #[arg(long)]
  pub max_hr: Option<f64>,
  #[arg(long)]
  pub min_power: Option<f64>,
  #[arg(long)]
  pub max_power: Option<f64>,
  /// First day to include (YYYY-MM-DD)
  #[arg(long)]
  pub from: Option<NaiveDate>,
  /// Last day to include (YYYY-MM-DD)
  #[arg(long)]
  pub to: Option<NaiveDate>,

  /// Start from the default filter preset (explicit bounds still win)
  #[arg(long)]
  pub defaults: bool,

  /// Sort column (date, name, time, hr, maxhr, power, vam)
  #[arg(long, value_parser = parse_sort_field)]
  pub sort: Option<SortField>,

  /// Sort ascending (default is descending)
  #[arg(long, conflicts_with = "desc")]
  pub asc: bool,
  #[arg(long)]
  pub desc: bool,
}

impl EffortsArgs {
  pub fn filter(&self, today: NaiveDate) -> EffortFilter {
    let base = if self.defaults {
      EffortFilter::defaults(today)
    } else {
      EffortFilter::default()
    };

    EffortFilter {
      min_heartrate: explicit(self.min_hr, base.min_heartrate),
      max_heartrate: explicit(self.max_hr, base.max_heartrate),
      min_power: explicit(self.min_power, base.min_power),
      max_power: explicit(self.max_power, base.max_power),
      start_date: self.from.or(base.start_date),
      end_date: self.to.or(base.end_date),
    }
  }

  pub fn sort_state(&self) -> SortState {
    let direction = if self.asc && !self.desc {
      SortDirection::Asc
    } else {
      SortDirection::Desc
    };
    SortState::new(self.sort.unwrap_or_default(), direction)
  }
}

/// An explicit value wins over the preset; an explicit zero clears the bound
fn explicit(value: Option<f64>, preset: Option<f64>) -> Option<f64> {
  match value {
    Some(v) => bound(Some(v)),
    None => preset,
  }
}

#[derive(Debug, Clone)]
pub struct SortAlias {
  pub field: SortField,
  pub aliases: &'static [&'static str],
}

/// Accepted names for every sort column
pub const SORT_ALIASES: &[SortAlias] = &[
  SortAlias {
    field: SortField::StartDate,
    aliases: &["date", "start", "when"],
  },
  SortAlias {
    field: SortField::Name,
    aliases: &["activity", "title"],
  },
  SortAlias {
    field: SortField::ElapsedTime,
    aliases: &["time", "elapsed", "duration"],
  },
  SortAlias {
    field: SortField::AverageHeartrate,
    aliases: &["hr", "heartrate", "avg_hr"],
  },
  SortAlias {
    field: SortField::MaxHeartrate,
    aliases: &["maxhr", "max_hr"],
  },
  SortAlias {
    field: SortField::AverageWatts,
    aliases: &["power", "watts"],
  },
  SortAlias {
    field: SortField::Vam,
    aliases: &["climb"],
  },
];

/// Get sort-field suggestions for a given input, best match first
pub fn get_suggestions(input: &str) -> Vec<SortField> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return SORT_ALIASES.iter().map(|a| a.field).collect();
  }

  let mut matches: Vec<(SortField, u32)> = Vec::new();

  for entry in SORT_ALIASES {
    let name = entry.field.label();

    if name == input_lower {
      matches.push((entry.field, 0));
    } else if entry.aliases.contains(&input_lower.as_str()) {
      matches.push((entry.field, 1));
    } else if name.starts_with(&input_lower) {
      matches.push((entry.field, 2));
    } else if entry.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((entry.field, 3));
    }
  }

  matches.sort_by_key(|(_, priority)| *priority);
  matches.into_iter().map(|(field, _)| field).collect()
}

/// Resolve a sort column from its name, alias or unambiguous prefix
pub fn parse_sort_field(input: &str) -> Result<SortField, String> {
  let suggestions = get_suggestions(input);
  match suggestions.as_slice() {
    [] => Err(format!(
      "unknown sort field '{}' (expected one of: {})",
      input,
      SortField::all_variants()
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
    )),
    [only] => Ok(*only),
    [first, ..] if is_exact(*first, input) => Ok(*first),
    _ => Err(format!("ambiguous sort field '{}'", input)),
  }
}

/// An exact name or alias beats prefixes
fn is_exact(field: SortField, input: &str) -> bool {
  let input_lower = input.trim().to_lowercase();
  SORT_ALIASES
    .iter()
    .filter(|a| a.field == field)
    .any(|a| a.field.label() == input_lower || a.aliases.contains(&input_lower.as_str()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;

  #[derive(Parser, Debug)]
  struct Cli {
    #[command(subcommand)]
    command: Command,
  }

  fn efforts_args(args: &[&str]) -> EffortsArgs {
    let mut argv = vec!["segview", "efforts"];
    argv.extend_from_slice(args);
    match Cli::try_parse_from(argv).unwrap().command {
      Command::Efforts(args) => args,
      other => panic!("unexpected command: {:?}", other),
    }
  }

  #[test]
  fn test_empty_input_returns_all() {
    assert_eq!(get_suggestions("").len(), SORT_ALIASES.len());
  }

  #[test]
  fn test_exact_name() {
    assert_eq!(parse_sort_field("vam"), Ok(SortField::Vam));
    assert_eq!(parse_sort_field("elapsed_time"), Ok(SortField::ElapsedTime));
  }

  #[test]
  fn test_alias() {
    assert_eq!(parse_sort_field("hr"), Ok(SortField::AverageHeartrate));
    assert_eq!(parse_sort_field("Power"), Ok(SortField::AverageWatts));
    assert_eq!(parse_sort_field("date"), Ok(SortField::StartDate));
  }

  #[test]
  fn test_unique_prefix() {
    assert_eq!(parse_sort_field("dur"), Ok(SortField::ElapsedTime));
  }

  #[test]
  fn test_ambiguous_prefix() {
    // Prefix of both average_* columns and of the "activity" alias
    assert!(parse_sort_field("a").is_err());
  }

  #[test]
  fn test_unknown_field() {
    assert!(parse_sort_field("cadence").is_err());
  }

  #[test]
  fn test_efforts_args_filter_and_sort() {
    let args = efforts_args(&["42", "--min-hr", "130", "--from", "2024-01-01", "--sort", "time", "--asc"]);
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

    assert_eq!(args.segment_id, 42);
    let filter = args.filter(today);
    assert_eq!(filter.min_heartrate, Some(130.0));
    assert_eq!(filter.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
    assert_eq!(filter.max_power, None);
    assert_eq!(
      args.sort_state(),
      SortState::new(SortField::ElapsedTime, SortDirection::Asc)
    );
  }

  #[test]
  fn test_defaults_preset_with_override() {
    let args = efforts_args(&["42", "--defaults", "--max-hr", "160"]);
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let filter = args.filter(today);

    assert_eq!(filter.min_heartrate, Some(125.0));
    assert_eq!(filter.max_heartrate, Some(160.0));
    assert_eq!(filter.end_date, Some(today));
  }

  #[test]
  fn test_zero_bound_means_no_bound() {
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

    let filter = efforts_args(&["42", "--min-hr", "0", "--max-power", "0"]).filter(today);
    assert_eq!(filter.min_heartrate, None);
    assert_eq!(filter.max_power, None);
    assert!(!filter.is_active());

    // Clears the preset bound instead of keeping it
    let filter = efforts_args(&["42", "--defaults", "--min-hr", "0"]).filter(today);
    assert_eq!(filter.min_heartrate, None);
    assert_eq!(filter.max_heartrate, Some(140.0));
  }

  #[test]
  fn test_default_sort_is_newest_first() {
    let args = efforts_args(&["42"]);
    assert_eq!(args.sort_state(), SortState::default());

    let args = efforts_args(&["42", "--sort", "date"]);
    assert_eq!(args.sort_state(), SortState::default());
  }
}
