//! Client-side filtering, sorting and summary statistics for efforts.

use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::segments::types::Effort;

/// Range filters applied to an effort list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffortFilter {
  pub min_heartrate: Option<f64>,
  pub max_heartrate: Option<f64>,
  pub min_power: Option<f64>,
  pub max_power: Option<f64>,
  pub start_date: Option<NaiveDate>,
  pub end_date: Option<NaiveDate>,
}

impl EffortFilter {
  /// The preset behind "reset to defaults", ending today
  pub fn defaults(today: NaiveDate) -> Self {
    Self {
      min_heartrate: Some(125.0),
      max_heartrate: Some(140.0),
      min_power: Some(200.0),
      max_power: Some(350.0),
      start_date: NaiveDate::from_ymd_opt(2020, 1, 1),
      end_date: Some(today),
    }
  }

  pub fn is_active(&self) -> bool {
    *self != Self::default()
  }

  pub fn matches(&self, effort: &Effort) -> bool {
    // Efforts without the measurement drop out as soon as a bound is set
    if !within(effort.average_heartrate, self.min_heartrate, self.max_heartrate) {
      return false;
    }
    if !within(effort.average_watts, self.min_power, self.max_power) {
      return false;
    }

    let date = effort.start_date.date_naive();
    if self.start_date.is_some_and(|start| date < start) {
      return false;
    }
    if self.end_date.is_some_and(|end| date > end) {
      return false;
    }

    true
  }

  pub fn apply(&self, efforts: &[Effort]) -> Vec<Effort> {
    efforts.iter().filter(|e| self.matches(e)).cloned().collect()
  }
}

/// A zero bound means no bound.
pub fn bound(value: Option<f64>) -> Option<f64> {
  value.filter(|v| *v != 0.0)
}

/// Zero readings count as missing.
fn present(value: Option<f64>) -> Option<f64> {
  value.filter(|v| *v != 0.0)
}

fn within(value: Option<f64>, min: Option<f64>, max: Option<f64>) -> bool {
  match present(value) {
    Some(v) => min.map_or(true, |m| v >= m) && max.map_or(true, |m| v <= m),
    None => min.is_none() && max.is_none(),
  }
}

/// Column an effort list can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
  #[default]
  StartDate,
  Name,
  ElapsedTime,
  AverageHeartrate,
  MaxHeartrate,
  AverageWatts,
  Vam,
}

impl SortField {
  pub fn label(&self) -> &'static str {
    match self {
      SortField::StartDate => "start_date",
      SortField::Name => "name",
      SortField::ElapsedTime => "elapsed_time",
      SortField::AverageHeartrate => "average_heartrate",
      SortField::MaxHeartrate => "max_heartrate",
      SortField::AverageWatts => "average_watts",
      SortField::Vam => "vam",
    }
  }

  pub fn all_variants() -> &'static [Self] {
    &[
      SortField::StartDate,
      SortField::Name,
      SortField::ElapsedTime,
      SortField::AverageHeartrate,
      SortField::MaxHeartrate,
      SortField::AverageWatts,
      SortField::Vam,
    ]
  }

  fn numeric(&self, effort: &Effort) -> Option<f64> {
    match self {
      SortField::StartDate | SortField::Name => None,
      SortField::ElapsedTime => Some(effort.elapsed_time as f64),
      SortField::AverageHeartrate => effort.average_heartrate,
      SortField::MaxHeartrate => effort.max_heartrate,
      SortField::AverageWatts => effort.average_watts,
      SortField::Vam => effort.vam,
    }
  }

  /// Compare two efforts ascending; missing values sort last
  fn compare(&self, a: &Effort, b: &Effort) -> Ordering {
    match self {
      SortField::StartDate => a.start_date.cmp(&b.start_date),
      SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
      _ => compare_missing_last(self.numeric(a), self.numeric(b), f64::total_cmp),
    }
  }
}

fn compare_missing_last<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
  match (a, b) {
    (Some(a), Some(b)) => cmp(&a, &b),
    (Some(_), None) => Ordering::Less,
    (None, Some(_)) => Ordering::Greater,
    (None, None) => Ordering::Equal,
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
  Asc,
  #[default]
  Desc,
}

impl SortDirection {
  pub fn flipped(self) -> Self {
    match self {
      SortDirection::Asc => SortDirection::Desc,
      SortDirection::Desc => SortDirection::Asc,
    }
  }

  pub fn arrow(self) -> &'static str {
    match self {
      SortDirection::Asc => "▲",
      SortDirection::Desc => "▼",
    }
  }
}

/// Current sort column and direction; newest first by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
  pub field: SortField,
  pub direction: SortDirection,
}

impl SortState {
  pub fn new(field: SortField, direction: SortDirection) -> Self {
    Self { field, direction }
  }

  /// Same field flips the direction, a new field starts descending
  pub fn toggle(&mut self, field: SortField) {
    if self.field == field {
      self.direction = self.direction.flipped();
    } else {
      self.field = field;
      self.direction = SortDirection::Desc;
    }
  }

  /// Sort in place; missing values go last in either direction
  pub fn sort(&self, efforts: &mut [Effort]) {
    let field = self.field;
    let numeric = !matches!(field, SortField::StartDate | SortField::Name);

    efforts.sort_by(|a, b| {
      if numeric {
        match (field.numeric(a).is_some(), field.numeric(b).is_some()) {
          (true, false) => return Ordering::Less,
          (false, true) => return Ordering::Greater,
          _ => {}
        }
      }
      let ordering = field.compare(a, b);
      match self.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
      }
    });
  }
}

/// Summary over a list of efforts
#[derive(Debug, Clone, PartialEq)]
pub struct EffortStats {
  pub total_efforts: usize,
  /// Seconds
  pub best_time: u64,
  /// Seconds
  pub avg_time: u64,
  pub avg_heartrate: Option<u64>,
  pub avg_power: Option<u64>,
  pub avg_vam: Option<u64>,
}

impl EffortStats {
  /// `None` for an empty list
  pub fn compute(efforts: &[Effort]) -> Option<Self> {
    let best_time = efforts.iter().map(|e| e.elapsed_time).min()?;
    let total_time: u64 = efforts.iter().map(|e| e.elapsed_time).sum();

    Some(Self {
      total_efforts: efforts.len(),
      best_time,
      avg_time: (total_time as f64 / efforts.len() as f64).round() as u64,
      avg_heartrate: rounded_mean(efforts.iter().filter_map(|e| present(e.average_heartrate))),
      avg_power: rounded_mean(efforts.iter().filter_map(|e| present(e.average_watts))),
      avg_vam: rounded_mean(efforts.iter().filter_map(|e| present(e.vam))),
    })
  }
}

fn rounded_mean(values: impl Iterator<Item = f64>) -> Option<u64> {
  let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
  if count == 0 {
    None
  } else {
    Some((sum / count as f64).round() as u64)
  }
}
