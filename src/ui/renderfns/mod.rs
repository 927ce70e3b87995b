pub mod footer;
pub mod header;
pub mod utils;

pub use footer::draw_footer;
pub use header::draw_header;
pub use utils::{
  cache_stats_line, clamp_selection, format_date, format_km, format_reading, format_relative_time,
  format_time, notice_color, truncate,
};
