mod filter_form;
mod input;
mod key_result;

pub use filter_form::{FilterEvent, FilterForm};
pub use key_result::KeyResult;
