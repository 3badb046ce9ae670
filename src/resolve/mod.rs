//! Turns the model's symbolic dates and value expressions into concrete values.

pub mod dates;
pub mod values;

pub use dates::{parse_literal_date, DateExpr, DateResolver};
pub use values::{parse_number, SettingValues, ValueExpr};
