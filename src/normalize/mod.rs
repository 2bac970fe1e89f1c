//! Locale normalization: Swedish/English/enum-style tokens to canonical values.
//!
//! Everything here is a pure function over `&str`; lookup tables are
//! immutable statics.

pub mod date;
pub mod rate;
pub mod ratio;
pub mod term;

pub use date::{
    MonthFormat, parse_any_month, parse_iso_date, parse_swedish_month, parse_swedish_month_year,
    parse_swedish_year_month, parse_year_month, parse_year_space_month, parse_yymm, parse_yyyymm,
};
pub use rate::{is_not_published, looks_like_rate, parse_rate};
pub use ratio::parse_ratio_bracket;
pub use term::parse_term;
