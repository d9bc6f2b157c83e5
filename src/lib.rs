mod consts;
mod date;
mod prelude;
mod sparse;
mod types;

pub use consts::*;
pub use date::{CalendarDate, DateDiff};
pub use sparse::{DateFormat, FormatError, SparseDate};
pub use types::{Day, Month, TimeOfDay, Year};

use crate::prelude::*;

/// Error raised when a calendar component is constructed from an
/// out-of-range value or a date string cannot be read.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum DateError {
    #[display(fmt = "Invalid date format: {_0}")]
    InvalidFormat(String),
    #[display(fmt = "Invalid year: {} (must be 0-{})", "_0", MAX_YEAR)]
    InvalidYear(u16),
    #[display(fmt = "Invalid month: {} (must be 1-{})", "_0", MAX_MONTH)]
    InvalidMonth(u8),
    #[display(fmt = "Invalid day {day} for month {year}-{month:02}")]
    InvalidDay { month: u8, day: u8, year: u16 },
    #[display(fmt = "Invalid time of day {hour:02}:{minute:02}:{second:02}")]
    InvalidTime { hour: u8, minute: u8, second: u8 },
}

impl std::error::Error for DateError {}
