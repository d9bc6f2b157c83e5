use crate::DateError;
use crate::consts::{
    CENTURY_CYCLE, DAYS_IN_MONTH, FEBRUARY, FEBRUARY_DAYS_LEAP, GREGORIAN_CYCLE, LEAP_YEAR_CYCLE,
    MAX_DAY, MAX_MONTH, MAX_YEAR, MIN_DAY,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A year value guaranteed to be in the range `0..=MAX_YEAR` (0..=9999).
/// Year 0 is valid: it is the earliest resolution of a sparse year whose
/// digits are all unknown.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u16", into = "u16")]
pub struct Year(u16);

impl Year {
    /// Creates a new Year, validating that it's <= `MAX_YEAR`
    ///
    /// # Errors
    /// Returns `DateError::InvalidYear` if the value is > `MAX_YEAR`.
    pub fn new(value: u16) -> Result<Self, DateError> {
        if value > MAX_YEAR {
            return Err(DateError::InvalidYear(value));
        }
        Ok(Self(value))
    }

    /// Returns the year value as u16
    #[inline]
    pub const fn get(self) -> u16 {
        self.0
    }

    // For values already produced by in-range calendar arithmetic.
    pub(crate) const fn from_raw(value: u16) -> Self {
        debug_assert!(value <= MAX_YEAR);
        Self(value)
    }
}

impl TryFrom<u16> for Year {
    type Error = DateError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Year> for u16 {
    fn from(year: Year) -> Self {
        year.0
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A month value guaranteed to be in the range `1..=MAX_MONTH` (1..=12)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Month(u8);

impl Month {
    /// Creates a new Month, validating that it's non-zero and <= `MAX_MONTH`
    ///
    /// # Errors
    /// Returns `DateError::InvalidMonth` if the value is 0 or > `MAX_MONTH`.
    pub fn new(value: u8) -> Result<Self, DateError> {
        if !(1..=MAX_MONTH).contains(&value) {
            return Err(DateError::InvalidMonth(value));
        }
        Ok(Self(value))
    }

    /// Returns the month value as u8
    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    pub(crate) const fn from_raw(value: u8) -> Self {
        debug_assert!(value != 0 && value <= MAX_MONTH);
        Self(value)
    }
}

impl TryFrom<u8> for Month {
    type Error = DateError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Month> for u8 {
    fn from(month: Month) -> Self {
        month.0
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A day value guaranteed to be valid for a given year and month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Day(u8);

impl Day {
    /// Creates a new Day, validating that it's non-zero and valid for the given year and month
    ///
    /// # Errors
    /// Returns `DateError::InvalidDay` if the value is 0 or invalid for the given year and month.
    pub fn new(value: u8, year: u16, month: u8) -> Result<Self, DateError> {
        if !(MIN_DAY..=days_in_month(year, month)).contains(&value) {
            return Err(DateError::InvalidDay {
                month,
                day: value,
                year,
            });
        }
        Ok(Self(value))
    }

    /// Returns the day value as u8
    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    pub(crate) const fn from_raw(value: u8) -> Self {
        debug_assert!(value != 0 && value <= MAX_DAY);
        Self(value)
    }
}

impl TryFrom<u8> for Day {
    type Error = DateError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        // Can't validate against a month length without year/month context,
        // so only the universal 1..=31 envelope is checked here.
        if !(MIN_DAY..=MAX_DAY).contains(&value) {
            return Err(DateError::InvalidDay {
                month: 0,
                day: value,
                year: 0,
            });
        }
        Ok(Self(value))
    }
}

impl From<Day> for u8 {
    fn from(day: Day) -> Self {
        day.0
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Clock part of a `CalendarDate`. The default value is midnight.
///
/// Difference and age computation strip this to midnight first; anniversary
/// computation carries it through unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
    second: u8,
    nanosecond: u32,
}

impl TimeOfDay {
    pub const MIDNIGHT: Self = Self {
        hour: 0,
        minute: 0,
        second: 0,
        nanosecond: 0,
    };

    /// Creates a new time of day.
    ///
    /// # Errors
    /// Returns `DateError::InvalidTime` if any component is out of range
    /// (hour >= 24, minute or second >= 60, nanosecond >= 10^9).
    pub const fn new(hour: u8, minute: u8, second: u8, nanosecond: u32) -> Result<Self, DateError> {
        if hour >= 24 || minute >= 60 || second >= 60 || nanosecond >= 1_000_000_000 {
            return Err(DateError::InvalidTime {
                hour,
                minute,
                second,
            });
        }
        Ok(Self {
            hour,
            minute,
            second,
            nanosecond,
        })
    }

    #[inline]
    pub const fn hour(self) -> u8 {
        self.hour
    }

    #[inline]
    pub const fn minute(self) -> u8 {
        self.minute
    }

    #[inline]
    pub const fn second(self) -> u8 {
        self.second
    }

    #[inline]
    pub const fn nanosecond(self) -> u32 {
        self.nanosecond
    }

    /// Whole seconds elapsed since midnight (sub-second part ignored).
    pub(crate) const fn seconds_of_day(self) -> i64 {
        self.hour as i64 * 3600 + self.minute as i64 * 60 + self.second as i64
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

// Helper functions

pub const fn is_leap_year(year: u16) -> bool {
    (year % LEAP_YEAR_CYCLE == 0 && year % CENTURY_CYCLE != 0) || (year % GREGORIAN_CYCLE == 0)
}

pub const fn days_in_month(year: u16, month: u8) -> u8 {
    debug_assert!(month != 0 && month <= MAX_MONTH);

    if month == FEBRUARY && is_leap_year(year) {
        FEBRUARY_DAYS_LEAP
    } else {
        DAYS_IN_MONTH[month as usize]
    }
}
