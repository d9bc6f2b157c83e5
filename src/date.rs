use crate::DateError;
use crate::consts::{DATE_SEPARATOR, DECEMBER, JANUARY, MAX_YEAR, SECONDS_PER_DAY};
use crate::prelude::*;
use crate::types::{Day, Month, TimeOfDay, Year, days_in_month};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A fully resolved point on the calendar, with an optional clock part.
///
/// The clock part is carried through anniversary computation but stripped
/// to midnight before any difference or age computation. Instances are
/// immutable once constructed; every operation returns a fresh value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display(fmt = "{:04}-{:02}-{:02}", "year.get()", "month.get()", "day.get()")]
pub struct CalendarDate {
    year: Year,
    month: Month,
    day: Day,
    time: TimeOfDay,
}

/// A calendar-aware interval between an earlier and a later date.
///
/// Computed with borrow rules over the calendar, not from an elapsed
/// duration. All components are non-negative whenever the earlier date
/// actually precedes (or equals) the later one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display(fmt = "{years}y {months}m {days}d")]
pub struct DateDiff {
    pub years: i32,
    pub months: i32,
    pub days: i32,
}

impl DateDiff {
    /// Computes the span such that advancing `earlier` by the result yields
    /// `later`, under calendar semantics:
    ///
    /// - a year is borrowed when `later`'s (month, day) precedes
    ///   `earlier`'s, i.e. the anniversary has not yet occurred;
    /// - a month is borrowed when `later`'s day has not been reached, with
    ///   the month delta wrapped into `0..=11`;
    /// - a borrowed month's length is taken from `earlier`'s own year and
    ///   month. This is the exact historical rule the rest of the crate
    ///   relies on; do not swap in the month preceding `later`.
    pub fn between(earlier: CalendarDate, later: CalendarDate) -> Self {
        let mut years = i32::from(later.year()) - i32::from(earlier.year());
        if (later.month(), later.day()) < (earlier.month(), earlier.day()) {
            years -= 1;
        }

        let mut months = i32::from(later.month()) - i32::from(earlier.month());
        if later.day() < earlier.day() {
            months -= 1;
        }
        if months < 0 {
            months += 12;
        }

        let days = if later.day() >= earlier.day() {
            i32::from(later.day() - earlier.day())
        } else {
            i32::from(days_in_month(earlier.year(), earlier.month()) - earlier.day())
                + i32::from(later.day())
        };

        Self {
            years,
            months,
            days,
        }
    }

    /// True when all three components are zero.
    pub const fn is_zero(self) -> bool {
        self.years == 0 && self.months == 0 && self.days == 0
    }
}

impl CalendarDate {
    /// Creates a date at midnight.
    ///
    /// # Errors
    /// Returns `DateError` if any component is out of range for the
    /// Gregorian calendar.
    pub fn new(year: u16, month: u8, day: u8) -> Result<Self, DateError> {
        Self::with_time(year, month, day, TimeOfDay::MIDNIGHT)
    }

    /// Creates a date with a clock part.
    ///
    /// # Errors
    /// Returns `DateError` if any component is out of range.
    pub fn with_time(year: u16, month: u8, day: u8, time: TimeOfDay) -> Result<Self, DateError> {
        let year = Year::new(year)?;
        let month = Month::new(month)?;
        let day = Day::new(day, year.get(), month.get())?;
        Ok(Self {
            year,
            month,
            day,
            time,
        })
    }

    // Components must already have been produced by in-range arithmetic.
    pub(crate) const fn from_raw_parts(year: u16, month: u8, day: u8, time: TimeOfDay) -> Self {
        Self {
            year: Year::from_raw(year),
            month: Month::from_raw(month),
            day: Day::from_raw(day),
            time,
        }
    }

    /// Returns the year component
    pub const fn year(&self) -> u16 {
        self.year.get()
    }

    /// Returns the month component
    pub const fn month(&self) -> u8 {
        self.month.get()
    }

    /// Returns the day component
    pub const fn day(&self) -> u8 {
        self.day.get()
    }

    /// Returns the clock part
    pub const fn time(&self) -> TimeOfDay {
        self.time
    }

    /// Returns the Year type
    pub const fn year_typed(&self) -> Year {
        self.year
    }

    /// Returns the Month type
    pub const fn month_typed(&self) -> Month {
        self.month
    }

    /// Returns the Day type
    pub const fn day_typed(&self) -> Day {
        self.day
    }

    /// The same date with the clock part stripped to midnight.
    pub const fn at_midnight(&self) -> Self {
        Self {
            year: self.year,
            month: self.month,
            day: self.day,
            time: TimeOfDay::MIDNIGHT,
        }
    }

    /// Elapsed calendar age of this date as of `reference` (whose clock
    /// part is stripped first).
    pub fn age(&self, reference: CalendarDate) -> DateDiff {
        DateDiff::between(*self, reference.at_midnight())
    }

    /// The `years` component of [`Self::age`].
    pub fn age_years(&self, reference: CalendarDate) -> i32 {
        self.age(reference).years
    }

    /// The span from the stripped `reference` to this date; the opposite
    /// direction of [`Self::age`], for dates lying in the future.
    pub fn inverse_age(&self, reference: CalendarDate) -> DateDiff {
        DateDiff::between(reference.at_midnight(), *self)
    }

    /// The `years` component of [`Self::inverse_age`].
    pub fn inverse_age_years(&self, reference: CalendarDate) -> i32 {
        self.inverse_age(reference).years
    }

    /// The next occurrence of this date's month and day on or after the
    /// stripped `reference`, keeping this date's clock part.
    ///
    /// The candidate is placed in `reference`'s year and advanced by one
    /// year only when the reference (month, day) is strictly after this
    /// date's; an equal (month, day) returns the anniversary in the
    /// reference year itself. A February 29 anniversary in a non-leap
    /// candidate year rolls over to March 1. Saturates at year 9999.
    pub fn next_anniversary(&self, reference: CalendarDate) -> Self {
        let reference = reference.at_midnight();
        let (mut year, mut month, mut day) =
            normalize_day(reference.year(), self.month(), self.day());
        if (reference.month(), reference.day()) > (self.month(), self.day()) && year < MAX_YEAR {
            (year, month, day) = normalize_day(year + 1, month, day);
        }
        Self::from_raw_parts(year, month, day, self.time)
    }

    /// Whole days from the stripped `reference` until the next anniversary,
    /// floored towards negative infinity on fractional days. Negative only
    /// when anniversary saturation at year 9999 leaves the candidate before
    /// the reference.
    pub fn next_in_days(&self, reference: CalendarDate) -> i64 {
        let reference = reference.at_midnight();
        let next = self.next_anniversary(reference);
        let seconds = (next.day_number() - reference.day_number()) * SECONDS_PER_DAY
            + next.time().seconds_of_day();
        seconds.div_euclid(SECONDS_PER_DAY)
    }

    /// Day of week as an index, 0 = Sunday .. 6 = Saturday, the form
    /// consumed by external weekday-name tables.
    pub fn weekday(&self) -> u8 {
        // 1970-01-01 was a Thursday.
        let weekday = (self.day_number() + 4).rem_euclid(7);
        weekday as u8
    }

    /// Days since 1970-01-01, Howard Hinnant's days-from-civil algorithm.
    pub(crate) fn day_number(&self) -> i64 {
        let m = i64::from(self.month());
        let y = i64::from(self.year()) - i64::from(m <= 2);
        let era = if y >= 0 { y } else { y - 399 } / 400;
        let yoe = y - era * 400; // [0, 399]
        let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + i64::from(self.day()) - 1;
        let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy; // [0, 146096]
        era * 146_097 + doe - 719_468
    }
}

// Rolls a day past the end of its month into the following month. Only
// February 29 in a non-leap year actually overflows here.
const fn normalize_day(year: u16, month: u8, day: u8) -> (u16, u8, u8) {
    let max = days_in_month(year, month);
    if day <= max {
        return (year, month, day);
    }
    let day = day - max;
    if month == DECEMBER {
        (year + 1, JANUARY, day)
    } else {
        (year, month + 1, day)
    }
}

impl FromStr for CalendarDate {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DateError::InvalidFormat(s.to_owned()));
        }

        let parts: Vec<&str> = trimmed.split(DATE_SEPARATOR).map(str::trim).collect();
        if parts.len() != 3 {
            return Err(DateError::InvalidFormat(trimmed.to_owned()));
        }

        let year = parts[0]
            .parse::<u16>()
            .map_err(|_| DateError::InvalidFormat(parts[0].to_owned()))?;
        let month = parts[1]
            .parse::<u8>()
            .map_err(|_| DateError::InvalidFormat(parts[1].to_owned()))?;
        let day = parts[2]
            .parse::<u8>()
            .map_err(|_| DateError::InvalidFormat(parts[2].to_owned()))?;

        Self::new(year, month, day)
    }
}

impl serde::Serialize for CalendarDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for CalendarDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: u16, month: u8, day: u8) -> CalendarDate {
        CalendarDate::new(year, month, day).unwrap()
    }

    fn datetime(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> CalendarDate {
        let time = TimeOfDay::new(hour, minute, second, 0).unwrap();
        CalendarDate::with_time(year, month, day, time).unwrap()
    }

    #[test]
    fn test_new_validates_components() {
        assert!(CalendarDate::new(2024, 2, 29).is_ok());
        assert!(matches!(
            CalendarDate::new(2023, 2, 29),
            Err(DateError::InvalidDay { .. })
        ));
        assert!(matches!(
            CalendarDate::new(2024, 13, 1),
            Err(DateError::InvalidMonth(13))
        ));
        assert!(matches!(
            CalendarDate::new(10000, 1, 1),
            Err(DateError::InvalidYear(10000))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(date(1991, 8, 15).to_string(), "1991-08-15");
        assert_eq!(date(0, 1, 1).to_string(), "0000-01-01");
        // the clock part never shows in the date rendering
        assert_eq!(datetime(2015, 10, 31, 15, 45, 58).to_string(), "2015-10-31");
    }

    #[test]
    fn test_at_midnight() {
        let d = datetime(2015, 10, 31, 15, 45, 58);
        let stripped = d.at_midnight();
        assert_eq!(stripped.time(), TimeOfDay::MIDNIGHT);
        assert_eq!(
            (stripped.year(), stripped.month(), stripped.day()),
            (2015, 10, 31)
        );
    }

    #[test]
    fn test_ordering() {
        assert!(date(1990, 12, 31) < date(1991, 1, 1));
        assert!(date(1991, 1, 31) < date(1991, 2, 1));
        // same date, later clock part orders after midnight
        assert!(date(1991, 1, 1) < datetime(1991, 1, 1, 0, 0, 1));
    }

    #[test]
    fn test_diff_between_cases() {
        struct TestCase {
            earlier: CalendarDate,
            later: CalendarDate,
            expected: DateDiff,
            description: &'static str,
        }

        let cases = [
            TestCase {
                earlier: date(2010, 5, 6),
                later: date(2018, 10, 31),
                expected: DateDiff {
                    years: 8,
                    months: 5,
                    days: 25,
                },
                description: "plain difference",
            },
            TestCase {
                earlier: date(2017, 12, 15),
                later: date(2018, 10, 15),
                expected: DateDiff {
                    years: 0,
                    months: 10,
                    days: 0,
                },
                description: "year borrow via month",
            },
            TestCase {
                earlier: date(2013, 5, 15),
                later: date(2018, 10, 5),
                expected: DateDiff {
                    years: 5,
                    months: 4,
                    days: 21,
                },
                description: "month borrow, days from earlier's own month",
            },
            TestCase {
                earlier: date(2018, 10, 5),
                later: date(2018, 10, 5),
                expected: DateDiff {
                    years: 0,
                    months: 0,
                    days: 0,
                },
                description: "same day",
            },
        ];

        for case in &cases {
            assert_eq!(
                DateDiff::between(case.earlier, case.later),
                case.expected,
                "{}",
                case.description
            );
        }
    }

    #[test]
    fn test_diff_identity_is_zero() {
        let d = date(2024, 2, 29);
        assert!(DateDiff::between(d, d).is_zero());
    }

    #[test]
    fn test_diff_one_day() {
        let a = date(2024, 6, 10);
        let b = date(2024, 6, 11);
        assert_eq!(
            DateDiff::between(a, b),
            DateDiff {
                years: 0,
                months: 0,
                days: 1
            }
        );
    }

    #[test]
    fn test_age_strips_reference_time() {
        let birth = date(2010, 5, 6);
        let reference = datetime(2018, 10, 31, 15, 45, 58);
        assert_eq!(
            birth.age(reference),
            DateDiff {
                years: 8,
                months: 5,
                days: 25
            }
        );
    }

    #[test]
    fn test_age_years_anniversary_edge() {
        let birth = date(2012, 4, 1);

        // on the anniversary itself, clock time does not matter
        let on_day = datetime(2015, 4, 1, 0, 0, 1);
        assert_eq!(birth.age_years(on_day), 3);

        // one calendar day earlier the year has not completed
        let day_before = datetime(2015, 3, 31, 23, 59, 59);
        assert_eq!(birth.age_years(day_before), 2);
    }

    #[test]
    fn test_inverse_age() {
        let subject = datetime(2018, 10, 5, 15, 45, 58);
        let reference = date(2013, 5, 15);
        assert_eq!(
            subject.inverse_age(reference),
            DateDiff {
                years: 5,
                months: 4,
                days: 21
            }
        );
        assert_eq!(subject.inverse_age_years(reference), 5);
    }

    #[test]
    fn test_next_anniversary_before_and_after() {
        let reference = datetime(2015, 10, 31, 15, 45, 58);

        // month/day still ahead in the reference year
        let december = date(2010, 12, 6);
        assert_eq!(
            december.next_anniversary(reference).to_string(),
            "2015-12-06"
        );

        // month/day already past: next year
        let may = date(2010, 5, 6);
        assert_eq!(may.next_anniversary(reference).to_string(), "2016-05-06");
    }

    #[test]
    fn test_next_anniversary_on_the_day_does_not_advance() {
        let subject = date(2010, 5, 6);
        let reference = datetime(2015, 5, 6, 23, 59, 59);
        assert_eq!(
            subject.next_anniversary(reference).to_string(),
            "2015-05-06"
        );
    }

    #[test]
    fn test_next_anniversary_keeps_time_of_day() {
        let subject = datetime(2010, 5, 6, 9, 30, 0);
        let reference = date(2015, 10, 31);
        let next = subject.next_anniversary(reference);
        assert_eq!(next.to_string(), "2016-05-06");
        assert_eq!(next.time(), TimeOfDay::new(9, 30, 0, 0).unwrap());
    }

    #[test]
    fn test_next_anniversary_leap_day_rolls_over() {
        let subject = date(2020, 2, 29);

        // 2021 is not a leap year: Feb 29 becomes Mar 1
        let reference = date(2021, 1, 15);
        assert_eq!(
            subject.next_anniversary(reference).to_string(),
            "2021-03-01"
        );

        // in a leap year the anniversary lands on Feb 29 itself
        let leap_reference = date(2024, 1, 15);
        assert_eq!(
            subject.next_anniversary(leap_reference).to_string(),
            "2024-02-29"
        );
    }

    #[test]
    fn test_next_anniversary_saturates_at_year_9999() {
        let subject = date(2010, 5, 6);

        // month/day still ahead: the final year works like any other
        let early_reference = date(9999, 1, 15);
        assert_eq!(
            subject.next_anniversary(early_reference).to_string(),
            "9999-05-06"
        );

        // month/day past: the candidate cannot advance beyond year 9999,
        // so it stays behind the reference and the day count goes negative
        let late_reference = date(9999, 10, 31);
        assert_eq!(
            subject.next_anniversary(late_reference).to_string(),
            "9999-05-06"
        );
        assert_eq!(subject.next_in_days(late_reference), -178);
    }

    #[test]
    fn test_next_in_days() {
        let reference = datetime(2015, 10, 31, 15, 45, 58);
        let subject = date(2010, 11, 1);
        assert_eq!(subject.next_in_days(reference), 1);
    }

    #[test]
    fn test_next_in_days_zero_on_the_day() {
        let subject = date(2010, 5, 6);
        let reference = datetime(2015, 5, 6, 12, 0, 0);
        assert_eq!(subject.next_in_days(reference), 0);
    }

    #[test]
    fn test_next_in_days_across_year_end() {
        let subject = date(2010, 1, 2);
        let reference = date(2015, 12, 31);
        // 2016 is a leap year but January is unaffected: Dec 31 -> Jan 2
        assert_eq!(subject.next_in_days(reference), 2);
    }

    #[test]
    fn test_day_number_epoch() {
        assert_eq!(date(1970, 1, 1).day_number(), 0);
        assert_eq!(date(1970, 1, 2).day_number(), 1);
        assert_eq!(date(1969, 12, 31).day_number(), -1);
        assert_eq!(date(2000, 3, 1).day_number(), 11017);
    }

    #[test]
    fn test_weekday() {
        struct TestCase {
            date: CalendarDate,
            weekday: u8,
            description: &'static str,
        }

        let cases = [
            TestCase {
                date: date(1970, 1, 1),
                weekday: 4,
                description: "epoch was a Thursday",
            },
            TestCase {
                date: date(2000, 1, 1),
                weekday: 6,
                description: "2000-01-01 was a Saturday",
            },
            TestCase {
                date: date(2015, 10, 31),
                weekday: 6,
                description: "2015-10-31 was a Saturday",
            },
            TestCase {
                date: date(2024, 2, 29),
                weekday: 4,
                description: "2024-02-29 was a Thursday",
            },
        ];

        for case in &cases {
            assert_eq!(case.date.weekday(), case.weekday, "{}", case.description);
        }
    }

    #[test]
    fn test_from_str() {
        let d = "1991-08-15".parse::<CalendarDate>().unwrap();
        assert_eq!((d.year(), d.month(), d.day()), (1991, 8, 15));

        let d = " 1991 - 08 - 15 ".parse::<CalendarDate>().unwrap();
        assert_eq!((d.year(), d.month(), d.day()), (1991, 8, 15));

        assert!(matches!(
            "1991-08".parse::<CalendarDate>(),
            Err(DateError::InvalidFormat(_))
        ));
        assert!(matches!(
            "".parse::<CalendarDate>(),
            Err(DateError::InvalidFormat(_))
        ));
        assert!(matches!(
            "1991-02-30".parse::<CalendarDate>(),
            Err(DateError::InvalidDay { .. })
        ));
    }

    #[test]
    fn test_serde_string_format() {
        let d = date(1991, 8, 15);
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, r#""1991-08-15""#);

        let parsed: CalendarDate = serde_json::from_str(&json).unwrap();
        assert_eq!(d, parsed);
    }

    #[test]
    fn test_serde_validation() {
        let result: Result<CalendarDate, _> = serde_json::from_str(r#""2024-02-30""#);
        assert!(result.is_err());

        let result: Result<CalendarDate, _> = serde_json::from_str(r#""2024-13-01""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_diff_display() {
        let diff = DateDiff {
            years: 8,
            months: 5,
            days: 25,
        };
        assert_eq!(diff.to_string(), "8y 5m 25d");
    }

    #[test]
    fn test_diff_serde() {
        let diff = DateDiff {
            years: 8,
            months: 5,
            days: 25,
        };
        let json = serde_json::to_string(&diff).unwrap();
        let parsed: DateDiff = serde_json::from_str(&json).unwrap();
        assert_eq!(diff, parsed);
    }
}
