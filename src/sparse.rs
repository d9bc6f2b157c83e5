use crate::CalendarDate;
use crate::consts::{
    DAY_TOKEN, DECEMBER, ISO_PATTERN, JANUARY, MAX_MONTH, MIN_DAY, MONTH_TOKEN, UNKNOWN_DIGIT,
    YEAR_TOKEN,
};
use crate::types::days_in_month;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

const YEAR_WIDTH: usize = 4;
const COMPONENT_WIDTH: usize = 2;

/// One character position of a sparse field: a known decimal digit, the
/// `?` placeholder, or a stray byte that is neither. A stray byte is kept
/// verbatim for rendering but poisons resolution of its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DigitSlot {
    Known(u8),
    Unknown,
    Stray(u8),
}

impl DigitSlot {
    const fn from_byte(byte: u8) -> Self {
        if byte.is_ascii_digit() {
            Self::Known(byte - b'0')
        } else if byte == UNKNOWN_DIGIT as u8 {
            Self::Unknown
        } else {
            Self::Stray(byte)
        }
    }

    const fn as_char(self) -> char {
        match self {
            Self::Known(digit) => (b'0' + digit) as char,
            Self::Unknown => UNKNOWN_DIGIT,
            Self::Stray(byte) => byte as char,
        }
    }
}

/// A date pattern holding the `YYYY`, `MM` and `DD` tokens at fixed byte
/// offsets, e.g. `YYYY-MM-DD` or `DD.MM.YYYY`. The token offsets decide
/// which span of an input string feeds which field of a [`SparseDate`],
/// and where the fields land when rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    pattern: String,
    year_at: usize,
    month_at: usize,
    day_at: usize,
}

/// Error type for date pattern handling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// A required token does not occur in the pattern.
    #[error("Pattern {pattern:?} is missing the {token} token")]
    MissingToken {
        token: &'static str,
        pattern: String,
    },

    /// A token occurs more than once in the pattern.
    #[error("Pattern {pattern:?} repeats the {token} token")]
    DuplicateToken {
        token: &'static str,
        pattern: String,
    },
}

impl DateFormat {
    /// Parses a pattern, locating all three tokens.
    ///
    /// # Errors
    /// Returns `FormatError` if a token is missing or occurs twice.
    pub fn new(pattern: &str) -> Result<Self, FormatError> {
        let year_at = locate(pattern, YEAR_TOKEN)?;
        let month_at = locate(pattern, MONTH_TOKEN)?;
        let day_at = locate(pattern, DAY_TOKEN)?;
        Ok(Self {
            pattern: pattern.to_owned(),
            year_at,
            month_at,
            day_at,
        })
    }

    /// The original pattern text.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl Default for DateFormat {
    fn default() -> Self {
        // Token offsets within ISO_PATTERN; kept in sync by a test.
        Self {
            pattern: ISO_PATTERN.to_owned(),
            year_at: 0,
            month_at: 5,
            day_at: 8,
        }
    }
}

fn locate(pattern: &str, token: &'static str) -> Result<usize, FormatError> {
    let at = pattern.find(token).ok_or_else(|| FormatError::MissingToken {
        token,
        pattern: pattern.to_owned(),
    })?;
    if pattern[at + token.len()..].contains(token) {
        return Err(FormatError::DuplicateToken {
            token,
            pattern: pattern.to_owned(),
        });
    }
    Ok(at)
}

/// A date whose digits may be only partially known, e.g. `196?-03-??` or
/// `20??-05-08`.
///
/// Each field is captured verbatim from input text at the offsets a
/// [`DateFormat`] dictates; a field the input was too short to supply
/// stays unparsed. Values are immutable after parsing, and bounds are
/// recomputed from the fields on every call, never cached.
#[derive(Debug, Clone, Copy, Default)]
pub struct SparseDate {
    year: Option<[DigitSlot; YEAR_WIDTH]>,
    month: Option<[DigitSlot; COMPONENT_WIDTH]>,
    day: Option<[DigitSlot; COMPONENT_WIDTH]>,
}

impl SparseDate {
    /// Parses `input` against the default ISO pattern (`YYYY-MM-DD`).
    pub fn from_iso(input: &str) -> Self {
        Self::parse(input, &DateFormat::default())
    }

    /// Parses `input` against `format`. Each token whose span fits within
    /// the input captures that span verbatim, `?` markers included; a
    /// token reaching past the end of the input leaves its field unparsed.
    /// Parsing itself never fails.
    pub fn parse(input: &str, format: &DateFormat) -> Self {
        let bytes = input.as_bytes();
        Self {
            year: capture(bytes, format.year_at),
            month: capture(bytes, format.month_at),
            day: capture(bytes, format.day_at),
        }
    }

    /// True when every field is present and contains no unknown digit.
    pub fn is_complete(&self) -> bool {
        known(&self.year) && known(&self.month) && known(&self.day)
    }

    /// True when the year is present and contains no unknown digit.
    pub fn is_complete_year(&self) -> bool {
        known(&self.year)
    }

    /// True when month and day are present and contain no unknown digit.
    pub fn is_complete_day_and_month(&self) -> bool {
        known(&self.day) && known(&self.month)
    }

    /// True when no field was parsed at all. A field made up entirely of
    /// `?` markers is present, not empty.
    pub fn is_empty(&self) -> bool {
        self.year.is_none() && self.month.is_none() && self.day.is_none()
    }

    /// The year field as text with markers preserved, if parsed.
    pub fn year_text(&self) -> Option<String> {
        self.year.as_ref().map(text)
    }

    /// The year as a number, only when all four digits are known.
    pub fn year_value(&self) -> Option<u16> {
        self.year.as_ref().and_then(|field| {
            field.iter().try_fold(0_u16, |acc, slot| match slot {
                DigitSlot::Known(digit) => Some(acc * 10 + u16::from(*digit)),
                DigitSlot::Unknown | DigitSlot::Stray(_) => None,
            })
        })
    }

    /// Earliest concrete date consistent with the known digits: unknown
    /// year digits become 0, a fully unknown month becomes January, a
    /// fully unknown day becomes the 1st.
    ///
    /// `None` when a field is unparsed or carries a stray non-digit byte,
    /// a month or day is only partially known, or the substituted digits
    /// do not form a valid date.
    pub fn min_date(&self) -> Option<CalendarDate> {
        let year = substituted_year(self.year.as_ref()?, 0)?;
        let month = resolve_component(self.month.as_ref()?, JANUARY)?;
        let day = resolve_component(self.day.as_ref()?, MIN_DAY)?;
        CalendarDate::new(year, month, day).ok()
    }

    /// Latest concrete date consistent with the known digits: unknown year
    /// digits become 9, a fully unknown month becomes December, and a
    /// fully unknown day becomes the last day of the month — judged in the
    /// already-substituted year, so `2?0?-02-??` caps at February 28 of
    /// 2909, not at a leap day.
    ///
    /// `None` under the same conditions as [`Self::min_date`].
    pub fn max_date(&self) -> Option<CalendarDate> {
        let year = substituted_year(self.year.as_ref()?, 9)?;
        let month = resolve_component(self.month.as_ref()?, DECEMBER)?;

        let day_field = self.day.as_ref()?;
        let day = if all_unknown(day_field) {
            if !(JANUARY..=MAX_MONTH).contains(&month) {
                return None;
            }
            days_in_month(year, month)
        } else {
            component_value(day_field)?
        };

        CalendarDate::new(year, month, day).ok()
    }

    /// The exact date this value names, only when it is complete and the
    /// digits form a valid date.
    pub fn resolved(&self) -> Option<CalendarDate> {
        if self.is_complete() {
            self.min_date()
        } else {
            None
        }
    }

    /// Renders against `format` by substituting each token with its
    /// field's literal text, `?` markers included. When month and day are
    /// both fully unknown the pattern collapses to the bare year token
    /// whatever the requested layout. Returns an empty string for an empty
    /// value, or when the collapsed year has no known digit.
    pub fn format(&self, format: &DateFormat) -> String {
        if self.is_empty() {
            return String::new();
        }

        if unknown_marker(&self.month) && unknown_marker(&self.day) {
            // year-only value: nothing but the year is worth rendering
            return match &self.year {
                Some(field) if !all_unknown(field) => text(field),
                _ => String::new(),
            };
        }

        format
            .pattern()
            .replace(YEAR_TOKEN, &optional_text(&self.year))
            .replace(MONTH_TOKEN, &optional_text(&self.month))
            .replace(DAY_TOKEN, &optional_text(&self.day))
    }

    /// Bare year when the year is complete and both month and day are the
    /// fully-unknown marker; otherwise the same as [`Self::format`].
    pub fn format_short(&self, format: &DateFormat) -> String {
        if self.is_complete_year() && unknown_marker(&self.month) && unknown_marker(&self.day) {
            return optional_text(&self.year);
        }
        self.format(format)
    }
}

// --- field helpers ---

fn capture<const W: usize>(input: &[u8], offset: usize) -> Option<[DigitSlot; W]> {
    if input.len() < offset + W {
        return None;
    }
    let mut slots = [DigitSlot::Unknown; W];
    for (i, slot) in slots.iter_mut().enumerate() {
        *slot = DigitSlot::from_byte(input[offset + i]);
    }
    Some(slots)
}

fn all_known<const W: usize>(field: &[DigitSlot; W]) -> bool {
    field.iter().all(|slot| matches!(slot, DigitSlot::Known(_)))
}

fn all_unknown<const W: usize>(field: &[DigitSlot; W]) -> bool {
    field.iter().all(|slot| matches!(slot, DigitSlot::Unknown))
}

// present and free of unknown digits
fn known<const W: usize>(field: &Option<[DigitSlot; W]>) -> bool {
    field.as_ref().is_some_and(all_known)
}

// present and made up entirely of the `?` marker
fn unknown_marker<const W: usize>(field: &Option<[DigitSlot; W]>) -> bool {
    field.as_ref().is_some_and(all_unknown)
}

fn text<const W: usize>(field: &[DigitSlot; W]) -> String {
    field.iter().map(|slot| slot.as_char()).collect()
}

fn optional_text<const W: usize>(field: &Option<[DigitSlot; W]>) -> String {
    field.as_ref().map(text).unwrap_or_default()
}

fn substituted_year(field: &[DigitSlot; YEAR_WIDTH], fill: u8) -> Option<u16> {
    field.iter().try_fold(0, |acc, slot| {
        let digit = match slot {
            DigitSlot::Known(digit) => *digit,
            DigitSlot::Unknown => fill,
            DigitSlot::Stray(_) => return None,
        };
        Some(acc * 10 + u16::from(digit))
    })
}

fn component_value(field: &[DigitSlot; COMPONENT_WIDTH]) -> Option<u8> {
    match field {
        [DigitSlot::Known(tens), DigitSlot::Known(ones)] => Some(tens * 10 + ones),
        _ => None,
    }
}

// A fully unknown component takes the given substitute; a fully known one
// keeps its value; a half-known one resolves to nothing.
fn resolve_component(field: &[DigitSlot; COMPONENT_WIDTH], when_unknown: u8) -> Option<u8> {
    if all_unknown(field) {
        return Some(when_unknown);
    }
    component_value(field)
}

impl fmt::Display for SparseDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(&DateFormat::default()))
    }
}

impl FromStr for SparseDate {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_iso(s))
    }
}

impl Serialize for SparseDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SparseDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_iso(&s))
    }
}
