//! Field parsers for raw weekday codes and meeting-time text.
//!
//! Parsing is fail-soft: malformed text never produces an error. Instead the
//! parsers return [`Parsed::Fallback`] carrying a documented default, so the
//! caller can both keep going and report what happened.

use std::{collections::BTreeSet, fmt, sync::LazyLock};

use chrono::{NaiveTime, Timelike};
use regex::Regex;

use crate::{DaysInput, Weekday};

/// Outcome of a fail-soft parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parsed<T> {
    /// The input was understood.
    Parsed(T),
    /// The input was malformed; the value is the documented default.
    Fallback(T),
}

impl<T> Parsed<T> {
    pub const fn value(&self) -> &T {
        match self {
            Self::Parsed(value) | Self::Fallback(value) => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Parsed(value) | Self::Fallback(value) => value,
        }
    }

    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Two-character tokens are tried before single letters.
const TWO_LETTER_DAYS: [(&str, Weekday); 3] = [
    ("th", Weekday::Thursday),
    ("sa", Weekday::Saturday),
    ("su", Weekday::Sunday),
];

const ONE_LETTER_DAYS: [(char, Weekday); 4] = [
    ('m', Weekday::Monday),
    ('t', Weekday::Tuesday),
    ('w', Weekday::Wednesday),
    ('f', Weekday::Friday),
];

/// Resolve either form of day input into the canonical weekday set.
pub fn decode_days(input: &DaysInput) -> BTreeSet<Weekday> {
    match input {
        DaysInput::AlreadyCanonical(days) => days.iter().copied().collect(),
        DaysInput::AbbreviatedCode(code) => decode_day_code(code),
    }
}

/// Greedy left-to-right decoding of codes like `MWF`, `TTh` or `SaSu`.
///
/// Unrecognized characters are skipped.
pub fn decode_day_code(code: &str) -> BTreeSet<Weekday> {
    let chars: Vec<char> = code.chars().map(|c| c.to_ascii_lowercase()).collect();
    let mut days = BTreeSet::new();
    let mut i = 0;

    while i < chars.len() {
        if let Some(&next) = chars.get(i + 1) {
            let pair: String = [chars[i], next].iter().collect();
            if let Some((_, day)) = TWO_LETTER_DAYS.iter().find(|(token, _)| *token == pair) {
                days.insert(*day);
                i += 2;
                continue;
            }
        }

        if let Some((_, day)) = ONE_LETTER_DAYS.iter().find(|(token, _)| *token == chars[i]) {
            days.insert(*day);
        } else if !chars[i].is_whitespace() && chars[i] != ',' {
            tracing::debug!("Skipping unrecognized day code character {:?}", chars[i]);
        }
        i += 1;
    }

    days
}

/// Start and end wall-clock time of a meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    /// `9:00 AM - 10:00 AM`
    pub fn fallback() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default(),
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            format_twelve_hour(self.start),
            format_twelve_hour(self.end)
        )
    }
}

const RANGE_SEPARATOR: &str = " - ";

static TWELVE_HOUR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2}):(\d{2})\s*([AP])\.?M\.?$").expect("valid twelve-hour regex")
});

static TWENTY_FOUR_HOUR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):?(\d{2})$").expect("valid twenty-four-hour regex")
});

static MERIDIEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[AP]\.?M\b").expect("valid meridiem regex"));

/// Parse `"<start> - <end>"` in 12-hour form.
///
/// Anything else yields [`Parsed::Fallback`] with [`TimeRange::fallback`].
pub fn parse_time_range(text: &str) -> Parsed<TimeRange> {
    let parts: Vec<&str> = text.split(RANGE_SEPARATOR).map(str::trim).collect();
    let [start, end] = parts.as_slice() else {
        return Parsed::Fallback(TimeRange::fallback());
    };

    match (parse_twelve_hour(start), parse_twelve_hour(end)) {
        (Some(start), Some(end)) => Parsed::Parsed(TimeRange { start, end }),
        _ => Parsed::Fallback(TimeRange::fallback()),
    }
}

/// Convert `"h:mm AM|PM"` into a 24-hour wall-clock time.
///
/// 12 AM is hour 0, 12 PM is hour 12, any other PM hour gains 12.
pub fn parse_twelve_hour(text: &str) -> Option<NaiveTime> {
    let caps = TWELVE_HOUR_RE.captures(text.trim())?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    if !(1..=12).contains(&hour) {
        return None;
    }

    let is_pm = caps[3].eq_ignore_ascii_case("p");
    let hour = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
}

pub fn format_twelve_hour(time: NaiveTime) -> String {
    let (is_pm, hour) = time.hour12();
    format!(
        "{}:{:02} {}",
        hour,
        time.minute(),
        if is_pm { "PM" } else { "AM" }
    )
}

/// Convert military time (`"13:30"` or `"1330"`) into `"1:30 PM"`.
pub fn to_twelve_hour(text: &str) -> Option<String> {
    let caps = TWENTY_FOUR_HOUR_RE.captures(text.trim())?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0).map(format_twelve_hour)
}

/// Rewrite a military-time range into the 12-hour range grammar.
///
/// Text that already carries a meridiem, or that cannot be read as two
/// 24-hour times, is returned as `None` and should be parsed as-is.
pub fn harmonize_time_range(text: &str) -> Option<String> {
    if MERIDIEM_RE.is_match(text) {
        return None;
    }

    let (start, end) = text.split_once('-')?;
    let start = to_twelve_hour(start)?;
    let end = to_twelve_hour(end)?;
    Some(format!("{start}{RANGE_SEPARATOR}{end}"))
}
