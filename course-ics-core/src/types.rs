use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, de::IgnoredAny};

use crate::{Error, Result};

/// Day of the week in canonical order (Monday first).
///
/// The derived `Ord` is the canonical order used for sorting and iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Self; 7] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        }
    }

    /// Position in a week numbered Sunday=0 … Saturday=6.
    pub const fn sunday_index(self) -> u32 {
        match self {
            Self::Sunday => 0,
            Self::Monday => 1,
            Self::Tuesday => 2,
            Self::Wednesday => 3,
            Self::Thursday => 4,
            Self::Friday => 5,
            Self::Saturday => 6,
        }
    }

    /// Two-letter code used in `BYDAY`.
    pub const fn rrule_code(self) -> &'static str {
        match self {
            Self::Sunday => "SU",
            Self::Monday => "MO",
            Self::Tuesday => "TU",
            Self::Wednesday => "WE",
            Self::Thursday => "TH",
            Self::Friday => "FR",
            Self::Saturday => "SA",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Weekday {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|day| day.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| Error::Config(format!("Unknown weekday name: {trimmed}")))
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
        }
    }
}

/// Meeting days as they arrive from ingestion.
///
/// Deserializing never fails: list entries that are not weekday names are
/// dropped, and anything that is neither a list nor a string reads as no
/// days at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DaysInput {
    /// Already a list of weekday names, e.g. `["Monday", "Wednesday"]`.
    AlreadyCanonical(Vec<Weekday>),
    /// Compact letter code such as `MWF` or `TTh`.
    AbbreviatedCode(String),
}

impl Default for DaysInput {
    fn default() -> Self {
        Self::AlreadyCanonical(Vec::new())
    }
}

impl<'de> Deserialize<'de> for DaysInput {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawDays {
            Code(String),
            Names(Vec<serde_json::Value>),
            Other(IgnoredAny),
        }

        Ok(match RawDays::deserialize(deserializer)? {
            RawDays::Code(code) => Self::AbbreviatedCode(code),
            RawDays::Names(names) => Self::AlreadyCanonical(
                names
                    .iter()
                    .filter_map(|name| match name.as_str().map(str::parse::<Weekday>) {
                        Some(Ok(day)) => Some(day),
                        _ => {
                            tracing::debug!("Ignoring unrecognized weekday {}", name);
                            None
                        }
                    })
                    .collect(),
            ),
            RawDays::Other(_) => Self::default(),
        })
    }
}

/// Course row produced by OCR or manual entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCourseRecord {
    #[serde(alias = "courseNo")]
    pub course_code: String,
    #[serde(alias = "courseTitle")]
    pub title: String,
    pub instructor: String,
    pub days: DaysInput,
    #[serde(alias = "times")]
    pub time_range: String,
}

/// Authoritative location and term dates for one course code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceEntry {
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Fully resolved course ready for expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalCourse {
    pub course_code: String,
    pub title: String,
    pub instructor: String,
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: BTreeSet<Weekday>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// One weekly-recurring calendar event for a (course, weekday) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// `<courseCode>-<weekdayName>`
    pub id: String,
    pub course_code: String,
    pub title: String,
    pub instructor: String,
    pub location: String,
    pub weekday: Weekday,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub recurrence_until: DateTime<Utc>,
}

impl Event {
    pub fn event_id(course_code: &str, weekday: Weekday) -> String {
        format!("{}-{}", course_code, weekday.name())
    }

    /// Weekly rule for this event.
    ///
    /// `BYDAY` is read against the UTC `DTSTART`, so it names the UTC
    /// weekday of the first start instant. For daytime meetings that is
    /// `weekday` itself.
    pub fn recurrence(&self) -> RecurrenceRule {
        RecurrenceRule::weekly(self.recurrence_until, self.start.weekday().into())
    }
}

/// Weekly recurrence rule shared by the ICS and quick-add exporters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub until: DateTime<Utc>,
    pub by_day: Weekday,
}

impl RecurrenceRule {
    pub const fn weekly(until: DateTime<Utc>, by_day: Weekday) -> Self {
        Self { until, by_day }
    }

    /// Rule value without the `RRULE:` prefix.
    pub fn to_value(&self) -> String {
        format!(
            "FREQ=WEEKLY;UNTIL={};BYDAY={}",
            format_utc(&self.until),
            self.by_day.rrule_code()
        )
    }
}

/// `YYYYMMDDTHHMMSSZ`
pub fn format_utc(instant: &DateTime<Utc>) -> String {
    instant.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Options for the recurring-event document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcsOptions {
    pub calendar_name: Option<String>,
    /// Written as `X-WR-TIMEZONE`.
    pub timezone: Option<String>,
    /// Suffix appended to every event id to form the UID.
    pub uid_domain: String,
    pub include_description: bool,
    pub reminder_minutes: Option<u32>,
    /// Fixed `DTSTAMP`; when absent each event's `DTSTART` is used.
    pub dtstamp: Option<DateTime<Utc>>,
}

impl Default for IcsOptions {
    fn default() -> Self {
        Self {
            calendar_name: Some("Course Schedule".to_string()),
            timezone: Some(DEFAULT_TIMEZONE.to_string()),
            uid_domain: "course-ics.local".to_string(),
            include_description: true,
            reminder_minutes: None,
            dtstamp: None,
        }
    }
}

pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";
pub const DEFAULT_LOCATION: &str = "Room TBD";

/// Settings that apply to one whole compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Civil timezone every moment is computed in.
    pub timezone: Tz,
    /// Used when a course code has no reference entry at all.
    pub default_term: ReferenceEntry,
}

impl CompileOptions {
    pub fn with_timezone_name(name: &str) -> Result<Self> {
        Ok(Self {
            timezone: parse_timezone(name)?,
            ..Self::default()
        })
    }

    #[must_use]
    pub fn with_default_term(mut self, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        self.default_term.start_date = start_date;
        self.default_term.end_date = end_date;
        self
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::Los_Angeles,
            default_term: ReferenceEntry {
                location: DEFAULT_LOCATION.to_string(),
                start_date: NaiveDate::from_ymd_opt(2025, 8, 28).unwrap_or_default(),
                end_date: NaiveDate::from_ymd_opt(2025, 12, 12).unwrap_or_default(),
            },
        }
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    Tz::from_str(name.trim()).map_err(|_| Error::UnknownTimezone(name.to_string()))
}

/// `YYYY-MM-DD`
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")?)
}
