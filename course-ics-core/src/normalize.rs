use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    CanonicalCourse, CompileOptions, RawCourseRecord,
    parse::{Parsed, TimeRange, decode_days, harmonize_time_range, parse_time_range},
    reference::{LookupSource, ReferenceTable},
};

static COURSE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]+\d{3}[A-Z]?\.\d+[A-Z]?$").expect("valid course code regex")
});

/// Grammar checks a raw record can fail. None of them drop the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationIssue {
    /// Not `<SUBJECT><3 digits>[letter].<section>[letter]`, e.g. `MBA201A.1`.
    InvalidCourseCode,
    /// Not a 12-hour `h:mm AM - h:mm PM` range; the default range was used.
    InvalidTimeRange,
    /// Start time is after end time.
    TimeRangeInverted,
    /// No weekday could be decoded.
    NoMeetingDays,
}

/// A canonical course plus everything the review table needs to know about
/// how it was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedCourse {
    pub course: CanonicalCourse,
    pub lookup_source: LookupSource,
    /// The meeting time is the fallback range, not what the record said.
    pub time_fallback: bool,
    pub issues: Vec<ValidationIssue>,
}

impl NormalizedCourse {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Merges raw records with the reference table.
pub struct Normalizer<'a> {
    table: &'a ReferenceTable,
    options: &'a CompileOptions,
}

impl<'a> Normalizer<'a> {
    pub const fn new(table: &'a ReferenceTable, options: &'a CompileOptions) -> Self {
        Self { table, options }
    }

    /// Location and term dates always come from the table (or its defaults).
    pub fn normalize(&self, record: &RawCourseRecord) -> NormalizedCourse {
        let course_code = record.course_code.trim().to_string();
        let resolved = self.table.lookup(&course_code, &self.options.default_term);
        tracing::debug!("{} resolved via {:?}", course_code, resolved.source);

        let times = resolve_time_range(&record.time_range);
        let days = decode_days(&record.days);
        let time_range = *times.value();

        let issues = collect_issues(&course_code, &times, days.is_empty());
        if !issues.is_empty() {
            tracing::debug!("{} flagged: {:?}", course_code, issues);
        }

        NormalizedCourse {
            course: CanonicalCourse {
                course_code,
                title: record.title.trim().to_string(),
                instructor: record.instructor.trim().to_string(),
                location: resolved.entry.location.clone(),
                start_date: resolved.entry.start_date,
                end_date: resolved.entry.end_date,
                days,
                start_time: time_range.start,
                end_time: time_range.end,
            },
            lookup_source: resolved.source,
            time_fallback: times.is_fallback(),
            issues,
        }
    }
}

/// Validate a raw record without consulting the reference table.
pub fn validate(record: &RawCourseRecord) -> Vec<ValidationIssue> {
    let times = resolve_time_range(&record.time_range);
    collect_issues(
        record.course_code.trim(),
        &times,
        decode_days(&record.days).is_empty(),
    )
}

/// Military-time ranges are rewritten to the 12-hour grammar first.
fn resolve_time_range(text: &str) -> Parsed<TimeRange> {
    match harmonize_time_range(text) {
        Some(harmonized) => parse_time_range(&harmonized),
        None => parse_time_range(text),
    }
}

fn collect_issues(
    course_code: &str,
    times: &Parsed<TimeRange>,
    no_days: bool,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if !COURSE_CODE_RE.is_match(course_code) {
        issues.push(ValidationIssue::InvalidCourseCode);
    }
    if times.is_fallback() {
        issues.push(ValidationIssue::InvalidTimeRange);
    } else if !times.value().is_ordered() {
        issues.push(ValidationIssue::TimeRangeInverted);
    }
    if no_days {
        issues.push(ValidationIssue::NoMeetingDays);
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DaysInput, ReferenceEntry, Weekday};
    use chrono::{NaiveDate, NaiveTime};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn table() -> ReferenceTable {
        ReferenceTable::new().with_entry(
            "MBA201A.1",
            ReferenceEntry {
                location: "Chou Hall N270".to_string(),
                start_date: date(2025, 8, 28),
                end_date: date(2025, 12, 12),
            },
        )
    }

    fn record(code: &str, days: DaysInput, time_range: &str) -> RawCourseRecord {
        RawCourseRecord {
            course_code: code.to_string(),
            title: " Microeconomics ".to_string(),
            instructor: "Wolfram".to_string(),
            days,
            time_range: time_range.to_string(),
        }
    }

    #[test]
    fn test_normalize_valid_record() {
        let table = table();
        let options = CompileOptions::default();
        let normalizer = Normalizer::new(&table, &options);

        let normalized = normalizer.normalize(&record(
            "MBA201A.1",
            DaysInput::AbbreviatedCode("MW".to_string()),
            "9:00 AM - 10:30 AM",
        ));

        assert!(normalized.is_valid());
        assert_eq!(normalized.lookup_source, LookupSource::Exact);
        assert!(!normalized.time_fallback);

        let course = normalized.course;
        assert_eq!(course.title, "Microeconomics");
        assert_eq!(course.location, "Chou Hall N270");
        assert_eq!(course.start_date, date(2025, 8, 28));
        assert_eq!(
            course.days.into_iter().collect::<Vec<_>>(),
            vec![Weekday::Monday, Weekday::Wednesday]
        );
        assert_eq!(course.start_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(course.end_time, NaiveTime::from_hms_opt(10, 30, 0).unwrap());
    }

    #[test]
    fn test_unknown_code_uses_defaults() {
        let table = table();
        let options =
            CompileOptions::default().with_default_term(date(2026, 1, 20), date(2026, 5, 8));
        let normalizer = Normalizer::new(&table, &options);

        let normalized = normalizer.normalize(&record(
            "EWMBA299.4",
            DaysInput::AbbreviatedCode("Sa".to_string()),
            "9:00 AM - 12:00 PM",
        ));

        assert_eq!(normalized.lookup_source, LookupSource::Default);
        assert_eq!(normalized.course.location, "Room TBD");
        assert_eq!(normalized.course.start_date, date(2026, 1, 20));
        assert_eq!(normalized.course.end_date, date(2026, 5, 8));
        assert!(normalized.is_valid());
    }

    #[test]
    fn test_flags_without_dropping() {
        let table = table();
        let options = CompileOptions::default();
        let normalizer = Normalizer::new(&table, &options);

        let normalized = normalizer.normalize(&record(
            "mba 201",
            DaysInput::AbbreviatedCode("??".to_string()),
            "sometime",
        ));

        assert_eq!(
            normalized.issues,
            vec![
                ValidationIssue::InvalidCourseCode,
                ValidationIssue::InvalidTimeRange,
                ValidationIssue::NoMeetingDays,
            ]
        );
        assert!(normalized.time_fallback);
        assert_eq!(normalized.course.start_time, TimeRange::fallback().start);
        assert_eq!(normalized.course.end_time, TimeRange::fallback().end);
    }

    #[test]
    fn test_military_time_is_harmonized() {
        let table = table();
        let options = CompileOptions::default();
        let normalizer = Normalizer::new(&table, &options);

        let normalized = normalizer.normalize(&record(
            "MBA201A.1",
            DaysInput::AlreadyCanonical(vec![Weekday::Tuesday]),
            "14:00-15:30",
        ));

        assert!(normalized.is_valid());
        assert_eq!(normalized.course.start_time, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        assert_eq!(normalized.course.end_time, NaiveTime::from_hms_opt(15, 30, 0).unwrap());
    }

    #[test]
    fn test_validate_course_codes() {
        let days = DaysInput::AbbreviatedCode("M".to_string());
        for code in ["MBA201A.1", "MBA201.12", "EWMBA290T.2B", "UGBA100.1"] {
            assert!(validate(&record(code, days.clone(), "9:00 AM - 10:00 AM")).is_empty(), "{code}");
        }
        for code in ["MBA201A", "MBA20.1", "201A.1", "MBA201A.", "mba201a.1"] {
            assert_eq!(
                validate(&record(code, days.clone(), "9:00 AM - 10:00 AM")),
                vec![ValidationIssue::InvalidCourseCode],
                "{code}"
            );
        }
    }

    #[test]
    fn test_validate_inverted_range() {
        let issues = validate(&record(
            "MBA201A.1",
            DaysInput::AbbreviatedCode("F".to_string()),
            "3:00 PM - 1:00 PM",
        ));
        assert_eq!(issues, vec![ValidationIssue::TimeRangeInverted]);
    }
}
