use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    CanonicalCourse, CompileOptions, Event, IcsOptions, RawCourseRecord, Result,
    expand::{EventExpander, SkipReason, SkipReport},
    ics::IcsGenerator,
    normalize::{NormalizedCourse, Normalizer, ValidationIssue},
    quick_add::{QuickAddLink, build_quick_add_links},
    reference::ReferenceTable,
};

/// Result of compiling one batch of course records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compilation {
    /// One entry per input record, in input order.
    pub courses: Vec<NormalizedCourse>,
    pub events: Vec<Event>,
    pub skips: SkipReport,
}

/// A record that failed at least one grammar check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedRecord {
    /// Position in the input batch.
    pub index: usize,
    pub course_code: String,
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub flagged: Vec<FlaggedRecord>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.flagged.is_empty()
    }
}

impl Compilation {
    pub fn validation_report(&self) -> ValidationReport {
        let flagged = self
            .courses
            .iter()
            .enumerate()
            .filter(|(_, normalized)| !normalized.is_valid())
            .map(|(index, normalized)| FlaggedRecord {
                index,
                course_code: normalized.course.course_code.clone(),
                issues: normalized.issues.clone(),
            })
            .collect();
        ValidationReport { flagged }
    }

    pub fn to_ics(&self, options: IcsOptions) -> Result<String> {
        IcsGenerator::new(options).generate(&self.events)
    }

    pub fn quick_add_links(&self) -> Result<Vec<QuickAddLink>> {
        build_quick_add_links(&self.events)
    }
}

/// Normalize and expand a batch of raw records.
///
/// Never fails: problems end up in the per-course issues and the skip
/// report.
pub fn compile(
    records: &[RawCourseRecord],
    table: &ReferenceTable,
    options: &CompileOptions,
) -> Compilation {
    let normalizer = Normalizer::new(table, options);
    let courses: Vec<NormalizedCourse> = records
        .iter()
        .map(|record| normalizer.normalize(record))
        .collect();

    let canonical: Vec<CanonicalCourse> = courses.iter().map(|n| n.course.clone()).collect();
    let (events, skips) = expand_courses(&canonical, options);

    tracing::info!(
        "Compiled {} records into {} events ({} courses skipped, {} events skipped)",
        records.len(),
        events.len(),
        skips.skipped_courses,
        skips.skipped_events
    );

    Compilation {
        courses,
        events,
        skips,
    }
}

/// Expand canonical courses, keeping event ids unique.
///
/// When two courses produce the same id the first one wins and the later
/// event is recorded as [`SkipReason::DuplicateId`].
pub fn expand_courses(
    courses: &[CanonicalCourse],
    options: &CompileOptions,
) -> (Vec<Event>, SkipReport) {
    let expander = EventExpander::new(options.timezone);
    let mut skips = SkipReport::default();
    let mut seen = HashSet::new();
    let mut events = Vec::new();

    for course in courses {
        for event in expander.expand(course, &mut skips) {
            if seen.insert(event.id.clone()) {
                events.push(event);
            } else {
                skips.skip_event(&event.course_code, event.weekday, SkipReason::DuplicateId);
            }
        }
    }

    (events, skips)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DaysInput, ReferenceEntry, Weekday};
    use chrono::{DateTime, NaiveDate, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn table() -> ReferenceTable {
        ReferenceTable::new()
            .with_entry(
                "MBA201A.1",
                ReferenceEntry {
                    location: "Chou Hall N270".to_string(),
                    start_date: date(2025, 8, 28),
                    end_date: date(2025, 12, 12),
                },
            )
            .with_entry(
                "MBA205.1",
                ReferenceEntry {
                    location: "Cheit C135".to_string(),
                    start_date: date(2025, 8, 28),
                    end_date: date(2025, 10, 10),
                },
            )
    }

    fn record(code: &str, days: DaysInput, time_range: &str) -> RawCourseRecord {
        RawCourseRecord {
            course_code: code.to_string(),
            title: "Course".to_string(),
            instructor: "Staff".to_string(),
            days,
            time_range: time_range.to_string(),
        }
    }

    fn batch() -> Vec<RawCourseRecord> {
        vec![
            record(
                "MBA201A.1",
                DaysInput::AlreadyCanonical(vec![Weekday::Monday, Weekday::Wednesday]),
                "9:00 AM - 10:30 AM",
            ),
            record(
                "MBA205.1",
                DaysInput::AbbreviatedCode("TTh".to_string()),
                "2:00 PM - 3:30 PM",
            ),
            record("MBA299", DaysInput::AbbreviatedCode(String::new()), "noon"),
        ]
    }

    #[test]
    fn test_end_to_end_example() {
        let compilation = compile(&batch()[..1], &table(), &CompileOptions::default());

        assert_eq!(compilation.events.len(), 2);
        assert!(compilation.skips.is_empty());
        assert!(compilation.validation_report().is_empty());

        let monday = &compilation.events[0];
        assert_eq!(monday.id, "MBA201A.1-Monday");
        assert_eq!(monday.start, utc("2025-09-01T16:00:00Z"));

        let wednesday = &compilation.events[1];
        assert_eq!(wednesday.id, "MBA201A.1-Wednesday");
        assert_eq!(wednesday.start, utc("2025-09-03T16:00:00Z"));
        assert_eq!(wednesday.end, utc("2025-09-03T17:30:00Z"));
    }

    #[test]
    fn test_batch_reports() {
        let compilation = compile(&batch(), &table(), &CompileOptions::default());

        assert_eq!(compilation.courses.len(), 3);
        assert_eq!(compilation.events.len(), 4);

        let report = compilation.validation_report();
        assert_eq!(report.flagged.len(), 1);
        assert_eq!(report.flagged[0].index, 2);
        assert_eq!(
            report.flagged[0].issues,
            vec![
                ValidationIssue::InvalidCourseCode,
                ValidationIssue::InvalidTimeRange,
                ValidationIssue::NoMeetingDays,
            ]
        );

        assert_eq!(compilation.skips.skipped_courses, 1);
        assert_eq!(compilation.skips.items[0].course_code, "MBA299");
        assert_eq!(compilation.skips.items[0].reason, SkipReason::NoMeetingDays);
        assert!(!compilation.events.iter().any(|e| e.course_code == "MBA299"));
    }

    #[test]
    fn test_fallback_time_still_produces_events() {
        let records = vec![record(
            "MBA201A.1",
            DaysInput::AbbreviatedCode("F".to_string()),
            "see syllabus",
        )];
        let compilation = compile(&records, &table(), &CompileOptions::default());

        assert_eq!(compilation.events.len(), 1);
        assert!(compilation.courses[0].time_fallback);
        // 2025-08-29 is the first Friday; 9:00 AM PDT.
        assert_eq!(compilation.events[0].start, utc("2025-08-29T16:00:00Z"));
        assert_eq!(compilation.validation_report().flagged.len(), 1);
    }

    #[test]
    fn test_bad_day_names_are_flagged_per_record() {
        let records: Vec<RawCourseRecord> = serde_json::from_str(
            r#"[
                {"courseCode":"MBA201A.1","days":["Monday","Wednesday"],"timeRange":"9:00 AM - 10:30 AM"},
                {"courseCode":"MBA205.1","days":["Thurs","someday"],"timeRange":"2:00 PM - 3:30 PM"}
            ]"#,
        )
        .unwrap();
        let compilation = compile(&records, &table(), &CompileOptions::default());

        assert_eq!(compilation.courses.len(), 2);
        assert_eq!(compilation.events.len(), 2);
        assert!(compilation.events.iter().all(|e| e.course_code == "MBA201A.1"));

        let report = compilation.validation_report();
        assert_eq!(report.flagged.len(), 1);
        assert_eq!(report.flagged[0].index, 1);
        assert_eq!(report.flagged[0].issues, vec![ValidationIssue::NoMeetingDays]);
        assert_eq!(compilation.skips.items[0].course_code, "MBA205.1");
        assert_eq!(compilation.skips.items[0].reason, SkipReason::NoMeetingDays);
    }

    #[test]
    fn test_duplicate_ids_first_wins() {
        let mut records = batch();
        records.truncate(1);
        let mut duplicate = records[0].clone();
        duplicate.days = DaysInput::AbbreviatedCode("WF".to_string());
        duplicate.time_range = "1:00 PM - 2:00 PM".to_string();
        records.push(duplicate);

        let compilation = compile(&records, &table(), &CompileOptions::default());
        let ids: Vec<_> = compilation.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["MBA201A.1-Monday", "MBA201A.1-Wednesday", "MBA201A.1-Friday"]
        );
        // The surviving Wednesday is the 9:00 AM one.
        assert_eq!(compilation.events[1].start, utc("2025-09-03T16:00:00Z"));

        assert_eq!(compilation.skips.skipped_events, 1);
        assert_eq!(compilation.skips.items[0].weekday, Some(Weekday::Wednesday));
        assert_eq!(compilation.skips.items[0].reason, SkipReason::DuplicateId);
    }

    #[test]
    fn test_compilation_is_idempotent() {
        let options = CompileOptions::default();
        let first = compile(&batch(), &table(), &options);
        let second = compile(&batch(), &table(), &options);
        assert_eq!(first, second);

        let ics_first = first.to_ics(IcsOptions::default()).unwrap();
        let ics_second = second.to_ics(IcsOptions::default()).unwrap();
        assert_eq!(ics_first.as_bytes(), ics_second.as_bytes());

        let canonical: Vec<_> = first.courses.iter().map(|n| n.course.clone()).collect();
        let (events_a, _) = expand_courses(&canonical, &options);
        let (events_b, _) = expand_courses(&canonical, &options);
        let generator = IcsGenerator::default();
        assert_eq!(
            generator.generate(&events_a).unwrap(),
            generator.generate(&events_b).unwrap()
        );
    }

    #[test]
    fn test_links_match_events() {
        let compilation = compile(&batch(), &table(), &CompileOptions::default());
        let links = compilation.quick_add_links().unwrap();
        let link_ids: Vec<_> = links.iter().map(|l| l.event_id.as_str()).collect();
        let event_ids: Vec<_> = compilation.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(link_ids, event_ids);
    }

    #[test]
    fn test_timezone_is_applied_uniformly() {
        let options = CompileOptions::with_timezone_name("America/New_York").unwrap();
        let compilation = compile(&batch()[..1], &table(), &options);
        assert_eq!(compilation.events[0].start, utc("2025-09-01T13:00:00Z"));
        assert_eq!(
            compilation.events[0].recurrence_until,
            utc("2025-12-13T04:59:59Z")
        );
    }
}
