//! Expansion of canonical courses into weekly-recurring events.
//!
//! Each scheduled weekday becomes one event anchored on the first matching
//! date on or after the term start, recurring weekly until the end of the
//! last term day.

use chrono::{Datelike, Days, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{CanonicalCourse, Error, Event, Result, Weekday, moment::MomentBuilder};

/// Why a course or a single (course, weekday) pair produced no event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SkipReason {
    NoMeetingDays,
    TimeRangeInverted,
    TermInverted,
    ExpansionFailed { message: String },
    /// Another event with the same id was already emitted.
    DuplicateId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedItem {
    pub course_code: String,
    /// `None` when the whole course was skipped.
    pub weekday: Option<Weekday>,
    pub reason: SkipReason,
}

/// Everything that was left out of an event list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipReport {
    /// Number of dropped (course, weekday) pairs.
    pub skipped_events: usize,
    /// Number of courses that produced no events at all.
    pub skipped_courses: usize,
    pub items: Vec<SkippedItem>,
}

impl SkipReport {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn skip_course(&mut self, course_code: &str, reason: SkipReason) {
        tracing::warn!("Skipping course {}: {:?}", course_code, reason);
        self.skipped_courses += 1;
        self.items.push(SkippedItem {
            course_code: course_code.to_string(),
            weekday: None,
            reason,
        });
    }

    pub fn skip_event(&mut self, course_code: &str, weekday: Weekday, reason: SkipReason) {
        tracing::warn!("Skipping {} on {}: {:?}", course_code, weekday, reason);
        self.skipped_events += 1;
        self.items.push(SkippedItem {
            course_code: course_code.to_string(),
            weekday: Some(weekday),
            reason,
        });
    }
}

/// Smallest non-negative shift from `start_index` to `day_index`, both
/// numbered Sunday=0 … Saturday=6.
pub const fn day_offset(day_index: u32, start_index: u32) -> u32 {
    (day_index + 7 - start_index) % 7
}

/// First date on or after `term_start` that falls on `weekday`.
pub fn first_occurrence(term_start: NaiveDate, weekday: Weekday) -> Result<NaiveDate> {
    let offset = day_offset(
        weekday.sunday_index(),
        term_start.weekday().num_days_from_sunday(),
    );
    term_start
        .checked_add_days(Days::new(u64::from(offset)))
        .ok_or_else(|| Error::DateOverflow(format!("{term_start} + {offset} days")))
}

pub struct EventExpander {
    moments: MomentBuilder,
}

impl EventExpander {
    pub const fn new(timezone: Tz) -> Self {
        Self {
            moments: MomentBuilder::new(timezone),
        }
    }

    /// One event per weekday, in canonical weekday order.
    ///
    /// A course that cannot produce any event is counted in `skips` as a
    /// whole; a failure on one weekday only drops that weekday.
    pub fn expand(&self, course: &CanonicalCourse, skips: &mut SkipReport) -> Vec<Event> {
        if course.days.is_empty() {
            skips.skip_course(&course.course_code, SkipReason::NoMeetingDays);
            return Vec::new();
        }
        if course.start_time > course.end_time {
            skips.skip_course(&course.course_code, SkipReason::TimeRangeInverted);
            return Vec::new();
        }
        if course.start_date > course.end_date {
            skips.skip_course(&course.course_code, SkipReason::TermInverted);
            return Vec::new();
        }

        let mut events = Vec::with_capacity(course.days.len());
        for &weekday in &course.days {
            match self.expand_weekday(course, weekday) {
                Ok(event) => events.push(event),
                Err(e) => skips.skip_event(
                    &course.course_code,
                    weekday,
                    SkipReason::ExpansionFailed {
                        message: e.to_string(),
                    },
                ),
            }
        }
        if events.is_empty() {
            tracing::warn!("Course {} produced no events", course.course_code);
            skips.skipped_courses += 1;
        }
        events
    }

    pub fn expand_weekday(&self, course: &CanonicalCourse, weekday: Weekday) -> Result<Event> {
        let first = first_occurrence(course.start_date, weekday)?;

        Ok(Event {
            id: Event::event_id(&course.course_code, weekday),
            course_code: course.course_code.clone(),
            title: course.title.clone(),
            instructor: course.instructor.clone(),
            location: course.location.clone(),
            weekday,
            start: self.moments.at(first, course.start_time)?,
            end: self.moments.at(first, course.end_time)?,
            recurrence_until: self.moments.end_of_day(course.end_date)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveTime, Utc};
    use chrono_tz::America::Los_Angeles;
    use std::collections::{BTreeSet, HashSet};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn course(days: &[Weekday]) -> CanonicalCourse {
        CanonicalCourse {
            course_code: "MBA201A.1".to_string(),
            title: "Microeconomics".to_string(),
            instructor: "Wolfram".to_string(),
            location: "Chou Hall N270".to_string(),
            start_date: date(2025, 8, 28),
            end_date: date(2025, 12, 12),
            days: days.iter().copied().collect::<BTreeSet<_>>(),
            start_time: time(9, 0),
            end_time: time(10, 30),
        }
    }

    #[test]
    fn test_day_offset() {
        // Term starts Wednesday (3), target Monday (1).
        assert_eq!(day_offset(1, 3), 5);
        assert_eq!(day_offset(3, 3), 0);
        assert_eq!(day_offset(0, 6), 1);
        assert_eq!(day_offset(6, 0), 6);
    }

    #[test]
    fn test_first_occurrence() {
        // 2025-08-28 is a Thursday.
        let start = date(2025, 8, 28);
        assert_eq!(first_occurrence(start, Weekday::Monday).unwrap(), date(2025, 9, 1));
        assert_eq!(first_occurrence(start, Weekday::Wednesday).unwrap(), date(2025, 9, 3));
        assert_eq!(first_occurrence(start, Weekday::Thursday).unwrap(), start);
        assert_eq!(first_occurrence(start, Weekday::Sunday).unwrap(), date(2025, 8, 31));
    }

    #[test]
    fn test_first_occurrence_overflow() {
        let next_day: Weekday = NaiveDate::MAX.weekday().succ().into();
        assert!(matches!(
            first_occurrence(NaiveDate::MAX, next_day),
            Err(Error::DateOverflow(_))
        ));
        assert_eq!(
            first_occurrence(NaiveDate::MAX, NaiveDate::MAX.weekday().into()).unwrap(),
            NaiveDate::MAX
        );
    }

    #[test]
    fn test_expand_monday_wednesday() {
        let expander = EventExpander::new(Los_Angeles);
        let mut skips = SkipReport::default();
        let events = expander.expand(&course(&[Weekday::Wednesday, Weekday::Monday]), &mut skips);

        assert!(skips.is_empty());
        assert_eq!(events.len(), 2);

        let monday = &events[0];
        assert_eq!(monday.id, "MBA201A.1-Monday");
        assert_eq!(monday.weekday, Weekday::Monday);
        assert_eq!(monday.start, utc("2025-09-01T16:00:00Z"));
        assert_eq!(monday.end, utc("2025-09-01T17:30:00Z"));
        assert_eq!(monday.recurrence_until, utc("2025-12-13T07:59:59Z"));

        let wednesday = &events[1];
        assert_eq!(wednesday.id, "MBA201A.1-Wednesday");
        assert_eq!(wednesday.start, utc("2025-09-03T16:00:00Z"));
        assert_eq!(wednesday.location, "Chou Hall N270");
    }

    #[test]
    fn test_one_event_per_weekday_with_unique_ids() {
        let expander = EventExpander::new(Los_Angeles);
        let mut skips = SkipReport::default();
        let events = expander.expand(&course(&Weekday::ALL), &mut skips);

        assert_eq!(events.len(), 7);
        let ids: HashSet<_> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids.len(), 7);
    }

    #[test]
    fn test_empty_days_skips_course() {
        let expander = EventExpander::new(Los_Angeles);
        let mut skips = SkipReport::default();
        let events = expander.expand(&course(&[]), &mut skips);

        assert!(events.is_empty());
        assert_eq!(skips.skipped_courses, 1);
        assert_eq!(skips.items[0].reason, SkipReason::NoMeetingDays);
        assert_eq!(skips.items[0].weekday, None);
    }

    #[test]
    fn test_inverted_time_and_term_skip_course() {
        let expander = EventExpander::new(Los_Angeles);
        let mut skips = SkipReport::default();

        let mut inverted_time = course(&[Weekday::Monday]);
        inverted_time.start_time = time(11, 0);
        assert!(expander.expand(&inverted_time, &mut skips).is_empty());

        let mut inverted_term = course(&[Weekday::Monday]);
        inverted_term.end_date = date(2025, 8, 1);
        assert!(expander.expand(&inverted_term, &mut skips).is_empty());

        let reasons: Vec<_> = skips.items.iter().map(|i| i.reason.clone()).collect();
        assert_eq!(reasons, vec![SkipReason::TimeRangeInverted, SkipReason::TermInverted]);
        assert_eq!(skips.skipped_courses, 2);
        assert_eq!(skips.skipped_events, 0);
    }

    #[test]
    fn test_failed_weekday_only_drops_that_weekday() {
        let expander = EventExpander::new(Los_Angeles);
        let mut skips = SkipReport::default();

        // 02:30 on 2026-03-08 (a Sunday) does not exist in Los Angeles.
        let mut course = course(&[Weekday::Sunday, Weekday::Monday]);
        course.start_date = date(2026, 3, 8);
        course.end_date = date(2026, 5, 8);
        course.start_time = time(2, 30);
        course.end_time = time(3, 30);

        let events = expander.expand(&course, &mut skips);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].weekday, Weekday::Monday);
        assert_eq!(skips.skipped_events, 1);
        assert_eq!(skips.items[0].weekday, Some(Weekday::Sunday));
        assert!(matches!(skips.items[0].reason, SkipReason::ExpansionFailed { .. }));
        assert_eq!(skips.skipped_courses, 0);
    }

    #[test]
    fn test_course_with_every_weekday_failing_counts_as_skipped() {
        let expander = EventExpander::new(Los_Angeles);
        let mut skips = SkipReport::default();

        let mut course = course(&[Weekday::Sunday]);
        course.start_date = date(2026, 3, 8);
        course.end_date = date(2026, 5, 8);
        course.start_time = time(2, 30);
        course.end_time = time(3, 30);

        assert!(expander.expand(&course, &mut skips).is_empty());
        assert_eq!(skips.skipped_events, 1);
        assert_eq!(skips.skipped_courses, 1);
        assert_eq!(skips.items.len(), 1);
        assert_eq!(skips.items[0].weekday, Some(Weekday::Sunday));
    }
}
