use serde::{Deserialize, Serialize};

use crate::{
    RawCourseRecord,
    parse::{Parsed, decode_days, harmonize_time_range, parse_time_range},
};

/// Editable column of the review table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CourseField {
    CourseCode,
    Title,
    Instructor,
    Days,
    TimeRange,
}

/// Fields of `edited` that differ from the `original` record.
///
/// Days are compared after decoding, so `MW` and `["Monday", "Wednesday"]`
/// count as unchanged. Time ranges are compared by value when both parse.
pub fn changed_fields(original: &RawCourseRecord, edited: &RawCourseRecord) -> Vec<CourseField> {
    let mut changed = Vec::new();
    if original.course_code.trim() != edited.course_code.trim() {
        changed.push(CourseField::CourseCode);
    }
    if original.title.trim() != edited.title.trim() {
        changed.push(CourseField::Title);
    }
    if original.instructor.trim() != edited.instructor.trim() {
        changed.push(CourseField::Instructor);
    }
    if decode_days(&original.days) != decode_days(&edited.days) {
        changed.push(CourseField::Days);
    }
    if !same_time_range(&original.time_range, &edited.time_range) {
        changed.push(CourseField::TimeRange);
    }
    changed
}

fn same_time_range(a: &str, b: &str) -> bool {
    let parse = |text: &str| {
        let text = harmonize_time_range(text).unwrap_or_else(|| text.to_string());
        match parse_time_range(&text) {
            Parsed::Parsed(range) => Some(range),
            Parsed::Fallback(_) => None,
        }
    };
    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a.trim() == b.trim(),
    }
}
