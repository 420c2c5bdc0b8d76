use crate::{Error, Event, IcsOptions, Result, format_utc};

/// Maximum octets per content line, excluding CRLF.
const MAX_LINE_OCTETS: usize = 75;

/// Recurring-event document generator.
///
/// Output depends only on the events and options: the same input always
/// produces the same bytes.
pub struct IcsGenerator {
    options: IcsOptions,
}

impl IcsGenerator {
    pub const fn new(options: IcsOptions) -> Self {
        Self { options }
    }

    /// Render a complete `VCALENDAR` with one `VEVENT` per event.
    pub fn generate(&self, events: &[Event]) -> Result<String> {
        let domain = self.options.uid_domain.trim();
        if domain.is_empty() || domain.contains(char::is_whitespace) {
            return Err(Error::IcsGeneration(format!(
                "Invalid UID domain: {:?}",
                self.options.uid_domain
            )));
        }

        let mut ics_content = String::new();

        push_line(&mut ics_content, "BEGIN:VCALENDAR");
        push_line(&mut ics_content, "VERSION:2.0");
        push_line(&mut ics_content, "PRODID:-//Course ICS//Course Schedule Compiler//EN");
        push_line(&mut ics_content, "CALSCALE:GREGORIAN");
        push_line(&mut ics_content, "METHOD:PUBLISH");

        if let Some(ref name) = self.options.calendar_name {
            push_line(&mut ics_content, &format!("X-WR-CALNAME:{}", escape_text(name)));
        }

        if let Some(ref timezone) = self.options.timezone {
            push_line(&mut ics_content, &format!("X-WR-TIMEZONE:{timezone}"));
        }

        for event in events {
            self.add_event(&mut ics_content, event, domain);
        }

        push_line(&mut ics_content, "END:VCALENDAR");

        tracing::debug!("Generated ICS with {} events", events.len());
        Ok(ics_content)
    }

    fn add_event(&self, ics_content: &mut String, event: &Event, domain: &str) {
        let dtstart = format_utc(&event.start);
        let dtstamp = self
            .options
            .dtstamp
            .as_ref()
            .map_or_else(|| dtstart.clone(), format_utc);

        push_line(ics_content, "BEGIN:VEVENT");
        push_line(ics_content, &format!("UID:{}@{}", escape_text(&event.id), domain));
        push_line(ics_content, &format!("DTSTAMP:{dtstamp}"));
        push_line(ics_content, &format!("DTSTART:{dtstart}"));
        push_line(ics_content, &format!("DTEND:{}", format_utc(&event.end)));
        push_line(ics_content, &format!("RRULE:{}", event.recurrence().to_value()));
        push_line(
            ics_content,
            &format!("SUMMARY:{}", escape_text(&build_event_title(event))),
        );
        push_line(ics_content, &format!("LOCATION:{}", escape_text(&event.location)));

        if self.options.include_description {
            push_line(
                ics_content,
                &format!("DESCRIPTION:{}", escape_text(&build_event_description(event))),
            );
        }

        if let Some(reminder_minutes) = self.options.reminder_minutes {
            push_line(ics_content, "BEGIN:VALARM");
            push_line(ics_content, "ACTION:DISPLAY");
            push_line(
                ics_content,
                &format!("DESCRIPTION:{}", escape_text(&build_event_title(event))),
            );
            push_line(ics_content, &format!("TRIGGER:-PT{reminder_minutes}M"));
            push_line(ics_content, "END:VALARM");
        }

        push_line(ics_content, "END:VEVENT");
    }
}

impl Default for IcsGenerator {
    fn default() -> Self {
        Self::new(IcsOptions::default())
    }
}

/// `MBA201A.1 Microeconomics`, or just the code when there is no title.
pub fn build_event_title(event: &Event) -> String {
    if event.title.is_empty() {
        event.course_code.clone()
    } else {
        format!("{} {}", event.course_code, event.title)
    }
}

pub fn build_event_description(event: &Event) -> String {
    let mut lines = vec![format!("Course: {}", event.course_code)];
    if !event.instructor.is_empty() {
        lines.push(format!("Instructor: {}", event.instructor));
    }
    lines.push(format!("Meets: {}s", event.weekday));
    lines.join("\n")
}

/// Escape a TEXT property value.
pub fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace("\r\n", "\\n")
        .replace('\n', "\\n")
        .replace('\r', "\\n")
        .replace(',', "\\,")
        .replace(';', "\\;")
}

/// Append `line` with CRLF, folding it so no physical line exceeds
/// 75 octets. Folds never split a UTF-8 sequence.
fn push_line(ics_content: &mut String, line: &str) {
    let mut octets = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if octets + len > MAX_LINE_OCTETS {
            ics_content.push_str("\r\n ");
            octets = 1;
        }
        ics_content.push(ch);
        octets += len;
    }
    ics_content.push_str("\r\n");
}
