use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    Event, Result, format_utc,
    ics::{build_event_description, build_event_title},
};

const GOOGLE_RENDER_URL: &str = "https://calendar.google.com/calendar/render";

/// Pre-filled "create event" link for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickAddLink {
    pub event_id: String,
    pub url: String,
}

/// Google Calendar template link carrying the event and its weekly rule.
pub fn build_quick_add_url(event: &Event) -> Result<Url> {
    let dates = format!("{}/{}", format_utc(&event.start), format_utc(&event.end));
    let recur = format!("RRULE:{}", event.recurrence().to_value());
    let title = build_event_title(event);
    let details = build_event_description(event);

    let url = Url::parse_with_params(
        GOOGLE_RENDER_URL,
        &[
            ("action", "TEMPLATE"),
            ("text", title.as_str()),
            ("details", details.as_str()),
            ("location", event.location.as_str()),
            ("dates", dates.as_str()),
            ("recur", recur.as_str()),
        ],
    )?;
    Ok(url)
}

/// One link per event, in event order.
pub fn build_quick_add_links(events: &[Event]) -> Result<Vec<QuickAddLink>> {
    events
        .iter()
        .map(|event| {
            Ok(QuickAddLink {
                event_id: event.id.clone(),
                url: build_quick_add_url(event)?.to_string(),
            })
        })
        .collect()
}
