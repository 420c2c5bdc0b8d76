use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::{Error, Result};

/// Turns local (date, wall-clock time) pairs into absolute instants.
///
/// Offsets come from the zone's rules, so daylight-saving transitions are
/// handled without any explicit transition dates.
#[derive(Debug, Clone, Copy)]
pub struct MomentBuilder {
    timezone: Tz,
}

impl MomentBuilder {
    pub const fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// A local time inside a DST fold resolves to the earlier instant; one
    /// inside a DST gap is an error.
    pub fn at(&self, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>> {
        let naive = date.and_time(time);
        match self.timezone.from_local_datetime(&naive) {
            LocalResult::Single(local) => Ok(local.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => {
                tracing::debug!("{} is ambiguous in {}, using earlier offset", naive, self.timezone);
                Ok(earliest.with_timezone(&Utc))
            }
            LocalResult::None => Err(Error::NonexistentLocalTime {
                time: naive.to_string(),
                timezone: self.timezone.name().to_string(),
            }),
        }
    }

    /// 23:59:59 local on `date`.
    pub fn end_of_day(&self, date: NaiveDate) -> Result<DateTime<Utc>> {
        let last_second = NaiveTime::from_hms_opt(23, 59, 59)
            .ok_or_else(|| Error::Internal("Invalid end-of-day time".to_string()))?;
        self.at(date, last_second)
    }
}
