//! Time windows and their resolved numeric form

use crate::error::{Result, WindowError};
use crate::parse::{parse_days, parse_hours, validate_days, validate_hours};
use chrono::{DateTime, Datelike, Duration, NaiveTime, Offset, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A recurring window as authored in configuration
///
/// Either field may be omitted, meaning "any day" or "any hour".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeWindow")]
pub struct TimeWindow {
    #[serde(skip_serializing_if = "Option::is_none")]
    days: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hours: Option<String>,
}

#[derive(Deserialize)]
struct RawTimeWindow {
    #[serde(default)]
    days: Option<String>,
    #[serde(default)]
    hours: Option<String>,
}

impl TryFrom<RawTimeWindow> for TimeWindow {
    type Error = WindowError;

    fn try_from(raw: RawTimeWindow) -> Result<Self> {
        TimeWindow::new(raw.days, raw.hours)
    }
}

impl TimeWindow {
    /// Create a window, validating both strings against the grammar
    pub fn new(days: Option<String>, hours: Option<String>) -> Result<Self> {
        if let Some(ref days) = days {
            validate_days(days)?;
        }
        if let Some(ref hours) = hours {
            validate_hours(hours)?;
        }
        Ok(Self { days, hours })
    }

    /// Window covering the given days at any hour
    pub fn days(days: impl Into<String>) -> Result<Self> {
        Self::new(Some(days.into()), None)
    }

    /// Window covering the given hours on any day
    pub fn hours(hours: impl Into<String>) -> Result<Self> {
        Self::new(None, Some(hours.into()))
    }

    pub fn days_str(&self) -> Option<&str> {
        self.days.as_deref()
    }

    pub fn hours_str(&self) -> Option<&str> {
        self.hours.as_deref()
    }

    /// Resolve the raw strings into day and hour sets
    pub fn to_numeric(&self) -> Result<TimeWindowNumeric> {
        let days = match self.days {
            Some(ref days) => parse_days(days)?,
            None => BTreeSet::new(),
        };
        let hours = match self.hours {
            Some(ref hours) => parse_hours(hours),
            None => BTreeSet::new(),
        };
        Ok(TimeWindowNumeric { days, hours })
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "days: {}, hours: {}",
            self.days.as_deref().unwrap_or("any"),
            self.hours.as_deref().unwrap_or("any")
        )
    }
}

/// Resolved window: ISO day numbers (1-7) and hours (0-23)
///
/// An empty set on either axis matches everything on that axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimeWindowNumeric {
    pub days: BTreeSet<u32>,
    pub hours: BTreeSet<u32>,
}

impl TimeWindowNumeric {
    /// Whether the local day and hour of `time` fall inside this window
    pub fn contains<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> bool {
        let day = time.weekday().number_from_monday();
        let hour = time.hour();
        (self.days.is_empty() || self.days.contains(&day))
            && (self.hours.is_empty() || self.hours.contains(&hour))
    }

    /// Concrete bounds of this window on the day of `time`
    ///
    /// Bounds come from the smallest and largest hour in the set, so a
    /// window that wraps midnight (e.g. hours `18-4`) yields a range
    /// spanning most of the day rather than two separate ranges.
    pub fn window_range<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> ZonedDateTimeRange<Tz> {
        let start_hour = self.hours.first().copied().unwrap_or(0);
        let end_hour = self.hours.last().copied().unwrap_or(23);

        let start = at_hour(time, start_hour);
        let end_inclusive = at_hour(time, end_hour) + Duration::hours(1) - Duration::seconds(1);

        ZonedDateTimeRange {
            start,
            end_inclusive,
        }
    }
}

/// `time` moved to `hour:00:00` on the same local date
///
/// A local time skipped by a DST transition is resolved with the offset
/// `time` itself carries.
fn at_hour<Tz: TimeZone>(time: &DateTime<Tz>, hour: u32) -> DateTime<Tz> {
    let tz = time.timezone();
    let local = time
        .date_naive()
        .and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default());

    match tz.from_local_datetime(&local).earliest() {
        Some(resolved) => resolved,
        None => {
            let offset = Duration::seconds(i64::from(time.offset().fix().local_minus_utc()));
            tz.from_utc_datetime(&(local - offset))
        }
    }
}

/// Bounds of one active window instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZonedDateTimeRange<Tz: TimeZone> {
    pub start: DateTime<Tz>,
    pub end_inclusive: DateTime<Tz>,
}

impl<Tz: TimeZone> ZonedDateTimeRange<Tz> {
    pub fn contains<Z: TimeZone>(&self, time: &DateTime<Z>) -> bool {
        *time >= self.start && *time <= self.end_inclusive
    }
}

impl<Tz: TimeZone> fmt::Display for ZonedDateTimeRange<Tz>
where
    Tz::Offset: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start.to_rfc3339(), self.end_inclusive.to_rfc3339())
    }
}
