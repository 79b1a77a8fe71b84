//! Error types for time-window parsing and constraint construction

use thiserror::Error;

/// Time-window errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// Hours string contains something other than hours and separators
    #[error(
        "invalid hours {hours:?}: hours must only contain hours 0-23 that are comma separated, with ranges denoted by a dash"
    )]
    InvalidHours { hours: String },

    /// Days string contains something other than day names and separators
    #[error(
        "invalid days {days:?}: days must only contain days of the week by full name or 3 letter abbreviation, comma separated, with ranges denoted by a dash, or the aliases weekdays/weekends"
    )]
    InvalidDays { days: String },

    /// A day range endpoint could not be resolved to a day of the week
    #[error("unknown day {day:?} in day range {range:?}")]
    UnknownDay { day: String, range: String },

    /// Timezone is not a known zone identifier
    #[error("invalid timezone {tz:?}: {reason}")]
    InvalidTimezone { tz: String, reason: String },
}

/// Result type for time-window operations
pub type Result<T> = std::result::Result<T, WindowError>;
