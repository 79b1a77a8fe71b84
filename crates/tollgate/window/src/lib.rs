//! Tollgate time windows
//!
//! Parses human-authored day/hour strings (`"mon-fri"`, `"9-17,22"`) into
//! numeric sets and answers "is this instant inside an allowed window" for
//! a constraint made of several windows in a timezone.
//!
//! Parsing is lenient: tokens that survive validation but do
//! not form a usable value are dropped rather than rejected, which can make
//! a window smaller than its author intended.

pub mod constraint;
pub mod error;
pub mod parse;
pub mod window;

pub use constraint::{ActiveWindow, TimeWindowConstraint};
pub use error::{Result, WindowError};
pub use parse::{day_for, parse_days, parse_hours, validate_days, validate_hours};
pub use window::{TimeWindow, TimeWindowNumeric, ZonedDateTimeRange};
