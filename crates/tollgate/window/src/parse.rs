//! Day and hour grammar
//!
//! Hours: comma-separated integers 0-23 or ranges `a-b`. The upper bound
//! of an hour range is exclusive (`9-17` is 9..=16). A range whose end is
//! not after its start wraps midnight (`22-4` is 22, 23, 0..=3).
//!
//! Days: comma-separated day names (full or 3 letters, any case), ranges
//! `d1-d2` inclusive of both ends and wrapping across Sunday, or the
//! aliases `weekdays` and `weekends`. Days are numbered ISO style,
//! Monday = 1 through Sunday = 7.

use crate::error::{Result, WindowError};
use std::collections::BTreeSet;
use tracing::trace;

const WEEKDAYS: [u32; 5] = [1, 2, 3, 4, 5];
const WEEKENDS: [u32; 2] = [6, 7];

/// Resolve a day name to its ISO day-of-week number
pub fn day_for(name: &str) -> Option<u32> {
    match name.trim().to_ascii_lowercase().as_str() {
        "mon" | "monday" => Some(1),
        "tue" | "tuesday" => Some(2),
        "wed" | "wednesday" => Some(3),
        "thu" | "thursday" => Some(4),
        "fri" | "friday" => Some(5),
        "sat" | "saturday" => Some(6),
        "sun" | "sunday" => Some(7),
        _ => None,
    }
}

fn alias_for(name: &str) -> Option<&'static [u32]> {
    match name {
        "weekdays" => Some(&WEEKDAYS),
        "weekends" => Some(&WEEKENDS),
        _ => None,
    }
}

fn parse_hour(token: &str) -> Option<u32> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse::<u32>().ok().filter(|h| *h <= 23)
}

/// Split on whitespace, commas and dashes, dropping empty pieces
fn validation_tokens(input: &str) -> impl Iterator<Item = &str> {
    input
        .split(|c: char| c.is_whitespace() || c == ',' || c == '-')
        .filter(|t| !t.is_empty())
}

/// Parse an hours string into the set of hours it covers
///
/// Malformed tokens are dropped.
pub fn parse_hours(hours: &str) -> BTreeSet<u32> {
    let compact: String = hours.chars().filter(|c| !c.is_whitespace()).collect();
    let mut result = BTreeSet::new();

    for token in compact.split(',') {
        if let Some(hour) = parse_hour(token) {
            result.insert(hour);
            continue;
        }

        let Some((start, end)) = token.split_once('-') else {
            trace!(token, "dropping malformed hour token");
            continue;
        };
        let (Some(start), Some(end)) = (parse_hour(start), parse_hour(end)) else {
            trace!(token, "dropping malformed hour range");
            continue;
        };

        if end > start {
            result.extend(start..end);
        } else {
            result.extend(start..=23);
            result.extend(0..end);
        }
    }

    result
}

/// Parse a days string into the set of ISO day numbers it covers
///
/// Unrecognized single tokens are dropped; a range whose endpoints are not
/// day names is an error.
pub fn parse_days(days: &str) -> Result<BTreeSet<u32>> {
    let lowered = days.to_lowercase();
    let mut result = BTreeSet::new();

    for token in lowered.split(',').map(str::trim) {
        if let Some(alias) = alias_for(token) {
            result.extend(alias.iter().copied());
            continue;
        }

        if let Some((start, end)) = token.split_once('-') {
            let resolve = |day: &str| {
                day_for(day).ok_or_else(|| WindowError::UnknownDay {
                    day: day.trim().to_string(),
                    range: token.to_string(),
                })
            };
            let start = resolve(start)?;
            let end = resolve(end)?;

            if end >= start {
                result.extend(start..=end);
            } else {
                result.extend(start..=7);
                result.extend(1..=end);
            }
            continue;
        }

        match day_for(token) {
            Some(day) => {
                result.insert(day);
            }
            None => trace!(token, "dropping unrecognized day token"),
        }
    }

    Ok(result)
}

/// Check that an hours string only contains hours and separators
pub fn validate_hours(hours: &str) -> Result<()> {
    let mut tokens = validation_tokens(hours).peekable();
    let valid = tokens.peek().is_some() && tokens.all(|t| parse_hour(t).is_some());
    if valid {
        Ok(())
    } else {
        Err(WindowError::InvalidHours {
            hours: hours.to_string(),
        })
    }
}

/// Check that a days string only contains day names, aliases and separators
pub fn validate_days(days: &str) -> Result<()> {
    let lowered = days.to_lowercase();
    let mut tokens = validation_tokens(&lowered).peekable();
    let valid = tokens.peek().is_some()
        && tokens.all(|t| day_for(t).is_some() || alias_for(t).is_some());
    if valid {
        Ok(())
    } else {
        Err(WindowError::InvalidDays {
            days: days.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: impl IntoIterator<Item = u32>) -> BTreeSet<u32> {
        values.into_iter().collect()
    }

    #[test]
    fn test_parse_hours_table() {
        let cases: Vec<(&str, BTreeSet<u32>)> = vec![
            ("10", set([10])),
            ("0", set([0])),
            ("9-17", set(9..17)),
            ("10-12, 14", set([10, 11, 14])),
            ("22-4", set([22, 23, 0, 1, 2, 3])),
            ("18 - 04", set([18, 19, 20, 21, 22, 23, 0, 1, 2, 3])),
            ("5-5", set(0..24)),
            ("23-0", set([23])),
            ("1,2,3", set([1, 2, 3])),
        ];

        for (input, expected) in cases {
            assert_eq!(parse_hours(input), expected, "hours {input:?}");
        }
    }

    #[test]
    fn test_parse_hours_drops_malformed_tokens() {
        assert_eq!(parse_hours("10,banana,12"), set([10, 12]));
        assert_eq!(parse_hours("24,9"), set([9]));
        assert_eq!(parse_hours("1-2-3,7"), set([7]));
        assert_eq!(parse_hours("-5"), BTreeSet::new());
        assert_eq!(parse_hours(""), BTreeSet::new());
    }

    #[test]
    fn test_parse_days_table() {
        let cases: Vec<(&str, BTreeSet<u32>)> = vec![
            ("monday", set([1])),
            ("Mon", set([1])),
            ("SUNDAY", set([7])),
            ("mon-fri", set(1..=5)),
            ("Fri-Mon", set([5, 6, 7, 1])),
            ("sat-sun", set([6, 7])),
            ("tue, thu", set([2, 4])),
            ("weekdays", set(1..=5)),
            ("weekends", set([6, 7])),
            ("weekends,mon", set([6, 7, 1])),
            ("wed-wed", set([3])),
        ];

        for (input, expected) in cases {
            assert_eq!(parse_days(input).unwrap(), expected, "days {input:?}");
        }
    }

    #[test]
    fn test_parse_days_drops_unknown_single_tokens() {
        assert_eq!(parse_days("mon,funday").unwrap(), set([1]));
        assert_eq!(parse_days("").unwrap(), BTreeSet::new());
    }

    #[test]
    fn test_parse_days_rejects_unresolvable_range() {
        let err = parse_days("mon-funday").unwrap_err();
        assert_eq!(
            err,
            WindowError::UnknownDay {
                day: "funday".into(),
                range: "mon-funday".into(),
            }
        );
        assert!(parse_days("weekdays-sun").is_err());
    }

    #[test]
    fn test_validate_hours() {
        assert!(validate_hours("9-17").is_ok());
        assert!(validate_hours("10, 12-14, 23").is_ok());
        assert!(validate_hours("0-23").is_ok());
        assert!(validate_hours("9am-5pm").is_err());
        assert!(validate_hours("24").is_err());
        assert!(validate_hours("").is_err());
        assert!(validate_hours(" , ").is_err());
    }

    #[test]
    fn test_validate_days() {
        assert!(validate_days("mon-fri").is_ok());
        assert!(validate_days("Monday, Wednesday").is_ok());
        assert!(validate_days("weekdays").is_ok());
        assert!(validate_days("funday").is_err());
        assert!(validate_days("1-5").is_err());
        assert!(validate_days("").is_err());
    }

    #[test]
    fn test_validation_is_looser_than_parsing() {
        // Passes validation, but the range endpoint is an alias.
        assert!(validate_days("weekdays-sun").is_ok());
        assert!(parse_days("weekdays-sun").is_err());

        // Passes validation, but "1-2-3" is not a single range.
        assert!(validate_hours("1-2-3").is_ok());
        assert!(parse_hours("1-2-3").is_empty());
    }

    #[test]
    fn test_day_for() {
        assert_eq!(day_for("thu"), Some(4));
        assert_eq!(day_for("Thursday"), Some(4));
        assert_eq!(day_for("thurs"), None);
    }
}
