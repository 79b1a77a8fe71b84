//! ISO-8601 duration parsing
//!
//! Dynamic configuration expresses waiting times as ISO-8601 durations
//! (`PT10M`, `P1DT2H`, `PT0.5S`). Only the day/time designators are
//! accepted: years, months and weeks have no fixed length.

use crate::error::{Result, TypesError};
use chrono::Duration;

/// Parse an ISO-8601 duration of the form `[-]PnDTnHnMn.nS`
pub fn parse_iso8601_duration(input: &str) -> Result<Duration> {
    let invalid = || TypesError::InvalidDuration {
        input: input.to_string(),
    };

    let trimmed = input.trim();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let rest = rest
        .strip_prefix('P')
        .or_else(|| rest.strip_prefix('p'))
        .ok_or_else(invalid)?;

    let (date_part, time_part) = match rest.find(['T', 't']) {
        Some(idx) => (&rest[..idx], Some(&rest[idx + 1..])),
        None => (rest, None),
    };

    let mut total_millis: i64 = 0;
    let mut seen_component = false;

    if !date_part.is_empty() {
        let days = date_part
            .strip_suffix(['D', 'd'])
            .ok_or_else(invalid)?
            .parse::<i64>()
            .map_err(|_| invalid())?;
        total_millis = total_millis
            .checked_add(days.checked_mul(86_400_000).ok_or_else(invalid)?)
            .ok_or_else(invalid)?;
        seen_component = true;
    }

    if let Some(time_part) = time_part {
        if time_part.is_empty() {
            return Err(invalid());
        }
        let mut number = String::new();
        // H, M, S must appear in order, each at most once
        let mut last_unit = 0u8;
        for c in time_part.chars() {
            if c.is_ascii_digit() || c == '.' || c == '-' {
                number.push(c);
                continue;
            }
            let (rank, unit_millis) = match c.to_ascii_uppercase() {
                'H' => (1, 3_600_000.0),
                'M' => (2, 60_000.0),
                'S' => (3, 1_000.0),
                _ => return Err(invalid()),
            };
            if rank <= last_unit || number.is_empty() {
                return Err(invalid());
            }
            if rank != 3 && number.contains('.') {
                return Err(invalid());
            }
            let value: f64 = number.parse().map_err(|_| invalid())?;
            total_millis = total_millis
                .checked_add((value * unit_millis).round() as i64)
                .ok_or_else(invalid)?;
            number.clear();
            last_unit = rank;
            seen_component = true;
        }
        if !number.is_empty() {
            return Err(invalid());
        }
    }

    if !seen_component {
        return Err(invalid());
    }

    let millis = if negative { -total_millis } else { total_millis };
    Ok(Duration::milliseconds(millis))
}
