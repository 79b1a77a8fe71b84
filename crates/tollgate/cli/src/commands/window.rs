//! Window commands

use crate::commands::{join_set, read_document};
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{self, print_json, print_success, print_warning, OutputFormat};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;
use tollgate_window::constraint::TimeWindowConstraintConfig;
use tollgate_window::{TimeWindow, TimeWindowConstraint, TimeWindowNumeric};
use tracing::debug;

/// Window subcommands
#[derive(Subcommand)]
pub enum WindowCommands {
    /// Validate day and hour expressions and show what they resolve to
    Parse {
        /// Days, e.g. "mon-fri" or "weekends"
        #[arg(long)]
        days: Option<String>,

        /// Hours, e.g. "9-17" or "22-6"
        #[arg(long)]
        hours: Option<String>,
    },

    /// Evaluate a constraint file at an instant
    Check {
        /// Constraint file (YAML, JSON or TOML)
        file: PathBuf,

        /// Instant to evaluate, RFC 3339 (defaults to now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

/// Table row for a resolved window
#[derive(Debug, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
struct WindowRow {
    /// Position in declaration order
    index: usize,
    /// Days as authored
    days: String,
    /// Hours as authored
    hours: String,
    /// ISO day numbers, Monday = 1
    day_numbers: String,
    /// Hours of the day
    hour_numbers: String,
    /// Whether the evaluated instant falls in this window
    active: bool,
}

impl WindowRow {
    fn new(index: usize, window: &TimeWindow, numeric: &TimeWindowNumeric, active: bool) -> Self {
        Self {
            index,
            days: window.days_str().unwrap_or("any").to_string(),
            hours: window.hours_str().unwrap_or("any").to_string(),
            day_numbers: join_set(&numeric.days),
            hour_numbers: join_set(&numeric.hours),
            active,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport {
    at: DateTime<Utc>,
    tz: String,
    local_time: String,
    active_window: Option<usize>,
    range_start: Option<String>,
    range_end: Option<String>,
    windows: Vec<WindowRow>,
}

/// Execute a window command
pub async fn execute(
    command: WindowCommands,
    config: &CliConfig,
    format: OutputFormat,
) -> CliResult<()> {
    match command {
        WindowCommands::Parse { days, hours } => {
            let window = TimeWindow::new(days, hours)?;
            let numeric = window.to_numeric()?;
            output::print_single(WindowRow::new(0, &window, &numeric, false), format);
            Ok(())
        }

        WindowCommands::Check { file, at } => {
            let constraint = load_constraint(&file, config)?;
            let at = at.unwrap_or_else(Utc::now);
            let report = check(&constraint, at);

            match format {
                OutputFormat::Json => print_json(&report),
                OutputFormat::Table => {
                    println!("Evaluated at {} ({})", report.local_time, report.tz);
                    let active = report.active_window;
                    let range = report.range_start.clone().zip(report.range_end.clone());
                    output::print_output(report.windows, format);
                    match (active, range) {
                        (Some(index), Some((start, end))) => {
                            print_success(&format!("Inside window {index}: {start} .. {end}"))
                        }
                        _ => print_warning("Outside all windows"),
                    }
                }
            }
            Ok(())
        }
    }
}

/// Read a constraint, applying the configured default zone when it names none
pub(crate) fn load_constraint(
    file: &std::path::Path,
    config: &CliConfig,
) -> CliResult<TimeWindowConstraint> {
    let mut raw: TimeWindowConstraintConfig = read_document(file)?;
    if raw.tz.is_none() {
        raw.tz = config.default_timezone.clone();
    }
    debug!(file = %file.display(), tz = ?raw.tz, windows = raw.windows.len(), "Loaded constraint");
    Ok(TimeWindowConstraint::try_from(raw)?)
}

fn check(constraint: &TimeWindowConstraint, at: DateTime<Utc>) -> CheckReport {
    let active = constraint.evaluate(at);
    let active_index = active.as_ref().map(|a| a.index);

    let windows = constraint
        .windows()
        .iter()
        .zip(constraint.windows_numeric())
        .enumerate()
        .map(|(index, (window, numeric))| {
            WindowRow::new(index, window, numeric, active_index == Some(index))
        })
        .collect();

    CheckReport {
        at,
        tz: constraint.zone().to_string(),
        local_time: constraint.local_time(at).to_rfc3339(),
        active_window: active_index,
        range_start: active.as_ref().map(|a| a.range.start.to_rfc3339()),
        range_end: active.as_ref().map(|a| a.range.end_inclusive.to_rfc3339()),
        windows,
    }
}
