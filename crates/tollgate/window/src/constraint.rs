//! Time-window constraints
//!
//! A constraint is an ordered list of windows evaluated in a timezone,
//! optionally capping how many deploys may happen within one window.
//! Evaluation is pure and may be called from any thread.

use crate::error::{Result, WindowError};
use crate::window::{TimeWindow, TimeWindowNumeric, ZonedDateTimeRange};
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Persisted shape of a constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindowConstraintConfig {
    pub windows: Vec<TimeWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tz: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_deploys_per_window: Option<u32>,
}

/// Validated set of allowed windows in a timezone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "TimeWindowConstraintConfig",
    into = "TimeWindowConstraintConfig"
)]
pub struct TimeWindowConstraint {
    windows: Vec<TimeWindow>,
    tz: Option<String>,
    max_deploys_per_window: Option<u32>,
    zone: Tz,
    numeric: Vec<TimeWindowNumeric>,
}

/// The window a given instant falls into
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveWindow<'a> {
    /// Position of the window in declaration order
    pub index: usize,
    pub window: &'a TimeWindowNumeric,
    /// Bounds of the window on the instant's local day
    pub range: ZonedDateTimeRange<Tz>,
}

impl TimeWindowConstraint {
    /// Build a constraint
    ///
    /// Fails if `tz` is not a known zone or a window's day ranges cannot be
    /// resolved. With no `tz`, windows are evaluated in UTC.
    pub fn new(
        windows: Vec<TimeWindow>,
        tz: Option<String>,
        max_deploys_per_window: Option<u32>,
    ) -> Result<Self> {
        let zone = match tz {
            Some(ref name) => name
                .parse::<Tz>()
                .map_err(|e| WindowError::InvalidTimezone {
                    tz: name.clone(),
                    reason: e.to_string(),
                })?,
            None => Tz::UTC,
        };

        let numeric = windows
            .iter()
            .map(TimeWindow::to_numeric)
            .collect::<Result<Vec<_>>>()?;

        debug!(
            windows = windows.len(),
            tz = %zone,
            max_deploys_per_window = ?max_deploys_per_window,
            "Built time window constraint"
        );

        Ok(Self {
            windows,
            tz,
            max_deploys_per_window,
            zone,
            numeric,
        })
    }

    pub fn windows(&self) -> &[TimeWindow] {
        &self.windows
    }

    /// Resolved windows, in declaration order
    pub fn windows_numeric(&self) -> &[TimeWindowNumeric] {
        &self.numeric
    }

    /// Timezone as configured, if any
    pub fn tz(&self) -> Option<&str> {
        self.tz.as_deref()
    }

    /// Zone the windows are evaluated in
    pub fn zone(&self) -> Tz {
        self.zone
    }

    pub fn max_deploys_per_window(&self) -> Option<u32> {
        self.max_deploys_per_window
    }

    /// `at` expressed in the constraint's zone
    pub fn local_time(&self, at: DateTime<Utc>) -> DateTime<Tz> {
        at.with_timezone(&self.zone)
    }

    /// First window, in declaration order, containing the local day and
    /// hour of `time`
    ///
    /// `time` is matched as given; convert it to [`Self::zone`] first (or
    /// use [`Self::evaluate`]) to honor the configured timezone.
    pub fn active_window_or_none<Z: TimeZone>(
        &self,
        time: &DateTime<Z>,
    ) -> Option<&TimeWindowNumeric> {
        self.numeric.iter().find(|w| w.contains(time))
    }

    /// Active window and its bounds for the instant `at`
    pub fn evaluate(&self, at: DateTime<Utc>) -> Option<ActiveWindow<'_>> {
        let local = self.local_time(at);
        self.numeric
            .iter()
            .enumerate()
            .find(|(_, w)| w.contains(&local))
            .map(|(index, window)| ActiveWindow {
                index,
                window,
                range: window.window_range(&local),
            })
    }

    /// Whether `at` falls inside any window
    pub fn is_allowed_at(&self, at: DateTime<Utc>) -> bool {
        self.active_window_or_none(&self.local_time(at)).is_some()
    }
}

impl TryFrom<TimeWindowConstraintConfig> for TimeWindowConstraint {
    type Error = WindowError;

    fn try_from(config: TimeWindowConstraintConfig) -> Result<Self> {
        TimeWindowConstraint::new(config.windows, config.tz, config.max_deploys_per_window)
    }
}

impl From<TimeWindowConstraint> for TimeWindowConstraintConfig {
    fn from(constraint: TimeWindowConstraint) -> Self {
        Self {
            windows: constraint.windows,
            tz: constraint.tz,
            max_deploys_per_window: constraint.max_deploys_per_window,
        }
    }
}
