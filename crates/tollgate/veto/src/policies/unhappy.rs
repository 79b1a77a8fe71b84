//! Circuit breaker for resources that stay unhappy
//!
//! When a resource is unhappy and the same diff has been seen more than
//! `veto.unhappy.max-diff-count` times, actuating again is unlikely to
//! help. The resource is marked and held back for
//! `veto.unhappy.waiting-time`; once the marker expires a single check is
//! let through, and the next unhappy observation marks it again.
//!
//! Per resource the states are `Ok` (no marker) and `MarkedUnhappy`
//! (marker in force). Observing the resource happy clears the marker.

use crate::config::{DynamicConfigService, UnhappyVetoConfig};
use crate::error::{Result, VetoError};
use crate::repository::{
    DiffFingerprintRepository, MarkOutcome, ResourceRepository, UnhappyMarker,
    UnhappyVetoRepository,
};
use crate::veto::{Veto, VetoMessage};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;
use tollgate_types::{Application, Clock, ResourceId, ResourceStatus, VetoResponse};
use tracing::{debug, info, warn};

const NAME: &str = "UnhappyVeto";

/// Holds back unhappy resources whose diff keeps recurring
pub struct UnhappyVeto {
    resources: Arc<dyn ResourceRepository>,
    diff_fingerprints: Arc<dyn DiffFingerprintRepository>,
    markers: Arc<dyn UnhappyVetoRepository>,
    config: Arc<dyn DynamicConfigService>,
    defaults: UnhappyVetoConfig,
    clock: Arc<dyn Clock>,
}

impl UnhappyVeto {
    pub fn new(
        resources: Arc<dyn ResourceRepository>,
        diff_fingerprints: Arc<dyn DiffFingerprintRepository>,
        markers: Arc<dyn UnhappyVetoRepository>,
        config: Arc<dyn DynamicConfigService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resources,
            diff_fingerprints,
            markers,
            config,
            defaults: UnhappyVetoConfig::default(),
            clock,
        }
    }

    /// Override the values used when the dynamic keys are unset
    pub fn with_defaults(mut self, defaults: UnhappyVetoConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Hold the resource back, keeping any marker already in force
    async fn mark(
        &self,
        resource_id: &ResourceId,
        application: &Application,
        now: DateTime<Utc>,
        settings: &UnhappyVetoConfig,
        diff_count: u32,
    ) -> Result<VetoResponse> {
        let marked_until = now.checked_add_signed(settings.waiting_time).ok_or_else(|| {
            VetoError::Configuration(format!(
                "waiting time {} cannot be added to {now}",
                settings.waiting_time
            ))
        })?;
        let outcome = self
            .markers
            .mark_if_absent(UnhappyMarker {
                resource_id: resource_id.clone(),
                application: application.clone(),
                marked_until,
            })
            .await?;
        if let MarkOutcome::Created(ref marker) = outcome {
            info!(
                resource_id = %resource_id,
                application = %application,
                diff_count,
                marked_until = %marker.marked_until,
                "Marked resource unhappy"
            );
        }
        Ok(self.denied(settings, outcome.marker().marked_until))
    }

    fn denied(&self, settings: &UnhappyVetoConfig, recheck_at: DateTime<Utc>) -> VetoResponse {
        VetoResponse::deny(
            NAME,
            format!(
                "Resource is unhappy and our {} actions have not fixed it. We will try again after {} (at {}), or if the diff changes.",
                settings.max_diff_count,
                describe(settings.waiting_time),
                recheck_at.to_rfc3339(),
            ),
        )
        .with_veto_artifact(true)
        .with_suggested_status(ResourceStatus::Unhappy)
    }
}

fn describe(duration: Duration) -> String {
    let minutes = duration.num_minutes();
    if minutes > 0 && duration == Duration::minutes(minutes) {
        format!("{minutes} minutes")
    } else {
        format!("{} seconds", duration.num_seconds())
    }
}

impl fmt::Debug for UnhappyVeto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnhappyVeto")
            .field("defaults", &self.defaults)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Veto for UnhappyVeto {
    fn name(&self) -> &str {
        NAME
    }

    async fn check(
        &self,
        resource_id: &ResourceId,
        application: &Application,
    ) -> Result<VetoResponse> {
        let status = self.resources.get_status(resource_id).await?;

        if status != ResourceStatus::Unhappy {
            if status.is_happy() {
                self.markers.delete(resource_id).await?;
            }
            return Ok(VetoResponse::allow(NAME));
        }

        let mut settings = self.defaults.resolve(self.config.as_ref());
        let diff_count = self.diff_fingerprints.diff_count(resource_id).await?;
        if diff_count <= settings.max_diff_count {
            debug!(
                resource_id = %resource_id,
                diff_count,
                max_diff_count = settings.max_diff_count,
                "Unhappy resource still under diff threshold"
            );
            return Ok(VetoResponse::allow(NAME));
        }

        let now = self.clock.now();
        if now.checked_add_signed(settings.waiting_time).is_none() {
            warn!(
                waiting_time = %settings.waiting_time,
                fallback = %self.defaults.waiting_time,
                "Waiting time overflows, using the default"
            );
            settings.waiting_time = self.defaults.waiting_time;
        }

        match self.markers.get(resource_id).await? {
            Some(marker) if !marker.is_expired(now) => {
                Ok(self.denied(&settings, marker.marked_until))
            }
            Some(_) => {
                // Exactly one concurrent caller consumes an expired marker.
                if self.markers.remove_if_expired(resource_id, now).await? {
                    info!(
                        resource_id = %resource_id,
                        application = %application,
                        "Unhappy marker expired, allowing a recheck"
                    );
                    Ok(VetoResponse::allow(NAME))
                } else {
                    // Lost the race; the winner's recheck is under way
                    self.mark(resource_id, application, now, &settings, diff_count)
                        .await
                }
            }
            None => {
                self.mark(resource_id, application, now, &settings, diff_count)
                    .await
            }
        }
    }

    async fn pass_message(&self, message: &VetoMessage) -> Result<()> {
        debug!(keys = ?message.keys().collect::<Vec<_>>(), "UnhappyVeto ignores messages");
        Ok(())
    }

    async fn current_rejections(&self) -> Result<Vec<String>> {
        let now = self.clock.now();
        Ok(self
            .markers
            .get_active(now)
            .await?
            .into_iter()
            .map(|m| m.resource_id.to_string())
            .collect())
    }

    async fn current_rejections_by_app(&self, application: &Application) -> Result<Vec<String>> {
        let now = self.clock.now();
        Ok(self
            .markers
            .get_active(now)
            .await?
            .into_iter()
            .filter(|m| &m.application == application)
            .map(|m| m.resource_id.to_string())
            .collect())
    }
}
