//! Allowed deployment windows
//!
//! Applications may restrict actuation to recurring windows
//! (e.g. weekdays 9-17 in their local timezone), optionally capping how
//! many deploys a resource may receive within one window.

use crate::error::Result;
use crate::repository::{ConstraintSource, DeploymentHistory};
use crate::veto::{Veto, VetoMessage};
use async_trait::async_trait;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tollgate_types::{Application, Clock, ResourceId, VetoResponse};
use tracing::debug;

const NAME: &str = "DeployWindowVeto";

/// Denies actuation outside an application's allowed windows
pub struct DeployWindowVeto {
    constraints: Arc<dyn ConstraintSource>,
    history: Arc<dyn DeploymentHistory>,
    clock: Arc<dyn Clock>,
}

impl DeployWindowVeto {
    pub fn new(
        constraints: Arc<dyn ConstraintSource>,
        history: Arc<dyn DeploymentHistory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            constraints,
            history,
            clock,
        }
    }

    /// Whether the application is outside all of its windows right now
    async fn is_outside_windows(&self, application: &Application) -> Result<bool> {
        let Some(constraint) = self.constraints.constraint_for(application).await? else {
            return Ok(false);
        };
        Ok(!constraint.is_allowed_at(self.clock.now()))
    }
}

impl fmt::Debug for DeployWindowVeto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployWindowVeto")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Veto for DeployWindowVeto {
    fn name(&self) -> &str {
        NAME
    }

    async fn check(
        &self,
        resource_id: &ResourceId,
        application: &Application,
    ) -> Result<VetoResponse> {
        let Some(constraint) = self.constraints.constraint_for(application).await? else {
            return Ok(VetoResponse::allow(NAME));
        };

        let now = self.clock.now();
        let Some(active) = constraint.evaluate(now) else {
            debug!(
                resource_id = %resource_id,
                application = %application,
                tz = %constraint.zone(),
                "Outside allowed deployment windows"
            );
            return Ok(VetoResponse::deny(
                NAME,
                format!(
                    "Application {application} is outside its allowed deployment windows ({}).",
                    constraint.zone()
                ),
            ));
        };

        let Some(max_deploys) = constraint.max_deploys_per_window() else {
            return Ok(VetoResponse::allow(NAME));
        };

        let deploys = self
            .history
            .deploys_between(
                resource_id,
                active.range.start.with_timezone(&Utc),
                active.range.end_inclusive.with_timezone(&Utc),
            )
            .await?;

        if deploys >= max_deploys {
            debug!(
                resource_id = %resource_id,
                deploys,
                max_deploys,
                window = active.index,
                "Deploy cap reached for current window"
            );
            return Ok(VetoResponse::deny(
                NAME,
                format!(
                    "Resource {resource_id} has already been deployed {deploys} times in the current window ({}), the maximum is {max_deploys}.",
                    active.range
                ),
            ));
        }

        Ok(VetoResponse::allow(NAME))
    }

    async fn pass_message(&self, message: &VetoMessage) -> Result<()> {
        debug!(keys = ?message.keys().collect::<Vec<_>>(), "DeployWindowVeto ignores messages");
        Ok(())
    }

    /// Applications currently outside all of their windows
    async fn current_rejections(&self) -> Result<Vec<String>> {
        let mut rejected = Vec::new();
        for application in self.constraints.applications().await? {
            if self.is_outside_windows(&application).await? {
                rejected.push(application.to_string());
            }
        }
        Ok(rejected)
    }

    async fn current_rejections_by_app(&self, application: &Application) -> Result<Vec<String>> {
        if self.is_outside_windows(application).await? {
            Ok(vec![application.to_string()])
        } else {
            Ok(Vec::new())
        }
    }
}
