//! Manual application opt-out
//!
//! Operators opt an application out of automatic actuation by sending
//! `{ "application": "<name>", "optedOut": true }`; sending `false` opts
//! it back in.

use crate::error::{Result, VetoError};
use crate::repository::ApplicationVetoRepository;
use crate::veto::{FieldType, MessageFormat, Veto, VetoMessage};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tollgate_types::{Application, ResourceId, VetoResponse};
use tracing::{debug, info};

const NAME: &str = "ApplicationVeto";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptOutMessage {
    application: String,
    opted_out: bool,
}

/// Denies every resource of an opted-out application
pub struct ApplicationVeto {
    repository: Arc<dyn ApplicationVetoRepository>,
}

impl ApplicationVeto {
    pub fn new(repository: Arc<dyn ApplicationVetoRepository>) -> Self {
        Self { repository }
    }
}

impl fmt::Debug for ApplicationVeto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationVeto").finish_non_exhaustive()
    }
}

#[async_trait]
impl Veto for ApplicationVeto {
    fn name(&self) -> &str {
        NAME
    }

    async fn check(
        &self,
        resource_id: &ResourceId,
        application: &Application,
    ) -> Result<VetoResponse> {
        if self.repository.is_opted_out(application).await? {
            debug!(
                resource_id = %resource_id,
                application = %application,
                "Application is opted out"
            );
            return Ok(VetoResponse::deny(
                NAME,
                format!("Application {application} has been opted out."),
            ));
        }
        Ok(VetoResponse::allow(NAME))
    }

    fn message_format(&self) -> MessageFormat {
        MessageFormat::from([
            ("application".to_string(), FieldType::String),
            ("optedOut".to_string(), FieldType::Boolean),
        ])
    }

    async fn pass_message(&self, message: &VetoMessage) -> Result<()> {
        let message: OptOutMessage =
            serde_json::from_value(serde_json::Value::Object(message.clone())).map_err(|e| {
                VetoError::InvalidMessage {
                    veto: NAME.to_string(),
                    reason: e.to_string(),
                }
            })?;
        let application = Application::new(message.application);

        if message.opted_out {
            self.repository.opt_out(&application).await?;
            info!(application = %application, "Application opted out of actuation");
        } else {
            self.repository.opt_in(&application).await?;
            info!(application = %application, "Application opted back in to actuation");
        }
        Ok(())
    }

    async fn current_rejections(&self) -> Result<Vec<String>> {
        Ok(self
            .repository
            .get_all()
            .await?
            .into_iter()
            .map(|a| a.to_string())
            .collect())
    }

    async fn current_rejections_by_app(&self, application: &Application) -> Result<Vec<String>> {
        if self.repository.is_opted_out(application).await? {
            Ok(vec![application.to_string()])
        } else {
            Ok(Vec::new())
        }
    }
}
