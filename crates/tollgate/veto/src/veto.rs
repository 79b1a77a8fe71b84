//! The veto contract

use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tollgate_types::{Application, ResourceId, ResourceRef, VetoResponse};

/// Free-form message accepted by [`Veto::pass_message`]
pub type VetoMessage = serde_json::Map<String, serde_json::Value>;

/// Shape of the messages a veto accepts, keyed by field name
pub type MessageFormat = BTreeMap<String, FieldType>;

/// Type of one message field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Boolean,
    Integer,
}

/// A single admission policy over a resource
///
/// `check` must not change what the policy allows for other resources;
/// implementations are called concurrently for different resources.
#[async_trait]
pub trait Veto: Send + Sync + fmt::Debug {
    /// Name reported in responses and used to route messages
    fn name(&self) -> &str;

    /// Decide whether `resource_id` of `application` may be acted on now
    async fn check(
        &self,
        resource_id: &ResourceId,
        application: &Application,
    ) -> Result<VetoResponse>;

    /// Decide for a resource handle
    async fn check_resource(&self, resource: &ResourceRef) -> Result<VetoResponse> {
        self.check(&resource.id, &resource.application).await
    }

    /// Fields accepted by [`Veto::pass_message`]; empty if none
    fn message_format(&self) -> MessageFormat {
        MessageFormat::new()
    }

    /// Feed a message to the policy; the only manual mutation entry point
    async fn pass_message(&self, message: &VetoMessage) -> Result<()>;

    /// Everything currently vetoed (resource ids or application names)
    async fn current_rejections(&self) -> Result<Vec<String>>;

    /// Currently vetoed identifiers scoped to one application
    async fn current_rejections_by_app(&self, application: &Application) -> Result<Vec<String>>;
}
