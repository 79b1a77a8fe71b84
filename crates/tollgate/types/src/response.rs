//! Veto verdicts
//!
//! A `VetoResponse` is produced fresh for every check and never persisted.

use crate::status::ResourceStatus;
use serde::{Deserialize, Serialize};

/// Verdict returned by a veto for one resource check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VetoResponse {
    /// Whether the reconciler may act on the resource now
    pub allowed: bool,

    /// Name of the veto that produced the verdict
    pub veto_name: String,

    /// Human-readable reason, usually present on denial
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Whether the artifact version being deployed should be marked bad
    #[serde(default)]
    pub veto_artifact: bool,

    /// Status the reconciler should record for the resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_status: Option<ResourceStatus>,
}

impl VetoResponse {
    /// Create an allowing response
    pub fn allow(veto_name: impl Into<String>) -> Self {
        Self {
            allowed: true,
            veto_name: veto_name.into(),
            message: None,
            veto_artifact: false,
            suggested_status: None,
        }
    }

    /// Create a denying response
    pub fn deny(veto_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            veto_name: veto_name.into(),
            message: Some(message.into()),
            veto_artifact: false,
            suggested_status: None,
        }
    }

    /// Request that the artifact version be vetoed as well
    pub fn with_veto_artifact(mut self, veto_artifact: bool) -> Self {
        self.veto_artifact = veto_artifact;
        self
    }

    /// Suggest a status for the reconciler to record
    pub fn with_suggested_status(mut self, status: ResourceStatus) -> Self {
        self.suggested_status = Some(status);
        self
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    pub fn is_denied(&self) -> bool {
        !self.allowed
    }
}
