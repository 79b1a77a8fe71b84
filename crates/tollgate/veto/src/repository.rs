//! Collaborators consumed by the vetoes
//!
//! The vetoes own no storage of their own; state lives behind these
//! traits so it can be shared between processes and faked in tests.
//! In-memory implementations live in [`crate::memory`].

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tollgate_types::{Application, ResourceId, ResourceStatus};
use tollgate_window::TimeWindowConstraint;

/// Source of resource status
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn get_status(&self, resource_id: &ResourceId) -> Result<ResourceStatus>;
}

/// Counts how many times in a row the same diff has been seen
#[async_trait]
pub trait DiffFingerprintRepository: Send + Sync {
    async fn diff_count(&self, resource_id: &ResourceId) -> Result<u32>;
}

/// Persisted set of opted-out applications
#[async_trait]
pub trait ApplicationVetoRepository: Send + Sync {
    async fn opt_out(&self, application: &Application) -> Result<()>;

    async fn opt_in(&self, application: &Application) -> Result<()>;

    async fn is_opted_out(&self, application: &Application) -> Result<bool>;

    async fn get_all(&self) -> Result<Vec<Application>>;
}

/// Marker recording that a resource is being held back while unhappy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnhappyMarker {
    pub resource_id: ResourceId,
    pub application: Application,
    pub marked_until: DateTime<Utc>,
}

impl UnhappyMarker {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.marked_until
    }
}

/// Result of [`UnhappyVetoRepository::mark_if_absent`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
    /// No marker existed; this one was stored
    Created(UnhappyMarker),
    /// A marker already existed and was left untouched
    Existing(UnhappyMarker),
}

impl MarkOutcome {
    pub fn marker(&self) -> &UnhappyMarker {
        match self {
            MarkOutcome::Created(marker) | MarkOutcome::Existing(marker) => marker,
        }
    }
}

/// Storage for unhappy markers
///
/// `mark_if_absent` and `remove_if_expired` must be atomic per resource
/// id: of two concurrent callers, exactly one creates a marker and
/// exactly one consumes an expired one.
#[async_trait]
pub trait UnhappyVetoRepository: Send + Sync {
    async fn get(&self, resource_id: &ResourceId) -> Result<Option<UnhappyMarker>>;

    async fn mark_if_absent(&self, marker: UnhappyMarker) -> Result<MarkOutcome>;

    /// Remove the marker if it has expired at `now`; true if this call
    /// removed it
    async fn remove_if_expired(&self, resource_id: &ResourceId, now: DateTime<Utc>)
        -> Result<bool>;

    async fn delete(&self, resource_id: &ResourceId) -> Result<()>;

    /// Markers still in force at `now`
    async fn get_active(&self, now: DateTime<Utc>) -> Result<Vec<UnhappyMarker>>;
}

/// Per-application deployment windows
#[async_trait]
pub trait ConstraintSource: Send + Sync {
    async fn constraint_for(
        &self,
        application: &Application,
    ) -> Result<Option<Arc<TimeWindowConstraint>>>;

    /// Applications that have a constraint
    async fn applications(&self) -> Result<Vec<Application>>;
}

/// Record of past deployments
#[async_trait]
pub trait DeploymentHistory: Send + Sync {
    /// Number of deploys of `resource_id` within `[start, end]`
    async fn deploys_between(
        &self,
        resource_id: &ResourceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u32>;
}
