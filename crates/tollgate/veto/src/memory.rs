//! In-memory collaborators for development and testing.
//!
//! Not suitable for sharing state across processes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use tollgate_types::{Application, ResourceId, ResourceStatus};
use tollgate_window::TimeWindowConstraint;

use crate::error::{Result, VetoError};
use crate::repository::{
    ApplicationVetoRepository, ConstraintSource, DeploymentHistory, DiffFingerprintRepository,
    MarkOutcome, ResourceRepository, UnhappyMarker, UnhappyVetoRepository,
};

/// Resource statuses held in memory
#[derive(Debug, Default)]
pub struct InMemoryResourceRepository {
    statuses: DashMap<ResourceId, ResourceStatus>,
}

impl InMemoryResourceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, resource_id: ResourceId, status: ResourceStatus) {
        self.statuses.insert(resource_id, status);
    }

    pub fn remove(&self, resource_id: &ResourceId) {
        self.statuses.remove(resource_id);
    }
}

#[async_trait]
impl ResourceRepository for InMemoryResourceRepository {
    async fn get_status(&self, resource_id: &ResourceId) -> Result<ResourceStatus> {
        self.statuses
            .get(resource_id)
            .map(|s| *s)
            .ok_or_else(|| VetoError::ResourceNotFound(resource_id.clone()))
    }
}

/// Tracks the latest diff fingerprint per resource and how many times in
/// a row it has been seen
#[derive(Debug, Default)]
pub struct InMemoryDiffFingerprintRepository {
    fingerprints: DashMap<ResourceId, (String, u32)>,
}

impl InMemoryDiffFingerprintRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diff; the count grows while the fingerprint stays the same
    pub fn record(&self, resource_id: ResourceId, fingerprint: &str) -> u32 {
        let mut entry = self
            .fingerprints
            .entry(resource_id)
            .or_insert_with(|| (fingerprint.to_string(), 0));
        if entry.0 != fingerprint {
            *entry = (fingerprint.to_string(), 0);
        }
        entry.1 += 1;
        entry.1
    }

    /// Set the count directly
    pub fn set_count(&self, resource_id: ResourceId, count: u32) {
        self.fingerprints
            .insert(resource_id, (String::from("fixed"), count));
    }

    /// Forget the diff, e.g. once current state matches desired state
    pub fn clear(&self, resource_id: &ResourceId) {
        self.fingerprints.remove(resource_id);
    }
}

#[async_trait]
impl DiffFingerprintRepository for InMemoryDiffFingerprintRepository {
    async fn diff_count(&self, resource_id: &ResourceId) -> Result<u32> {
        Ok(self
            .fingerprints
            .get(resource_id)
            .map(|entry| entry.1)
            .unwrap_or(0))
    }
}

/// Opted-out applications held in memory
#[derive(Debug, Default)]
pub struct InMemoryApplicationVetoRepository {
    opted_out: DashSet<Application>,
}

impl InMemoryApplicationVetoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApplicationVetoRepository for InMemoryApplicationVetoRepository {
    async fn opt_out(&self, application: &Application) -> Result<()> {
        self.opted_out.insert(application.clone());
        Ok(())
    }

    async fn opt_in(&self, application: &Application) -> Result<()> {
        self.opted_out.remove(application);
        Ok(())
    }

    async fn is_opted_out(&self, application: &Application) -> Result<bool> {
        Ok(self.opted_out.contains(application))
    }

    async fn get_all(&self) -> Result<Vec<Application>> {
        let mut all: Vec<Application> = self.opted_out.iter().map(|a| a.clone()).collect();
        all.sort();
        Ok(all)
    }
}

/// Unhappy markers held in memory
///
/// Per-key atomicity comes from the map's shard locks.
#[derive(Debug, Default)]
pub struct InMemoryUnhappyVetoRepository {
    markers: DashMap<ResourceId, UnhappyMarker>,
}

impl InMemoryUnhappyVetoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

#[async_trait]
impl UnhappyVetoRepository for InMemoryUnhappyVetoRepository {
    async fn get(&self, resource_id: &ResourceId) -> Result<Option<UnhappyMarker>> {
        Ok(self.markers.get(resource_id).map(|m| m.clone()))
    }

    async fn mark_if_absent(&self, marker: UnhappyMarker) -> Result<MarkOutcome> {
        match self.markers.entry(marker.resource_id.clone()) {
            Entry::Occupied(existing) => Ok(MarkOutcome::Existing(existing.get().clone())),
            Entry::Vacant(slot) => {
                slot.insert(marker.clone());
                Ok(MarkOutcome::Created(marker))
            }
        }
    }

    async fn remove_if_expired(
        &self,
        resource_id: &ResourceId,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(self
            .markers
            .remove_if(resource_id, |_, marker| marker.is_expired(now))
            .is_some())
    }

    async fn delete(&self, resource_id: &ResourceId) -> Result<()> {
        self.markers.remove(resource_id);
        Ok(())
    }

    async fn get_active(&self, now: DateTime<Utc>) -> Result<Vec<UnhappyMarker>> {
        let mut active: Vec<UnhappyMarker> = self
            .markers
            .iter()
            .filter(|m| !m.is_expired(now))
            .map(|m| m.clone())
            .collect();
        active.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));
        Ok(active)
    }
}

/// Deployment windows keyed by application
#[derive(Debug, Default)]
pub struct InMemoryConstraintSource {
    constraints: DashMap<Application, Arc<TimeWindowConstraint>>,
}

impl InMemoryConstraintSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, application: Application, constraint: TimeWindowConstraint) {
        self.constraints.insert(application, Arc::new(constraint));
    }

    pub fn remove(&self, application: &Application) {
        self.constraints.remove(application);
    }
}

#[async_trait]
impl ConstraintSource for InMemoryConstraintSource {
    async fn constraint_for(
        &self,
        application: &Application,
    ) -> Result<Option<Arc<TimeWindowConstraint>>> {
        Ok(self.constraints.get(application).map(|c| Arc::clone(&c)))
    }

    async fn applications(&self) -> Result<Vec<Application>> {
        let mut apps: Vec<Application> = self.constraints.iter().map(|e| e.key().clone()).collect();
        apps.sort();
        Ok(apps)
    }
}

/// Deploy timestamps per resource
#[derive(Debug, Default)]
pub struct InMemoryDeploymentHistory {
    deploys: DashMap<ResourceId, Vec<DateTime<Utc>>>,
}

impl InMemoryDeploymentHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_deploy(&self, resource_id: ResourceId, at: DateTime<Utc>) {
        self.deploys.entry(resource_id).or_default().push(at);
    }
}

#[async_trait]
impl DeploymentHistory for InMemoryDeploymentHistory {
    async fn deploys_between(
        &self,
        resource_id: &ResourceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u32> {
        let count = self
            .deploys
            .get(resource_id)
            .map(|deploys| deploys.iter().filter(|at| **at >= start && **at <= end).count())
            .unwrap_or(0);
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}
