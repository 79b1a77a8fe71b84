//! Identifiers for managed resources
//!
//! Resource ids are opaque strings assigned by the reconciler
//! (e.g. `ec2:cluster:prod:myapp-main`); they are wrapped in newtypes so
//! an application name can never be passed where a resource id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a managed resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Name of the application owning a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Application(String);

impl Application {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Application {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Handle to a resource under reconciliation
///
/// Carries just enough identity for a veto to make its decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: ResourceId,
    pub application: Application,
}

impl ResourceRef {
    pub fn new(id: impl Into<String>, application: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(id),
            application: Application::new(application),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.application)
    }
}
