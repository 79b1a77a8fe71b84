//! Tollgate core types
//!
//! Shared vocabulary for the deployment-gating engine: resource identity,
//! the reconciler's view of resource status, the verdict returned by every
//! veto, and an injectable clock.

pub mod clock;
pub mod duration;
pub mod error;
pub mod ids;
pub mod response;
pub mod status;

pub use clock::{Clock, MutableClock, SystemClock};
pub use duration::parse_iso8601_duration;
pub use error::{Result, TypesError};
pub use ids::{Application, ResourceId, ResourceRef};
pub use response::VetoResponse;
pub use status::ResourceStatus;
