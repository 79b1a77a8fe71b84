//! Tollgate vetoes
//!
//! A [`Veto`] is one admission policy over a managed resource. The
//! [`VetoEnforcer`] holds an ordered list of them and allows a resource
//! check only if every policy allows it. The reconciliation loop calls
//! the enforcer once per resource per tick, possibly for many resources
//! at once.
//!
//! Policies shipped here:
//! - [`ApplicationVeto`]: manual opt-out list keyed by application
//! - [`UnhappyVeto`]: circuit breaker over unhappy resources whose diff
//!   keeps coming back, rechecked once per waiting time
//! - [`DeployWindowVeto`]: allowed deployment windows per application

pub mod config;
pub mod enforcer;
pub mod error;
pub mod memory;
pub mod policies;
pub mod repository;
pub mod veto;

pub use config::{get_config, DynamicConfigService, StaticConfigService, UnhappyVetoConfig};
pub use enforcer::{EvaluationMode, VetoEnforcer, VetoEnforcerBuilder};
pub use error::{Result, VetoError};
pub use policies::{ApplicationVeto, DeployWindowVeto, UnhappyVeto};
pub use repository::{
    ApplicationVetoRepository, ConstraintSource, DeploymentHistory, DiffFingerprintRepository,
    MarkOutcome, ResourceRepository, UnhappyMarker, UnhappyVetoRepository,
};
pub use veto::{FieldType, MessageFormat, Veto, VetoMessage};
