//! Resource status as reported by the reconciler

use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Current status of a managed resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceStatus {
    /// Resource was just created and has not been checked yet
    Created,

    /// Desired and actual state match
    Happy,

    /// A diff was detected and an actuation is being launched
    Diff,

    /// An actuation task is running
    Actuating,

    /// Repeated actuations have failed to resolve the diff
    Unhappy,

    /// The last check raised an error
    Error,

    /// Actuation is paused for the resource or its application
    Paused,

    /// A veto is blocking actuation
    Vetoed,

    /// No information is available
    Unknown,
}

impl ResourceStatus {
    /// Whether the resource is converged
    pub fn is_happy(&self) -> bool {
        matches!(self, ResourceStatus::Happy)
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceStatus::Created => "CREATED",
            ResourceStatus::Happy => "HAPPY",
            ResourceStatus::Diff => "DIFF",
            ResourceStatus::Actuating => "ACTUATING",
            ResourceStatus::Unhappy => "UNHAPPY",
            ResourceStatus::Error => "ERROR",
            ResourceStatus::Paused => "PAUSED",
            ResourceStatus::Vetoed => "VETOED",
            ResourceStatus::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

impl FromStr for ResourceStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREATED" => Ok(ResourceStatus::Created),
            "HAPPY" => Ok(ResourceStatus::Happy),
            "DIFF" => Ok(ResourceStatus::Diff),
            "ACTUATING" => Ok(ResourceStatus::Actuating),
            "UNHAPPY" => Ok(ResourceStatus::Unhappy),
            "ERROR" => Ok(ResourceStatus::Error),
            "PAUSED" => Ok(ResourceStatus::Paused),
            "VETOED" => Ok(ResourceStatus::Vetoed),
            "UNKNOWN" => Ok(ResourceStatus::Unknown),
            other => Err(TypesError::UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("unhappy".parse::<ResourceStatus>().unwrap(), ResourceStatus::Unhappy);
        assert_eq!(" Happy ".parse::<ResourceStatus>().unwrap(), ResourceStatus::Happy);
        assert!("sad".parse::<ResourceStatus>().is_err());
    }

    #[test]
    fn test_status_serde_matches_display() {
        let json = serde_json::to_string(&ResourceStatus::Actuating).unwrap();
        assert_eq!(json, format!("\"{}\"", ResourceStatus::Actuating));
    }
}
