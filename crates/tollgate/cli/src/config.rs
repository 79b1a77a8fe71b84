//! CLI configuration

use crate::error::{CliError, CliResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tollgate_veto::StaticConfigService;

/// CLI configuration
///
/// ```toml
/// default_timezone = "America/Los_Angeles"
///
/// [dynamic.veto.unhappy]
/// max-diff-count = 3
/// waiting-time = "PT5M"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    /// Zone applied to constraint files that do not name one
    pub default_timezone: Option<String>,

    /// Dynamic configuration overrides, flattened into dotted keys
    #[serde(default)]
    pub dynamic: toml::Table,
}

impl CliConfig {
    /// Load configuration from file
    pub fn load(path: Option<&str>) -> CliResult<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: CliConfig =
                toml::from_str(&contents).map_err(|e| CliError::Config(e.to_string()))?;
            Ok(config)
        } else {
            Ok(CliConfig::default())
        }
    }

    /// Dynamic configuration service seeded with the `[dynamic]` table
    pub fn dynamic_config(&self) -> CliResult<StaticConfigService> {
        let contents =
            toml::to_string(&self.dynamic).map_err(|e| CliError::Config(e.to_string()))?;
        Ok(StaticConfigService::from_toml_str(&contents)?)
    }

    /// Get the default configuration file path
    fn default_config_path() -> CliResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::Config("Cannot find config directory".into()))?;
        Ok(config_dir.join("tollgate").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_veto::{get_config, UnhappyVetoConfig};

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert!(config.default_timezone.is_none());
        assert!(config.dynamic.is_empty());
    }

    #[test]
    fn test_load_missing_config() {
        // Should return default config when file doesn't exist
        let config = CliConfig::load(Some("/nonexistent/path/config.toml")).unwrap();
        assert!(config.default_timezone.is_none());
    }

    #[test]
    fn test_dynamic_overrides() {
        let config: CliConfig = toml::from_str(
            r#"
            default_timezone = "Europe/Berlin"

            [dynamic.veto.unhappy]
            max-diff-count = 3
            waiting-time = "PT5M"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_timezone.as_deref(), Some("Europe/Berlin"));

        let service = config.dynamic_config().unwrap();
        assert_eq!(get_config(&service, "veto.unhappy.max-diff-count", 0u32), 3);

        let resolved = UnhappyVetoConfig::default().resolve(&service);
        assert_eq!(resolved.max_diff_count, 3);
        assert_eq!(resolved.waiting_time, chrono::Duration::minutes(5));
    }
}
