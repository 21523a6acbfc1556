use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf};
use crate::errors::ConfigError;

use super::{
    ai_config::{AIConfig, PartialAIConfig},
    dashboard_config::{DashboardConfig, PartialDashboardConfig},
    prompts_config::{PartialPromptsConfig, PromptsConfig},
    loader::ConfigLoader,
};

// Configuration location constants
pub const USER_CONFIG_PATH: &str = "~/.config/incident-flow";

// Configuration file names
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Example configuration written by `config init`.
pub const CONFIG_TEMPLATE: &str = include_str!("../../assets/config.example.toml");

/// Main Application Configuration
#[derive(Serialize, Debug, Clone, Default)]
pub struct AppConfig {
    pub ai: AIConfig,
    pub dashboard: DashboardConfig,
    pub prompts: PromptsConfig,
}

/// Partial Application Configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialAppConfig {
    ai: Option<PartialAIConfig>,
    dashboard: Option<PartialDashboardConfig>,
    prompts: Option<PartialPromptsConfig>,
}

impl AppConfig {
    /// Load configuration from the default location and environment
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load_config()
    }

    /// Load configuration from an explicit file (`--config`)
    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        ConfigLoader::with_config_file(path).load_config()
    }

    /// Create AppConfig from partial config and environment
    pub fn from_partial_and_env(
        partial: Option<PartialAppConfig>,
        env_map: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();

        let ai = AIConfig::from_env_or_file(partial.ai, &env_map)?;
        let dashboard = DashboardConfig::from_env_or_file(partial.dashboard, &env_map)?;
        let prompts = PromptsConfig::from_partial(partial.prompts);

        Ok(AppConfig {
            ai,
            dashboard,
            prompts,
        })
    }

    /// Copy safe to print: the API key is masked.
    pub fn masked(&self) -> Self {
        let mut shown = self.clone();
        if shown.ai.api_key.is_some() {
            shown.ai.api_key = Some("********".to_string());
        }
        shown
    }

    /// Effective configuration as TOML, secrets masked.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(&self.masked()).map_err(ConfigError::TomlRender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let partial: PartialAppConfig = toml::from_str(CONFIG_TEMPLATE).unwrap();
        let config = AppConfig::from_partial_and_env(Some(partial), HashMap::new()).unwrap();
        let defaults = AppConfig::default();
        assert_eq!(config.ai.model_name, defaults.ai.model_name);
        assert_eq!(config.dashboard.flow_dimensions, defaults.dashboard.flow_dimensions);
        assert_eq!(config.dashboard.threshold, defaults.dashboard.threshold);
        assert_eq!(config.prompts, defaults.prompts);
    }

    #[test]
    fn test_to_toml_masks_key() {
        let mut config = AppConfig::default();
        config.ai.api_key = Some("secret".to_string());
        let rendered = config.to_toml().unwrap();
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("[dashboard]"));
        assert!(rendered.contains("Team Acro"));
    }
}
