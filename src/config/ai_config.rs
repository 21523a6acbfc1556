use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::errors::ConfigError;

pub const ENV_AI_API_URL: &str = "INCIDENT_FLOW_AI_API_URL";
pub const ENV_AI_MODEL: &str = "INCIDENT_FLOW_AI_MODEL";
pub const ENV_AI_TEMPERATURE: &str = "INCIDENT_FLOW_AI_TEMPERATURE";
pub const ENV_AI_API_KEY: &str = "INCIDENT_FLOW_AI_API_KEY";

/// AI Configuration
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AIConfig {
    pub api_url: String,
    pub model_name: String,
    /// Omitted from requests when unset so the endpoint default applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Partial AI Configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialAIConfig {
    pub api_url: Option<String>,
    pub model_name: Option<String>,
    pub temperature: Option<f32>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for AIConfig {
    fn default() -> Self {
        Self {
            api_url: default_ai_api_url(),
            model_name: default_ai_model_name(),
            temperature: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AIConfig {
    /// Create AIConfig from environment variables and file config
    pub fn from_env_or_file(
        file_ai_config: Option<PartialAIConfig>,
        env_map: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let file = file_ai_config.unwrap_or_default();

        let api_url = env_map
            .get(ENV_AI_API_URL)
            .cloned()
            .or(file.api_url)
            .unwrap_or_else(default_ai_api_url);

        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(api_url));
        }

        let model_name = env_map
            .get(ENV_AI_MODEL)
            .cloned()
            .or(file.model_name)
            .unwrap_or_else(default_ai_model_name);

        let temperature = match env_map.get(ENV_AI_TEMPERATURE) {
            Some(raw) => match raw.parse::<f32>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(
                        "环境变量 {} 的值 '{}' 不是有效的数字，已忽略",
                        ENV_AI_TEMPERATURE,
                        raw
                    );
                    file.temperature
                }
            },
            None => file.temperature,
        };

        let api_key = env_map
            .get(ENV_AI_API_KEY)
            .cloned()
            .or(file.api_key)
            .filter(|key| !key.trim().is_empty());

        Ok(AIConfig {
            api_url,
            model_name,
            temperature,
            api_key,
            timeout_secs: file.timeout_secs.unwrap_or_else(default_timeout_secs),
        })
    }
}

// Default functions
fn default_ai_api_url() -> String {
    "https://llmfoundry.straive.com/openai/v1/chat/completions".to_string()
}

fn default_ai_model_name() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_config_defaults() {
        let config = AIConfig::from_env_or_file(None, &HashMap::new()).unwrap();
        assert_eq!(config.model_name, "gpt-4o-mini");
        assert!(config.api_url.ends_with("/openai/v1/chat/completions"));
        assert_eq!(config.temperature, None);
        assert_eq!(config.timeout_secs, 120);
    }

    #[test]
    fn test_env_overrides_file() {
        let file_config = PartialAIConfig {
            api_url: Some("http://file.com".to_string()),
            model_name: Some("file-model".to_string()),
            temperature: Some(0.7),
            api_key: Some("file-key".to_string()),
            timeout_secs: Some(30),
        };

        let mut env_map = HashMap::new();
        env_map.insert(ENV_AI_API_URL.to_string(), "http://env.com".to_string());
        env_map.insert(ENV_AI_API_KEY.to_string(), "env-key".to_string());

        let config = AIConfig::from_env_or_file(Some(file_config), &env_map).unwrap();
        assert_eq!(config.api_url, "http://env.com");
        assert_eq!(config.model_name, "file-model");
        assert_eq!(config.temperature, Some(0.7));
        assert_eq!(config.api_key, Some("env-key".to_string()));
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_bad_temperature_falls_back_to_file() {
        let file_config = PartialAIConfig {
            temperature: Some(0.2),
            ..Default::default()
        };
        let mut env_map = HashMap::new();
        env_map.insert(ENV_AI_TEMPERATURE.to_string(), "warm".to_string());
        let config = AIConfig::from_env_or_file(Some(file_config), &env_map).unwrap();
        assert_eq!(config.temperature, Some(0.2));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let mut env_map = HashMap::new();
        env_map.insert(ENV_AI_API_URL.to_string(), "ftp://nope".to_string());
        let err = AIConfig::from_env_or_file(None, &env_map).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl(_)));
    }

    #[test]
    fn test_blank_api_key_is_none() {
        let mut env_map = HashMap::new();
        env_map.insert(ENV_AI_API_KEY.to_string(), "  ".to_string());
        let config = AIConfig::from_env_or_file(None, &env_map).unwrap();
        assert!(config.api_key.is_none());
    }
}
