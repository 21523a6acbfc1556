use std::{collections::HashMap, env, fs, path::{Path, PathBuf}};
use crate::errors::ConfigError;

use super::{
    ai_config::{ENV_AI_API_KEY, ENV_AI_API_URL, ENV_AI_MODEL, ENV_AI_TEMPERATURE},
    app_config::{AppConfig, PartialAppConfig, CONFIG_FILE_NAME, CONFIG_TEMPLATE, USER_CONFIG_PATH},
    dashboard_config::{ENV_COLOR_POLICY, ENV_THRESHOLD},
};

/// Environment variables that override file values.
const ENV_KEYS: [&str; 6] = [
    ENV_AI_API_URL,
    ENV_AI_MODEL,
    ENV_AI_TEMPERATURE,
    ENV_AI_API_KEY,
    ENV_THRESHOLD,
    ENV_COLOR_POLICY,
];

/// Configuration loader responsible for loading config from files and environment
pub struct ConfigLoader {
    base_path: Option<PathBuf>,
    config_file: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default paths
    pub fn new() -> Self {
        Self {
            base_path: None,
            config_file: None,
        }
    }

    /// Create a config loader with custom base path (for testing)
    pub fn with_base_path(base_path: PathBuf) -> Self {
        Self {
            base_path: Some(base_path),
            config_file: None,
        }
    }

    /// Use exactly this file. Unlike the default location it must exist.
    pub fn with_config_file(config_file: PathBuf) -> Self {
        Self {
            base_path: None,
            config_file: Some(config_file),
        }
    }

    /// Load complete application configuration
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let config_path = self.config_path();
        let partial_config = self.load_partial_config(&config_path)?;
        let env_map = self.collect_env_vars();
        AppConfig::from_partial_and_env(partial_config, env_map)
    }

    /// Path of the configuration file this loader reads.
    pub fn config_path(&self) -> PathBuf {
        if let Some(file) = &self.config_file {
            return PathBuf::from(shellexpand::tilde(&file.to_string_lossy()).as_ref());
        }
        self.extract_file_path(USER_CONFIG_PATH, CONFIG_FILE_NAME)
    }

    /// Write the example configuration. Returns `false` when a file already
    /// exists and `force` is not set.
    pub fn initialize_config(&self, force: bool) -> Result<(PathBuf, bool), ConfigError> {
        let config_path = self.config_path();
        if config_path.exists() && !force {
            tracing::info!("配置文件 {:?} 已存在，将直接使用", config_path);
            return Ok((config_path, false));
        }

        if let Some(config_dir) = config_path.parent() {
            fs::create_dir_all(config_dir).map_err(|e| {
                ConfigError::FileWrite(config_dir.to_string_lossy().to_string(), e)
            })?;
        }

        fs::write(&config_path, CONFIG_TEMPLATE).map_err(|e| {
            ConfigError::FileWrite(config_path.to_string_lossy().to_string(), e)
        })?;

        tracing::info!("已初始化配置文件: {:?}", config_path);
        Ok((config_path, true))
    }

    /// Extract file path with tilde expansion and base path override
    fn extract_file_path(&self, base_dir: &str, file_name: &str) -> PathBuf {
        let expanded_base = if let Some(base_path) = &self.base_path {
            base_path.join(base_dir.trim_start_matches("~/"))
        } else {
            let expanded = shellexpand::tilde(base_dir);
            PathBuf::from(expanded.as_ref())
        };

        expanded_base.join(file_name)
    }

    /// Load partial configuration from TOML file
    fn load_partial_config(
        &self,
        config_path: &Path,
    ) -> Result<Option<PartialAppConfig>, ConfigError> {
        if !config_path.exists() {
            if self.config_file.is_some() {
                return Err(ConfigError::FileRead(
                    config_path.to_string_lossy().to_string(),
                    std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
                ));
            }
            tracing::debug!("未发现配置文件 {:?}，使用默认配置", config_path);
            return Ok(None);
        }

        let content = fs::read_to_string(config_path).map_err(|e| {
            ConfigError::FileRead(config_path.to_string_lossy().to_string(), e)
        })?;

        let partial_config: PartialAppConfig = toml::from_str(&content).map_err(|e| {
            ConfigError::TomlParse(config_path.to_string_lossy().to_string(), e)
        })?;

        tracing::debug!("已加载配置文件 {:?}", config_path);
        Ok(Some(partial_config))
    }

    /// Collect relevant environment variables
    fn collect_env_vars(&self) -> HashMap<String, String> {
        let mut env_map = HashMap::new();
        for key in &ENV_KEYS {
            if let Ok(value) = env::var(key) {
                env_map.insert(key.to_string(), value);
            }
        }
        env_map
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_loader() -> (ConfigLoader, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_base_path(temp_dir.path().to_path_buf());
        (loader, temp_dir)
    }

    #[test]
    fn test_extract_file_path() {
        let (loader, temp_dir) = create_test_loader();
        let path = loader.config_path();
        assert!(path.starts_with(temp_dir.path()));
        assert!(path.ends_with(".config/incident-flow/config.toml"));
    }

    #[test]
    fn test_missing_default_file_uses_defaults() {
        let (loader, _temp_dir) = create_test_loader();
        let config = loader.load_config().unwrap();
        assert_eq!(config.dashboard.top_teams_per_service, 2);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_config_file(temp_dir.path().join("nope.toml"));
        assert!(matches!(loader.load_config(), Err(ConfigError::FileRead(_, _))));
    }

    #[test]
    fn test_initialize_then_load() {
        let (loader, _temp_dir) = create_test_loader();
        let (path, written) = loader.initialize_config(false).unwrap();
        assert!(written);
        assert!(path.exists());
        let (_, written_again) = loader.initialize_config(false).unwrap();
        assert!(!written_again);
        loader.load_config().unwrap();
    }

    #[test]
    fn test_file_values_are_used() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("custom.toml");
        fs::write(
            &path,
            "[dashboard]\nthreshold = 6.5\nshow_links = true\n[ai]\nmodel_name = \"local\"\n",
        )
        .unwrap();
        let config = ConfigLoader::with_config_file(path).load_config().unwrap();
        assert_eq!(config.dashboard.threshold, 6.5);
        assert!(config.dashboard.show_links);
        assert_eq!(config.ai.model_name, "local");
    }

    #[test]
    fn test_bad_toml_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "[dashboard\nthreshold = ").unwrap();
        let err = ConfigLoader::with_config_file(path).load_config().unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(p, _) if p.ends_with("broken.toml")));
    }
}
