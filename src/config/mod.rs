pub mod ai_config;
pub mod app_config;
pub mod dashboard_config;
pub mod loader;
pub mod prompts_config;

// Re-export commonly used types
pub use ai_config::AIConfig;
pub use app_config::AppConfig;
pub use dashboard_config::DashboardConfig;
pub use loader::ConfigLoader;
pub use prompts_config::PromptsConfig;

// Re-export constants
pub use app_config::{CONFIG_FILE_NAME, CONFIG_TEMPLATE, USER_CONFIG_PATH};
