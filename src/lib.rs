pub mod args;
pub mod color;
pub mod config;
pub mod engine;
pub mod errors;
pub mod filters;
pub mod handlers;
pub mod insights;
pub mod loader;
pub mod logging;
pub mod narrative;
pub mod relations;
pub mod report;
pub mod session;
pub mod types;

// Re-export commonly used items for convenience
pub use config::AppConfig;
pub use errors::AppError;
pub use session::{Session, SharedSession};
