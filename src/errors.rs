use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Upload error: {0}")]
    Load(#[from] LoadError),
    #[error("AI interaction error: {0}")]
    AI(#[from] AIError),
    #[error("Invalid filter argument: {0}")]
    Filter(String),
    #[error("I/O error while {0}: {1}")]
    IO(String, #[source] std::io::Error),
    #[error("Application error: {0}")]
    Generic(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to write to path '{0}': {1}")]
    FileWrite(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from file '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Failed to render configuration as TOML: {0}")]
    TomlRender(#[source] toml::ser::Error),
    #[error("Unsupported color policy: {0}")]
    UnsupportedPolicy(String),
    #[error("Wrong url format: {0}")]
    InvalidUrl(String),
    #[error("Dimension list '{0}' must not be empty")]
    EmptyDimensions(String),
}

/// Problems with an uploaded table. These block all further processing.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read '{0}': {1}")]
    Read(String, #[source] std::io::Error),
    #[error("Malformed CSV in '{0}': {1}")]
    Csv(String, #[source] csv::Error),
    #[error("No '{column}' column found in '{dataset}'.")]
    MissingColumn { dataset: String, column: String },
    #[error("Row {row} of '{dataset}' has a negative {column} value: {value}")]
    NegativeValue {
        dataset: String,
        row: usize,
        column: String,
        value: f64,
    },
}

#[derive(Debug, Error)]
pub enum AIError {
    #[error("AI API request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("AI API responded with error {0}: {1}")]
    ApiResponseError(reqwest::StatusCode, String),
    #[error("Failed to parse AI stream event: {0}")]
    StreamParse(#[source] serde_json::Error),
    #[error("AI stream reported an error: {0}")]
    StreamError(String),
    #[error("AI returned an empty message.")]
    EmptyMessage,
    #[error("AI reply is not valid JSON: {0}")]
    MalformedResponse(String),
    #[error("AI request was cancelled")]
    Cancelled,
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IO("I/O operation failed".to_string(), err)
    }
}

/// Helper to build an `AppError::Filter` from a bad `DIM=VALUES` argument.
pub fn filter_error<S: Into<String>>(message: S) -> AppError {
    AppError::Filter(message.into())
}
