/// Tipo de resultado usado en toda la librería
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while locating, reading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file does not exist at any searched location.
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// The file exists but could not be read.
    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    /// The content is not valid JSON for the requested type.
    #[error("Invalid configuration in {source_name}: {message}")]
    ParseError {
        source_name: String,
        message: String,
    },
}
