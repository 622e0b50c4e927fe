//! Error types for catalog_sync

use thiserror::Error;

/// Result type for catalog_sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for catalog_sync
#[derive(Error, Debug)]
pub enum Error {
    /// The API was called in a way that can never succeed (bad node id, wrong root kind)
    #[error("Invalid usage: {0}")]
    Usage(String),

    /// The catalog contains a structural inconsistency the operation cannot work around
    #[error("Data inconsistency: {0}")]
    DataInconsistency(String),

    #[error("Script generation error: {0}")]
    ScriptGeneration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog document error: {0}")]
    Document(String),

    #[error("Sync profile error: {0}")]
    Profile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Shorthand for [`Error::Usage`]
    pub fn usage(msg: impl Into<String>) -> Self {
        Error::Usage(msg.into())
    }
}

/// Convert Serde JSON errors to catalog_sync errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Serialization(error.to_string())
    }
}

/// Convert YAML errors to catalog_sync errors
impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::Serialization(error.to_string())
    }
}

/// Convert TOML deserialization errors to catalog_sync errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::Config(error.to_string())
    }
}
