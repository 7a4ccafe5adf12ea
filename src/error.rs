use thiserror::Error as ThisError;

/// Errors that can occur while configuring or tearing down the logger
#[derive(ThisError, Debug)]
pub enum Error {
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),
    /// A file destination could not be opened.
    #[error("Init logger failed, log file: {path}: {source}")]
    Open {
        /// Destination as written in the configuration.
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// A file destination failed to close cleanly.
    #[error("Close log file {path} failed: {source}")]
    Close {
        /// Destination as written in the configuration.
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
