//! Error type for the command-line front end.

use thiserror::Error;

/// Everything that can stop the CLI before or during lookups.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Dataset could not be loaded
    #[error("dataset error: {0}")]
    Load(#[from] uadetect_core::LoadError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A `--header` value that is not a valid request header
    #[error("header error: {0}")]
    Header(#[from] uadetect_core::HeaderError),
}

/// Result type alias using the CLI error.
pub type Result<T> = std::result::Result<T, Error>;
