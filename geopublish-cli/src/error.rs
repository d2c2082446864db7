//! Error type shared by CLI commands.

use thiserror::Error;

use geopublish::geoserver::GeoServerError;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Connection settings are missing or malformed.
    #[error("{0}")]
    Config(String),

    /// Arguments that don't make sense together.
    #[error("{0}")]
    Usage(String),

    /// A local file could not be read.
    #[error("cannot read {path}: {message}")]
    File { path: String, message: String },

    /// A catalog call failed.
    #[error("{0}")]
    Catalog(String),

    /// The operation completed but reported failure in its envelope.
    #[error("operation reported failure")]
    Failed,
}

impl From<GeoServerError> for CliError {
    fn from(error: GeoServerError) -> Self {
        CliError::Catalog(error.to_string())
    }
}
