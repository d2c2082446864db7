//! Error type for the CKAN registry engine.

use std::fmt::Display;
use std::io;

use thiserror::Error;

use crate::http::HttpError;

/// Errors surfaced by registry operations.
///
/// Business failures the registry itself reports (missing dataset,
/// rejected field values) come back inside the response envelope, not
/// here; this type covers everything that prevents a usable envelope.
#[derive(Debug, Error)]
pub enum CkanError {
    /// Caller passed an unusable argument or combination.
    #[error("{0}")]
    InvalidArgument(String),

    /// The configured endpoint failed validation.
    #[error("{0}")]
    Validation(String),

    /// The registry answered with something other than an action response.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// A local file could not be read or written.
    #[error("failed to access \"{path}\": {source}")]
    File {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The registry refused an operation outside the envelope contract.
    #[error("{0}")]
    Remote(String),

    /// The request never produced a response.
    #[error(transparent)]
    Transport(#[from] HttpError),
}

impl CkanError {
    pub(crate) fn file(path: impl Display, source: io::Error) -> Self {
        CkanError::File {
            path: path.to_string(),
            source,
        }
    }
}
