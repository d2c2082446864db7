//! Error types for catalog operations.
//!
//! Operations distinguish two failure channels. Business outcomes the caller
//! is expected to handle (object not found, store already present) come back
//! inside a failed [`Envelope`](crate::Envelope). Transport problems, local
//! file problems and unexpected server statuses are returned as
//! [`GeoServerError`] values.

use thiserror::Error;

use crate::http::HttpError;

/// Status codes tolerated by delete operations.
///
/// Deleting an object that is already gone (404) or that the account cannot
/// touch (403) is treated as a no-op rather than a failure.
pub const WARNING_STATUS_CODES: [u16; 2] = [403, 404];

/// Errors raised by the GeoServer engine.
#[derive(Debug, Error)]
pub enum GeoServerError {
    /// Input rejected before any request was issued.
    #[error("{0}")]
    InvalidArgument(String),

    /// Endpoint or credential validation failed.
    #[error("{0}")]
    Validation(String),

    /// The catalog answered with a status outside the accepted range.
    ///
    /// The message carries the operation name plus the server's status code
    /// and response body.
    #[error("{0}")]
    Remote(String),

    /// A local file could not be read.
    #[error("failed to read \"{path}\": {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A grid header was malformed or an archive member unusable.
    #[error("{0}")]
    Grid(String),

    /// Building or reading a zip archive failed.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// A response body could not be decoded as the expected document.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// Transport-level failure talking to the catalog.
    #[error(transparent)]
    Transport(#[from] HttpError),
}

impl GeoServerError {
    pub(crate) fn file(path: impl std::fmt::Display, source: std::io::Error) -> Self {
        GeoServerError::File {
            path: path.to_string(),
            source,
        }
    }
}

/// Classification of a non-2xx upload response.
///
/// GeoServer reports most upload problems as 500s whose only distinguishing
/// feature is the human-readable body text, so classification is substring
/// matching. Keeping it in one place makes the fragile part testable on its
/// own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorKind {
    /// The object already exists. Publish flows treat this as success.
    Duplicate,
    /// The server failed to unpack the upload. Worth re-issuing the request.
    TransientUpload,
    /// A style was persisted but the server errored while activating it.
    StyleWarning,
    /// Anything else. Fail immediately.
    Terminal,
}

/// Classify a non-2xx response from an upload endpoint.
///
/// The duplicate check is case-insensitive and independent of the status
/// code: the server wraps "already exists" in 500s, 409s and occasionally
/// 403s depending on version.
pub fn classify_server_error(status: u16, body: &str) -> ServerErrorKind {
    if body.to_lowercase().contains("already exists") {
        return ServerErrorKind::Duplicate;
    }
    // Misspelling is the server's own, matched verbatim.
    if body.contains("Error occured unzipping file") {
        return ServerErrorKind::TransientUpload;
    }
    if status == 500
        && (body.contains("Unable to find style for event") || body.contains("Error persisting"))
    {
        return ServerErrorKind::StyleWarning;
    }
    ServerErrorKind::Terminal
}
