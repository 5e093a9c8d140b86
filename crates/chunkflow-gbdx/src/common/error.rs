//! Error types for the GBDX client.
//!
//! ## Error Cases
//! - `Http`: transport failure, timeout, or an undecodable response body.
//! - `Api`: the service answered with a non-success status. The body is kept
//!   verbatim since it usually carries the reason (e.g. a quota message).
//! - `MissingCredentials`: a token had to be fetched but a credential field
//!   was not configured.
//! - `TokenCache`: reading or writing the on-disk token cache failed.
//! - `Json`: the token cache held something that is not a token.

use std::path::PathBuf;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for talking to GBDX.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request could not be sent or its response could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service rejected the request.
    #[error("GBDX returned {status}: {message}")]
    Api { status: u16, message: String },

    /// A credential required for the password grant is not configured.
    #[error("Missing credential: {field}")]
    MissingCredentials { field: &'static str },

    /// The token cache file could not be read or written.
    #[error("Token cache {}: {source}", path.display())]
    TokenCache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The token cache file is not valid JSON for a token.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
