//! Error types for batch submission.
//!
//! ## Error Cases
//! - `InvalidConfiguration`: chunk size or concurrency limit was zero. Raised
//!   before any task is spawned.
//! - `Remote`: the first remote call that failed, carried verbatim together
//!   with its source chain.
//! - `Cancelled`: the caller cancelled the run before every chunk was
//!   admitted.
//! - `TaskFailed`: a chunk task panicked or was aborted by the runtime.

use core::convert::Infallible;

/// Result alias for batch submission. `E` is the remote call's error type.
pub type Result<T, E = Infallible> = core::result::Result<T, Error<E>>;

/// Unified error type for a batch submission run.
///
/// The generic parameter `E` is the [`Submitter`](crate::Submitter)'s error.
/// Operations that never touch the remote service (chunking, building an
/// admission gate) use the default `Infallible` and are widened with
/// [`Error::widen`] where needed.
#[derive(thiserror::Error, Debug)]
pub enum Error<E = Infallible> {
    /// Chunk size or concurrency limit is not usable.
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// The remote call for a chunk failed. Display and source are the remote
    /// error's own.
    #[error(transparent)]
    Remote(E),

    /// The run was cancelled from outside before all chunks were admitted.
    #[error("Batch submission cancelled")]
    Cancelled,

    /// A chunk task terminated without producing an outcome.
    #[error("Task failed: {context}")]
    TaskFailed { context: String },
}

impl<E> Error<E> {
    /// Returns the remote error, if this is one.
    pub const fn remote(&self) -> Option<&E> {
        match self {
            Self::Remote(e) => Some(e),
            _ => None,
        }
    }

    /// Consumes the error and returns the remote error, if this is one.
    pub fn into_remote(self) -> Option<E> {
        match self {
            Self::Remote(e) => Some(e),
            _ => None,
        }
    }
}

impl Error<Infallible> {
    /// Re-types an error that cannot carry a remote failure.
    pub fn widen<E>(self) -> Error<E> {
        match self {
            Self::InvalidConfiguration { reason } => Error::InvalidConfiguration { reason },
            Self::Remote(never) => match never {},
            Self::Cancelled => Error::Cancelled,
            Self::TaskFailed { context } => Error::TaskFailed { context },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[derive(thiserror::Error, Debug)]
    #[error("order rejected")]
    struct Rejected(#[source] io::Error);

    #[test]
    fn remote_keeps_message_and_source_chain() {
        let err: Error<Rejected> = Error::Remote(Rejected(io::Error::other("connection reset")));

        assert_eq!(err.to_string(), "order rejected");
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("connection reset"));
    }

    #[test]
    fn widen_keeps_configuration_reason() {
        let err = Error::InvalidConfiguration {
            reason: "Chunk size must be greater than 0".to_string(),
        }
        .widen::<Rejected>();

        assert!(err.remote().is_none());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: Chunk size must be greater than 0"
        );
    }
}
