use crate::{Error, Result};

/// Largest chunk most batch APIs accept, and the default chunk size.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Default number of remote calls allowed in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Tunables for a single [`submit_all`](crate::submit_all) run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Maximum number of items per chunk.
    pub chunk_size: usize,
    /// Maximum number of chunks inside the remote call at the same time.
    pub concurrency: usize,
}

impl BatchConfig {
    pub const fn new(chunk_size: usize, concurrency: usize) -> Self {
        Self {
            chunk_size,
            concurrency,
        }
    }

    /// Checks that both limits are positive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfiguration {
                reason: "chunk size must be greater than 0".to_string(),
            });
        }
        if self.concurrency == 0 {
            return Err(Error::InvalidConfiguration {
                reason: "concurrency limit must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CONCURRENCY)
    }
}
