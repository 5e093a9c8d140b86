//! Admission control for outbound calls.
//!
//! An [`AdmissionGate`] is a pool of `K` tokens. A task must hold an
//! [`Admission`] for as long as it talks to the remote service and gives it
//! back by dropping it. Waiting for a token races against a shared
//! [`CancellationToken`], so queued tasks can be abandoned without ever
//! touching the remote service.

use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Fixed-capacity pool of admission slots shared by all tasks of one run.
#[derive(Clone, Debug)]
pub struct AdmissionGate {
    slots: Arc<Semaphore>,
    capacity: usize,
}

/// One held admission slot. Dropping it releases the slot.
#[derive(Debug)]
#[must_use = "the slot is released as soon as the admission is dropped"]
pub struct Admission {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionGate {
    /// Creates a gate that admits at most `capacity` holders at once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `capacity` is zero, since
    /// such a gate would never admit anyone.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfiguration {
                reason: "concurrency limit must be greater than 0".to_string(),
            });
        }
        Ok(Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently free.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Waits for a free slot or for `cancel` to fire, whichever happens first.
    ///
    /// Returns `None` if cancellation won. A token that is already cancelled
    /// on entry always wins; otherwise neither side is favoured when both
    /// become ready together.
    pub async fn admit(&self, cancel: &CancellationToken) -> Option<Admission> {
        if cancel.is_cancelled() {
            return None;
        }

        tokio::select! {
            permit = Arc::clone(&self.slots).acquire_owned() => {
                // The semaphore is never closed, so an error here can only
                // mean the gate is being torn down.
                permit.ok().map(|permit| Admission { _permit: permit })
            }
            () = cancel.cancelled() => None,
        }
    }
}
