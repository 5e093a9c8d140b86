//! Fail-fast aggregation of chunk outcomes.
//!
//! A [`Coordinator`] consumes the outcomes of a [`Dispatch`] in arrival order
//! and runs a small state machine:
//!
//! - `Running`: successful payloads are merged into the [`Aggregator`].
//! - `Errored`: entered on the first failure. The cancellation signal is
//!   broadcast once, the aggregate is dropped, and every further outcome is
//!   drained and discarded until the dispatch reports completion.
//!
//! The run ends with either the complete aggregate or the first error, never
//! both.

use crate::{
    AdmissionGate, Aggregator, BatchConfig, Dispatch, Dispatcher, Error, Merge, Outcome, Submitter,
    chunks,
};
use tokio_util::sync::CancellationToken;


enum State<A, E> {
    Running(Aggregator<A>),
    Errored(Error<E>),
}

/// Drives one dispatch to completion.
pub struct Coordinator<A, E> {
    state: State<A, E>,
}

impl<A, E> Coordinator<A, E>
where
    E: Send + 'static,
{
    pub fn new() -> Self
    where
        A: Default,
    {
        Self::with_aggregate(A::default())
    }

    /// Starts from an existing value instead of `A::default()`.
    pub const fn with_aggregate(aggregate: A) -> Self {
        Self {
            state: State::Running(Aggregator::new(aggregate)),
        }
    }

    /// Consumes outcomes until every task has terminated.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::Remote`] observed, [`Error::TaskFailed`] if a
    /// task died before the first remote failure, or [`Error::Cancelled`] if
    /// the run was cancelled from outside and at least one chunk never got
    /// submitted.
    pub async fn run<P>(mut self, dispatch: &mut Dispatch<P, E>) -> Result<A, Error<E>>
    where
        P: Send + 'static,
        A: Merge<P>,
    {
        while let State::Running(aggregator) = &mut self.state {
            let Some(next) = dispatch.next().await else {
                break;
            };

            match next {
                Ok(Outcome::Completed {
                    result: Ok(payload),
                    ..
                }) => aggregator.merge(payload),
                Ok(Outcome::Completed {
                    index: _index,
                    result: Err(e),
                }) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Chunk {_index} failed, cancelling remaining chunks");
                    self.fail(Error::Remote(e), dispatch);
                }
                Ok(Outcome::Cancelled { index: _index }) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Chunk {_index} was never submitted, run cancelled");
                    self.fail(Error::Cancelled, dispatch);
                }
                Err(e) => self.fail(e, dispatch),
            }
        }

        match self.state {
            State::Running(aggregator) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Merged {} chunk results", aggregator.merged());
                Ok(aggregator.into_inner())
            }
            State::Errored(e) => {
                let _discarded = dispatch.drain().await;
                #[cfg(feature = "tracing")]
                tracing::debug!("Drained {_discarded} outcomes after failure");
                Err(e)
            }
        }
    }

    fn fail<P>(&mut self, err: Error<E>, dispatch: &Dispatch<P, E>)
    where
        P: Send + 'static,
    {
        // Dropping the aggregator here discards every payload merged so far.
        self.state = State::Errored(err);
        if dispatch.cancel() {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                "Cancellation broadcast, draining {} outstanding chunks",
                dispatch.outstanding()
            );
        }
    }
}

impl<A: Default, E: Send + 'static> Default for Coordinator<A, E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Chunks `items`, submits every chunk through `submitter` with at most
/// `config.concurrency` calls in flight, and merges the payloads into `A`.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// - [`Error::InvalidConfiguration`] if either limit is zero. Nothing is
///   spawned and the submitter is never called.
/// - [`Error::Remote`] with the first remote failure. Everything merged so
///   far is discarded.
/// - [`Error::TaskFailed`] if a chunk task panicked.
pub async fn submit_all<T, S, A>(
    items: Vec<T>,
    submitter: S,
    config: BatchConfig,
) -> Result<A, Error<S::Error>>
where
    T: Send + Sync + 'static,
    S: Submitter<T>,
    A: Default + Merge<S::Output>,
{
    submit_all_with_cancel(items, submitter, config, CancellationToken::new()).await
}

/// Like [`submit_all`], but chunks still waiting for admission are abandoned
/// once `cancel` fires, and the run returns [`Error::Cancelled`].
///
/// # Errors
///
/// See [`submit_all`].
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        skip_all,
        fields(items = items.len(), chunk_size = config.chunk_size, concurrency = config.concurrency)
    )
)]
pub async fn submit_all_with_cancel<T, S, A>(
    items: Vec<T>,
    submitter: S,
    config: BatchConfig,
    cancel: CancellationToken,
) -> Result<A, Error<S::Error>>
where
    T: Send + Sync + 'static,
    S: Submitter<T>,
    A: Default + Merge<S::Output>,
{
    config.validate().map_err(Error::widen)?;
    let gate = AdmissionGate::new(config.concurrency).map_err(Error::widen)?;
    let chunks = chunks(items, config.chunk_size).map_err(Error::widen)?;

    let dispatcher = Dispatcher::new(submitter, gate, cancel);
    let mut dispatch = dispatcher.dispatch(chunks);
    Coordinator::new().run(&mut dispatch).await
}
