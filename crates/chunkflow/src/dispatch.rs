//! Fan-out of chunks onto tokio tasks.
//!
//! [`Dispatcher::dispatch`] spawns one task per chunk immediately. Task
//! creation is unbounded; what the [`AdmissionGate`] bounds is the number of
//! tasks inside [`Submitter::submit`] at the same time. Each task:
//!
//! 1. waits for an admission slot, or gives up if the run is cancelled first;
//! 2. performs exactly one remote call;
//! 3. releases its slot as soon as the call returns;
//! 4. publishes its [`Outcome`].
//!
//! Outcomes are collected by a [`Dispatch`] handle in completion order. Once
//! every task has terminated the handle yields `None`.

use crate::{AdmissionGate, Chunk, Error, Submitter};
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// What a single chunk task ended with.
#[derive(Debug)]
pub enum Outcome<P, E> {
    /// The chunk was admitted and the remote call returned.
    Completed { index: usize, result: Result<P, E> },
    /// Cancellation fired before the chunk was admitted; no remote call was
    /// made.
    Cancelled { index: usize },
}

/// Spawns chunk tasks that share a submitter, an admission gate and a
/// cancellation token.
pub struct Dispatcher<S> {
    submitter: Arc<S>,
    gate: AdmissionGate,
    cancel: CancellationToken,
}

impl<S> Dispatcher<S> {
    pub fn new(submitter: S, gate: AdmissionGate, cancel: CancellationToken) -> Self {
        Self {
            submitter: Arc::new(submitter),
            gate,
            cancel,
        }
    }

    pub const fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Spawns one task per chunk and returns a handle over their outcomes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch<T>(&self, chunks: Vec<Chunk<T>>) -> Dispatch<S::Output, S::Error>
    where
        S: Submitter<T>,
        T: Send + Sync + 'static,
    {
        let mut tasks = JoinSet::new();
        let spawned = chunks.len();

        for chunk in chunks {
            let submitter = Arc::clone(&self.submitter);
            let gate = self.gate.clone();
            let cancel = self.cancel.clone();
            tasks.spawn(run_chunk(submitter, gate, cancel, chunk));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Spawned {spawned} chunk tasks behind {} admission slots",
            self.gate.capacity()
        );

        Dispatch {
            tasks,
            cancel: self.cancel.clone(),
            spawned,
        }
    }
}

async fn run_chunk<T, S>(
    submitter: Arc<S>,
    gate: AdmissionGate,
    cancel: CancellationToken,
    chunk: Chunk<T>,
) -> Outcome<S::Output, S::Error>
where
    S: Submitter<T>,
    T: Send + Sync + 'static,
{
    let index = chunk.index();
    let Some(admission) = gate.admit(&cancel).await else {
        #[cfg(feature = "tracing")]
        tracing::trace!("Chunk {index} cancelled before admission");
        return Outcome::Cancelled { index };
    };

    #[cfg(feature = "tracing")]
    tracing::trace!("Chunk {index} admitted with {} items", chunk.len());

    let result = submitter.submit(chunk.items()).await;
    // Free the slot before publishing so a queued chunk can start while this
    // outcome waits to be consumed.
    drop(admission);

    Outcome::Completed { index, result }
}

/// Handle over the running chunk tasks of one dispatch.
///
/// Dropping the handle aborts every task that is still running.
pub struct Dispatch<P, E> {
    tasks: JoinSet<Outcome<P, E>>,
    cancel: CancellationToken,
    spawned: usize,
}

impl<P, E> Dispatch<P, E>
where
    P: Send + 'static,
    E: Send + 'static,
{
    /// Waits for the next task to finish.
    ///
    /// Returns `None` once every task has terminated. A task that panicked
    /// or was aborted surfaces as [`Error::TaskFailed`].
    pub async fn next(&mut self) -> Option<Result<Outcome<P, E>, Error<E>>> {
        let joined = self.tasks.join_next().await?;
        Some(joined.map_err(task_failed))
    }

    /// Signals every task that has not been admitted yet to stop.
    ///
    /// Returns `true` only for the call that actually fired the signal.
    pub fn cancel(&self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.cancel.cancel();
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Consumes and discards every outstanding outcome until all tasks have
    /// terminated. Later failures are logged and swallowed. Returns how many
    /// outcomes were discarded.
    pub async fn drain(&mut self) -> usize {
        let mut discarded = 0;
        while let Some(next) = self.next().await {
            discard(next);
            discarded += 1;
        }
        discarded
    }

    /// Number of tasks that have not been collected yet.
    pub fn outstanding(&self) -> usize {
        self.tasks.len()
    }

    /// Number of tasks spawned by this dispatch.
    pub const fn spawned(&self) -> usize {
        self.spawned
    }
}

fn discard<P, E>(next: Result<Outcome<P, E>, Error<E>>) {
    #[cfg(feature = "tracing")]
    match &next {
        Ok(Outcome::Completed {
            index,
            result: Err(_),
        }) => tracing::debug!("Swallowing later failure from chunk {index}"),
        Ok(Outcome::Completed { index, .. }) => {
            tracing::trace!("Discarding result of chunk {index}");
        }
        Err(Error::TaskFailed { context }) => {
            tracing::debug!("Swallowing task failure while draining: {context}");
        }
        Ok(Outcome::Cancelled { .. }) | Err(_) => {}
    }
    drop(next);
}

fn task_failed<E>(err: JoinError) -> Error<E> {
    let context = if err.is_panic() {
        format!("chunk task panicked: {err}")
    } else {
        format!("chunk task aborted: {err}")
    };
    Error::TaskFailed { context }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks;
    use core::time::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Probe {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Submitter<u32> for Probe {
        type Output = usize;
        type Error = String;

        async fn submit(&self, chunk: &[u32]) -> Result<usize, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(chunk.len())
        }
    }

    fn dispatcher(probe: &Arc<Probe>, limit: usize) -> Dispatcher<Arc<Probe>> {
        Dispatcher::new(
            Arc::clone(probe),
            AdmissionGate::new(limit).unwrap(),
            CancellationToken::new(),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn one_call_per_chunk_within_limit() {
        let probe = Arc::new(Probe::default());
        let dispatcher = dispatcher(&probe, 3);
        let mut dispatch = dispatcher.dispatch(chunks((0..95).collect(), 5).unwrap());
        assert_eq!(dispatch.spawned(), 19);

        let mut seen = Vec::new();
        let mut items = 0;
        while let Some(outcome) = dispatch.next().await {
            match outcome.unwrap() {
                Outcome::Completed { index, result, .. } => {
                    seen.push(index);
                    items += result.unwrap();
                }
                Outcome::Cancelled { index } => panic!("chunk {index} was cancelled"),
            }
        }

        seen.sort_unstable();
        assert_eq!(seen, (0..19).collect::<Vec<_>>());
        assert_eq!(items, 95);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 19);
        assert!(probe.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(dispatcher.gate().available(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn pre_cancelled_dispatch_makes_no_calls() {
        let probe = Arc::new(Probe::default());
        let dispatcher = dispatcher(&probe, 2);
        dispatcher.cancel_token().cancel();

        let mut dispatch = dispatcher.dispatch(chunks((0..40).collect(), 10).unwrap());
        let mut cancelled = 0;
        while let Some(outcome) = dispatch.next().await {
            assert!(matches!(outcome.unwrap(), Outcome::Cancelled { .. }));
            cancelled += 1;
        }

        assert_eq!(cancelled, 4);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn cancel_fires_once_and_drain_completes() {
        let probe = Arc::new(Probe::default());
        let dispatcher = dispatcher(&probe, 1);
        let mut dispatch = dispatcher.dispatch(chunks((0..50).collect(), 1).unwrap());

        assert!(dispatch.cancel());
        assert!(!dispatch.cancel());
        assert!(dispatch.is_cancelled());

        let discarded = tokio::time::timeout(Duration::from_secs(5), dispatch.drain())
            .await
            .expect("drain should finish once queued tasks observe cancellation");
        assert_eq!(discarded, 50);
        assert_eq!(dispatch.outstanding(), 0);
        // At most the chunk that was already admitted ran.
        assert!(probe.calls.load(Ordering::SeqCst) < 50);
    }

    struct Explodes;

    impl Submitter<u32> for Explodes {
        type Output = ();
        type Error = String;

        async fn submit(&self, _chunk: &[u32]) -> Result<(), String> {
            panic!("submitter blew up");
        }
    }

    #[tokio::test]
    async fn panicking_task_surfaces_as_task_failed() {
        let dispatcher = Dispatcher::new(
            Explodes,
            AdmissionGate::new(1).unwrap(),
            CancellationToken::new(),
        );
        let mut dispatch = dispatcher.dispatch(chunks(vec![1, 2, 3], 10).unwrap());

        let err = dispatch.next().await.unwrap().unwrap_err();
        assert!(matches!(err, Error::TaskFailed { ref context } if context.contains("panicked")));
        assert!(dispatch.next().await.is_none());
    }
}
