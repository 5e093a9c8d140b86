use std::sync::Arc;

/// The remote call a batch run fans out to.
///
/// `submit` is invoked at most once per chunk and never with more items than
/// the configured chunk size. Implementations are shared by every task of a
/// run, hence the `Send + Sync + 'static` bound.
pub trait Submitter<T>: Send + Sync + 'static {
    /// Payload returned for one accepted chunk.
    type Output: Send + 'static;
    /// Failure of one remote call.
    type Error: Send + 'static;

    /// Submits a single chunk of items to the remote service.
    fn submit(
        &self,
        chunk: &[T],
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

impl<T, S> Submitter<T> for Arc<S>
where
    S: Submitter<T>,
{
    type Output = S::Output;
    type Error = S::Error;

    fn submit(
        &self,
        chunk: &[T],
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send {
        (**self).submit(chunk)
    }
}
