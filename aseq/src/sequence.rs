use std::any::Any;
use std::fmt;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::capability::{ListSource, Partition};
use crate::enumerator::{pull, BoxEnumerator};
use crate::error;

/// What a sequence element must be able to do.
///
/// Elements are cloned out of enumerators and may cross tasks (the push
/// bridge hands them to a spawned pull loop).
pub trait Element: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Element for T {}

/// A producer of independent enumerators.
///
/// This is the minimal capability. A source that can answer count, skip,
/// take or indexed queries more cheaply than by pulling advertises that
/// through [`AsyncSequence::as_partition`] and
/// [`AsyncSequence::as_list_source`]. Every caller must keep a pull-based
/// fallback for when these return `None`.
pub trait AsyncSequence<T>: Send + Sync + 'static {
    /// A fresh enumerator, not yet started.
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<T>;

    fn as_partition(&self) -> Option<&dyn Partition<T>> {
        None
    }

    fn as_list_source(&self) -> Option<&dyn ListSource<T>> {
        None
    }

    /// Used to recognise operator stages that can be fused.
    fn as_any(&self) -> &dyn Any;
}

/// A re-enumerable asynchronous sequence.
///
/// `Sequence` is a cheap handle; cloning it shares the same immutable
/// source. Each call to [`Sequence::enumerator`] starts an independent
/// traversal.
pub struct Sequence<T> {
    inner: Arc<dyn AsyncSequence<T>>,
}

impl<T> Clone for Sequence<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> fmt::Debug for Sequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("partition", &self.inner.as_partition().is_some())
            .field("list_source", &self.inner.as_list_source().is_some())
            .finish()
    }
}

impl<T: Element> Sequence<T> {
    pub fn new(source: impl AsyncSequence<T>) -> Self {
        Self {
            inner: Arc::new(source),
        }
    }

    /// Start a new traversal.
    pub fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<T> {
        self.inner.enumerator(cancel)
    }

    pub fn as_partition(&self) -> Option<&dyn Partition<T>> {
        self.inner.as_partition()
    }

    pub fn as_list_source(&self) -> Option<&dyn ListSource<T>> {
        self.inner.as_list_source()
    }

    /// The concrete stage behind this handle, if it is an `S`.
    pub fn downcast_ref<S: 'static>(&self) -> Option<&S> {
        self.inner.as_any().downcast_ref::<S>()
    }

    /// Expose one traversal as a `futures` stream.
    ///
    /// The stream ends after the first error. Dropping the stream early drops
    /// the enumerator without awaiting its disposal.
    pub fn into_stream(self, cancel: CancellationToken) -> BoxStream<'static, error::Result<T>> {
        let enumerator = self.enumerator(cancel);
        stream::unfold(Some(enumerator), |enumerator| async move {
            let mut enumerator = enumerator?;
            match pull(&mut enumerator).await {
                Ok(Some(item)) => Some((Ok(item), Some(enumerator))),
                Ok(None) => None,
                Err(error) => Some((Err(error), None)),
            }
        })
        .boxed()
    }
}
