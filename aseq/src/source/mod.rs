//! Sequences that produce elements rather than transform them.

mod empty;
mod iter;
mod range;
mod repeat;
mod stream;
mod vec;

pub use empty::Empty;
pub use iter::IterSource;
pub use range::Range;
pub use repeat::Repeat;
pub use stream::StreamSource;
pub use vec::VecSource;

use futures::stream::{Stream, StreamExt};

use crate::error::{self, Error};
use crate::sequence::{Element, Sequence};

impl<T: Element> Sequence<T> {
    /// A sequence without elements.
    pub fn empty() -> Self {
        Sequence::new(Empty::new())
    }

    /// `count` copies of `element`.
    pub fn repeat(element: T, count: usize) -> Self {
        if count == 0 {
            return Sequence::empty();
        }
        Sequence::new(Repeat::new(element, count))
    }

    /// The elements of a vector. Supports direct indexing, counting and
    /// slicing.
    pub fn from_vec(items: Vec<T>) -> Self {
        if items.is_empty() {
            return Sequence::empty();
        }
        Sequence::new(VecSource::new(items.into()))
    }

    /// Replays a cloneable iterable on every traversal.
    ///
    /// The result is a plain pull-only source: it does not advertise a count
    /// or indexed access, even if the iterable could provide them.
    pub fn from_iterable<I>(iterable: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
        I::IntoIter: Send + 'static,
    {
        Sequence::new(IterSource::new(iterable))
    }

    /// Calls `factory` for a fresh stream on every traversal.
    pub fn from_stream<F, S>(factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Stream<Item = T> + Send + 'static,
    {
        Sequence::from_try_stream(move || factory().map(Ok::<T, anyhow::Error>))
    }

    /// Like [`Sequence::from_stream`], for streams that can fail. A failure
    /// surfaces as [`Error::Source`] and ends the traversal.
    pub fn from_try_stream<F, S>(factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Stream<Item = anyhow::Result<T>> + Send + 'static,
    {
        Sequence::new(StreamSource::new(move || factory().boxed()))
    }
}

impl Sequence<i64> {
    /// `count` consecutive integers starting at `start`.
    ///
    /// Fails immediately if the last value would not fit in an `i64`.
    pub fn range(start: i64, count: usize) -> error::Result<Self> {
        if count == 0 {
            return Ok(Sequence::empty());
        }
        let last = i64::try_from(count - 1)
            .ok()
            .and_then(|offset| start.checked_add(offset));
        if last.is_none() {
            return Err(Error::ArgumentOutOfRange {
                name: "count",
                reason: "start + count - 1 overflows",
            });
        }
        Ok(Sequence::new(Range::new(start, count)))
    }
}

impl<T: Element> FromIterator<T> for Sequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Sequence::from_vec(iter.into_iter().collect())
    }
}
