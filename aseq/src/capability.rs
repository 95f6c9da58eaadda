//! Optional capabilities a sequence can offer on top of plain pulling.

use aseq_collections::Maybe;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error;
use crate::sequence::Sequence;

/// The answer to "how many elements", when asked.
///
/// `Unknown` is only ever returned when the caller asked for a cheap answer
/// and none exists. It is distinct from `Known(0)`: an empty sequence is
/// cheaply known to be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountHint {
    Unknown,
    Known(usize),
}

impl CountHint {
    pub fn known(self) -> Option<usize> {
        match self {
            CountHint::Unknown => None,
            CountHint::Known(count) => Some(count),
        }
    }

    pub fn is_known(self) -> bool {
        matches!(self, CountHint::Known(_))
    }

    pub fn map(self, f: impl FnOnce(usize) -> usize) -> CountHint {
        match self {
            CountHint::Unknown => CountHint::Unknown,
            CountHint::Known(count) => CountHint::Known(f(count)),
        }
    }
}

/// A sequence that can produce all of its elements, or its count, directly.
#[async_trait]
pub trait ListSource<T>: Send + Sync {
    /// All elements, without going through the pull protocol.
    async fn to_vec(&self, cancel: &CancellationToken) -> error::Result<Vec<T>>;

    /// The number of elements. With `only_if_cheap` set this returns
    /// [`CountHint::Unknown`] rather than doing expensive work; without it
    /// the answer is always known.
    async fn count(&self, only_if_cheap: bool, cancel: &CancellationToken)
        -> error::Result<CountHint>;
}

/// A sequence that can skip, take and index without pulling every element.
///
/// `skip` and `take` return new lazy sequences, and combine with any
/// skip/take already applied rather than stacking wrappers.
#[async_trait]
pub trait Partition<T>: ListSource<T> {
    fn skip(&self, count: usize) -> Sequence<T>;

    fn take(&self, count: usize) -> Sequence<T>;

    async fn try_get_element_at(
        &self,
        index: usize,
        cancel: &CancellationToken,
    ) -> error::Result<Maybe<T>>;

    async fn try_get_first(&self, cancel: &CancellationToken) -> error::Result<Maybe<T>>;

    async fn try_get_last(&self, cancel: &CancellationToken) -> error::Result<Maybe<T>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_hint_zero_is_not_unknown() {
        assert_ne!(CountHint::Known(0), CountHint::Unknown);
        assert_eq!(CountHint::Known(0).known(), Some(0));
        assert_eq!(CountHint::Unknown.known(), None);
        assert_eq!(CountHint::Known(3).map(|c| c + 2), CountHint::Known(5));
        assert_eq!(CountHint::Unknown.map(|c| c + 2), CountHint::Unknown);
    }
}
