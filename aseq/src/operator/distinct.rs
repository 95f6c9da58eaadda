use std::any::Any;
use std::hash::Hash;
use std::sync::Arc;

use aseq_collections::{DefaultComparer, EqualityComparer, Set};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::capability::{CountHint, ListSource};
use crate::enumerator::BoxEnumerator;
use crate::error;
use crate::iterator::{ensure_not_cancelled, AsyncIterator, IteratorCore, Upstream};
use crate::sequence::{AsyncSequence, Element, Sequence};

/// The first occurrence of every element of `source`.
pub struct Distinct<T, C> {
    source: Sequence<T>,
    comparer: Arc<C>,
}

impl<T, C> Distinct<T, C>
where
    T: Element,
    C: EqualityComparer<T> + 'static,
{
    pub(crate) fn new(source: Sequence<T>, comparer: Arc<C>) -> Self {
        Distinct { source, comparer }
    }

    async fn collect(&self, cancel: &CancellationToken) -> error::Result<Set<T, Arc<C>>> {
        let mut set = Set::with_comparer(self.comparer.clone());
        for item in self.source.to_vec(cancel).await? {
            ensure_not_cancelled(cancel)?;
            set.add(item);
        }
        Ok(set)
    }
}

struct DistinctCore<T, C> {
    source: Sequence<T>,
    upstream: Upstream<T>,
    seen: Set<T, Arc<C>>,
}

#[async_trait]
impl<T, C> IteratorCore<T> for DistinctCore<T, C>
where
    T: Element,
    C: EqualityComparer<T> + 'static,
{
    async fn open(&mut self, cancel: &CancellationToken) -> error::Result<()> {
        self.upstream.open(&self.source, cancel);
        Ok(())
    }

    async fn next(&mut self, _cancel: &CancellationToken) -> error::Result<Option<T>> {
        while let Some(item) = self.upstream.pull().await? {
            if self.seen.add(item.clone()) {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> error::Result<()> {
        self.seen.clear();
        self.upstream.close().await
    }
}

impl<T, C> AsyncSequence<T> for Distinct<T, C>
where
    T: Element,
    C: EqualityComparer<T> + 'static,
{
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<T> {
        let core = DistinctCore {
            source: self.source.clone(),
            upstream: Upstream::new(),
            seen: Set::with_comparer(self.comparer.clone()),
        };
        AsyncIterator::boxed(core, cancel)
    }

    fn as_list_source(&self) -> Option<&dyn ListSource<T>> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl<T, C> ListSource<T> for Distinct<T, C>
where
    T: Element,
    C: EqualityComparer<T> + 'static,
{
    async fn to_vec(&self, cancel: &CancellationToken) -> error::Result<Vec<T>> {
        Ok(self.collect(cancel).await?.into_vec())
    }

    async fn count(
        &self,
        only_if_cheap: bool,
        cancel: &CancellationToken,
    ) -> error::Result<CountHint> {
        if only_if_cheap {
            return Ok(CountHint::Unknown);
        }
        Ok(CountHint::Known(self.collect(cancel).await?.len()))
    }
}

impl<T: Element> Sequence<T> {
    /// Each distinct element once, in order of first occurrence.
    pub fn distinct(&self) -> Sequence<T>
    where
        T: Eq + Hash,
    {
        self.distinct_by(DefaultComparer::new())
    }

    /// Like [`Sequence::distinct`], comparing with `comparer`.
    pub fn distinct_by<C>(&self, comparer: C) -> Sequence<T>
    where
        C: EqualityComparer<T> + 'static,
    {
        Sequence::new(Distinct::new(self.clone(), Arc::new(comparer)))
    }
}

#[cfg(test)]
mod tests {
    use aseq_collections::KeyComparer;
    use proptest::prelude::*;

    use super::*;

    #[tokio::test]
    async fn test_first_occurrence_order() {
        let cancel = CancellationToken::new();
        let distinct = Sequence::from_iterable(vec![3, 1, 3, 2, 1]).distinct();
        assert_eq!(distinct.to_vec(&cancel).await.unwrap(), vec![3, 1, 2]);
        // the list path and the pull path agree
        let list = distinct.as_list_source().unwrap();
        assert_eq!(list.to_vec(&cancel).await.unwrap(), vec![3, 1, 2]);
        assert_eq!(list.count(true, &cancel).await.unwrap(), CountHint::Unknown);
        assert_eq!(list.count(false, &cancel).await.unwrap(), CountHint::Known(3));
    }

    #[tokio::test]
    async fn test_distinct_by_key() {
        let cancel = CancellationToken::new();
        let words = Sequence::from_vec(vec!["apple", "Avocado", "banana", "blueberry", "cherry"]);
        let by_initial = words.distinct_by(KeyComparer::new(|word: &&str| {
            word.chars().next().map(|c| c.to_ascii_lowercase())
        }));
        assert_eq!(
            by_initial.to_vec(&cancel).await.unwrap(),
            vec!["apple", "banana", "cherry"]
        );
    }

    #[tokio::test]
    async fn test_enumerations_do_not_share_seen_set() {
        let cancel = CancellationToken::new();
        let distinct = Sequence::from_vec(vec![1, 1, 2]).distinct();
        let mut first = distinct.enumerator(cancel.clone());
        let mut second = distinct.enumerator(cancel.clone());
        assert!(first.move_next().await.unwrap());
        assert!(second.move_next().await.unwrap());
        assert_eq!(first.current().unwrap(), second.current().unwrap());
        first.dispose().await.unwrap();
        second.dispose().await.unwrap();
    }

    proptest! {
        #[test]
        fn test_distinct_is_idempotent(items in prop::collection::vec(0u8..8, 0..30)) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let cancel = CancellationToken::new();
            let source = Sequence::from_iterable(items);
            let once = runtime.block_on(source.distinct().to_vec(&cancel)).unwrap();
            let twice = runtime.block_on(source.distinct().distinct().to_vec(&cancel)).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
