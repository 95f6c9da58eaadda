use std::any::Any;
use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::callback::{Predicate, Selector};
use crate::enumerator::BoxEnumerator;
use crate::error;
use crate::fusion::{fuse_filter, Predicates};
use crate::iterator::{AsyncIterator, IteratorCore, Upstream};
use crate::sequence::{AsyncSequence, Element, Sequence};

/// Elements of `source` accepted by every predicate stage.
pub struct Filter<T> {
    source: Sequence<T>,
    predicates: Predicates<T>,
}

impl<T: Element> Filter<T> {
    pub(crate) fn new(source: Sequence<T>, predicates: Predicates<T>) -> Self {
        Filter { source, predicates }
    }

    pub fn predicates(&self) -> &Predicates<T> {
        &self.predicates
    }

    /// This stage with one more predicate evaluated last.
    pub(crate) fn and(&self, predicate: Predicate<T>) -> Filter<T> {
        Filter {
            source: self.source.clone(),
            predicates: self.predicates.and(predicate),
        }
    }

    pub(crate) fn then_map<U: Element>(&self, selector: Selector<T, U>) -> FilterMap<T, U> {
        FilterMap {
            source: self.source.clone(),
            predicates: self.predicates.clone(),
            selector,
        }
    }
}

struct FilterCore<T> {
    source: Sequence<T>,
    upstream: Upstream<T>,
    predicates: Predicates<T>,
}

#[async_trait]
impl<T: Element> IteratorCore<T> for FilterCore<T> {
    async fn open(&mut self, cancel: &CancellationToken) -> error::Result<()> {
        self.upstream.open(&self.source, cancel);
        Ok(())
    }

    async fn next(&mut self, cancel: &CancellationToken) -> error::Result<Option<T>> {
        while let Some(item) = self.upstream.pull().await? {
            if self.predicates.matches(&item, cancel).await? {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> error::Result<()> {
        self.upstream.close().await
    }
}

impl<T: Element> AsyncSequence<T> for Filter<T> {
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<T> {
        let core = FilterCore {
            source: self.source.clone(),
            upstream: Upstream::new(),
            predicates: self.predicates.clone(),
        };
        AsyncIterator::boxed(core, cancel)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A filter stage followed by a selector, evaluated as one stage.
pub struct FilterMap<T, U> {
    source: Sequence<T>,
    predicates: Predicates<T>,
    selector: Selector<T, U>,
}

impl<T: Element, U: Element> FilterMap<T, U> {
    pub fn predicates(&self) -> &Predicates<T> {
        &self.predicates
    }

    pub(crate) fn then<V: Element>(&self, selector: Selector<U, V>) -> FilterMap<T, V> {
        FilterMap {
            source: self.source.clone(),
            predicates: self.predicates.clone(),
            selector: self.selector.clone().then(selector),
        }
    }
}

struct FilterMapCore<T, U> {
    source: Sequence<T>,
    upstream: Upstream<T>,
    predicates: Predicates<T>,
    selector: Selector<T, U>,
}

#[async_trait]
impl<T: Element, U: Element> IteratorCore<U> for FilterMapCore<T, U> {
    async fn open(&mut self, cancel: &CancellationToken) -> error::Result<()> {
        self.upstream.open(&self.source, cancel);
        Ok(())
    }

    async fn next(&mut self, cancel: &CancellationToken) -> error::Result<Option<U>> {
        while let Some(item) = self.upstream.pull().await? {
            if self.predicates.matches(&item, cancel).await? {
                return Ok(Some(self.selector.invoke(item, cancel).await?));
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> error::Result<()> {
        self.upstream.close().await
    }
}

impl<T: Element, U: Element> AsyncSequence<U> for FilterMap<T, U> {
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<U> {
        let core = FilterMapCore {
            source: self.source.clone(),
            upstream: Upstream::new(),
            predicates: self.predicates.clone(),
            selector: self.selector.clone(),
        };
        AsyncIterator::boxed(core, cancel)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Element> Sequence<T> {
    /// Elements accepted by `predicate`.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Sequence<T> {
        self.filter_with(Predicate::new(predicate))
    }

    /// Like [`Sequence::filter`], with a predicate that can fail.
    pub fn try_filter(
        &self,
        predicate: impl Fn(&T) -> anyhow::Result<bool> + Send + Sync + 'static,
    ) -> Sequence<T> {
        self.filter_with(Predicate::fallible(predicate))
    }

    pub fn filter_await<F, Fut>(&self, predicate: F) -> Sequence<T>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        self.filter_with(Predicate::future(predicate))
    }

    pub fn filter_await_with_cancellation<F, Fut>(&self, predicate: F) -> Sequence<T>
    where
        F: Fn(T, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        self.filter_with(Predicate::cancellable(predicate))
    }

    /// Filter with an already built predicate of any calling convention.
    pub fn filter_with(&self, predicate: Predicate<T>) -> Sequence<T> {
        fuse_filter(self, predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_filter() {
        let cancel = CancellationToken::new();
        let evens = Sequence::range(1, 10).unwrap().filter(|x| x % 2 == 0);
        assert_eq!(evens.to_vec(&cancel).await.unwrap(), vec![2, 4, 6, 8, 10]);
    }

    #[tokio::test]
    async fn test_calling_conventions_mix_in_one_stage() {
        let cancel = CancellationToken::new();
        let filtered = Sequence::range(1, 20)
            .unwrap()
            .filter(|x| x % 2 == 0)
            .filter_await(|x| async move { Ok(x % 3 == 0) })
            .filter_await_with_cancellation(|x, cancel| async move {
                Ok(!cancel.is_cancelled() && x > 6)
            });
        assert_eq!(filtered.downcast_ref::<Filter<i64>>().unwrap().predicates().len(), 3);
        assert_eq!(filtered.to_vec(&cancel).await.unwrap(), vec![12, 18]);
    }

    #[tokio::test]
    async fn test_filter_map() {
        let cancel = CancellationToken::new();
        let scaled = Sequence::from_vec(vec![1, 2, 3, 4])
            .filter(|x| *x > 2)
            .map(|x| x * 10)
            .map(|x| x + 1);
        assert!(scaled.downcast_ref::<FilterMap<i32, i32>>().is_some());
        assert_eq!(scaled.to_vec(&cancel).await.unwrap(), vec![31, 41]);

        let labels = Sequence::from_vec(vec![1, 2, 3, 4])
            .filter(|x| *x > 2)
            .map(|x| format!("#{x}"));
        assert!(labels.downcast_ref::<FilterMap<i32, String>>().is_some());
        assert_eq!(labels.to_vec(&cancel).await.unwrap(), vec!["#3", "#4"]);
    }

    #[tokio::test]
    async fn test_predicate_failure_ends_traversal() {
        let cancel = CancellationToken::new();
        let filtered = Sequence::from_vec(vec![1, 2, 3]).try_filter(|x| {
            if *x == 2 {
                anyhow::bail!("rejecting {x}");
            }
            Ok(true)
        });
        let mut enumerator = filtered.enumerator(cancel);
        assert!(enumerator.move_next().await.unwrap());
        let error = enumerator.move_next().await.unwrap_err();
        assert!(matches!(error, Error::Callback(_)));
        assert!(!enumerator.move_next().await.unwrap());
    }
}
