use std::any::Any;
use std::future::Future;

use aseq_collections::Maybe;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::callback::Selector;
use crate::capability::{CountHint, ListSource, Partition};
use crate::enumerator::{finish, pull, BoxEnumerator};
use crate::error;
use crate::fusion::fuse_map;
use crate::iterator::{race, AsyncIterator, IteratorCore, Upstream};
use crate::sequence::{AsyncSequence, Element, Sequence};

/// `selector` applied to every element of `source`.
///
/// A map stage has exactly the capabilities of its source: counting, slicing
/// and indexed access go through the source and only apply the selector to
/// the elements that are actually produced.
pub struct Map<S, T> {
    source: Sequence<S>,
    selector: Selector<S, T>,
}

impl<S: Element, T: Element> Map<S, T> {
    pub(crate) fn new(source: Sequence<S>, selector: Selector<S, T>) -> Self {
        Map { source, selector }
    }

    pub fn source(&self) -> &Sequence<S> {
        &self.source
    }

    pub(crate) fn then<U: Element>(&self, selector: Selector<T, U>) -> Map<S, U> {
        Map {
            source: self.source.clone(),
            selector: self.selector.clone().then(selector),
        }
    }

    // outside of an enumerator nothing else races the selector against
    // the token, so do it here
    async fn apply(&self, item: S, cancel: &CancellationToken) -> error::Result<T> {
        race(cancel, self.selector.invoke(item, cancel)).await?
    }

    async fn select(&self, item: Maybe<S>, cancel: &CancellationToken) -> error::Result<Maybe<T>> {
        match item {
            Some(item) => Ok(Some(self.apply(item, cancel).await?)),
            None => Ok(None),
        }
    }
}

struct MapCore<S, T> {
    source: Sequence<S>,
    upstream: Upstream<S>,
    selector: Selector<S, T>,
}

#[async_trait]
impl<S: Element, T: Element> IteratorCore<T> for MapCore<S, T> {
    async fn open(&mut self, cancel: &CancellationToken) -> error::Result<()> {
        self.upstream.open(&self.source, cancel);
        Ok(())
    }

    async fn next(&mut self, cancel: &CancellationToken) -> error::Result<Option<T>> {
        match self.upstream.pull().await? {
            Some(item) => Ok(Some(self.selector.invoke(item, cancel).await?)),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> error::Result<()> {
        self.upstream.close().await
    }
}

impl<S: Element, T: Element> AsyncSequence<T> for Map<S, T> {
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<T> {
        let core = MapCore {
            source: self.source.clone(),
            upstream: Upstream::new(),
            selector: self.selector.clone(),
        };
        AsyncIterator::boxed(core, cancel)
    }

    fn as_partition(&self) -> Option<&dyn Partition<T>> {
        self.source
            .as_partition()
            .map(|_| self as &dyn Partition<T>)
    }

    fn as_list_source(&self) -> Option<&dyn ListSource<T>> {
        self.source
            .as_list_source()
            .map(|_| self as &dyn ListSource<T>)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl<S: Element, T: Element> ListSource<T> for Map<S, T> {
    async fn to_vec(&self, cancel: &CancellationToken) -> error::Result<Vec<T>> {
        let items = self.source.to_vec(cancel).await?;
        let mut selected = Vec::with_capacity(items.len());
        for item in items {
            selected.push(self.apply(item, cancel).await?);
        }
        Ok(selected)
    }

    async fn count(
        &self,
        only_if_cheap: bool,
        cancel: &CancellationToken,
    ) -> error::Result<CountHint> {
        if only_if_cheap {
            return match self.source.as_list_source() {
                Some(list) => list.count(true, cancel).await,
                None => Ok(CountHint::Unknown),
            };
        }
        // an expensive count still runs the selector on every element, so
        // that its failures and side effects are not skipped
        let mut enumerator = self.source.enumerator(cancel.clone());
        let mut count = 0;
        let result = loop {
            match pull(&mut enumerator).await {
                Ok(Some(item)) => {
                    if let Err(error) = self.apply(item, cancel).await {
                        break Err(error);
                    }
                    count += 1;
                }
                Ok(None) => break Ok(CountHint::Known(count)),
                Err(error) => break Err(error),
            }
        };
        finish(&mut enumerator, result).await
    }
}

#[async_trait]
impl<S: Element, T: Element> Partition<T> for Map<S, T> {
    fn skip(&self, count: usize) -> Sequence<T> {
        Sequence::new(Map::new(self.source.skip(count), self.selector.clone()))
    }

    fn take(&self, count: usize) -> Sequence<T> {
        if count == 0 {
            return Sequence::empty();
        }
        Sequence::new(Map::new(self.source.take(count), self.selector.clone()))
    }

    async fn try_get_element_at(
        &self,
        index: usize,
        cancel: &CancellationToken,
    ) -> error::Result<Maybe<T>> {
        let item = self.source.element_at_or_none(index, cancel).await?;
        self.select(item, cancel).await
    }

    async fn try_get_first(&self, cancel: &CancellationToken) -> error::Result<Maybe<T>> {
        let item = self.source.first_or_none(cancel).await?;
        self.select(item, cancel).await
    }

    async fn try_get_last(&self, cancel: &CancellationToken) -> error::Result<Maybe<T>> {
        let item = self.source.last_or_none(cancel).await?;
        self.select(item, cancel).await
    }
}

impl<T: Element> Sequence<T> {
    /// `selector` applied to every element.
    pub fn map<U: Element>(&self, selector: impl Fn(T) -> U + Send + Sync + 'static) -> Sequence<U> {
        self.map_with(Selector::new(selector))
    }

    /// Like [`Sequence::map`], with a selector that can fail.
    pub fn try_map<U: Element>(
        &self,
        selector: impl Fn(T) -> anyhow::Result<U> + Send + Sync + 'static,
    ) -> Sequence<U> {
        self.map_with(Selector::fallible(selector))
    }

    pub fn map_await<U, F, Fut>(&self, selector: F) -> Sequence<U>
    where
        U: Element,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<U>> + Send + 'static,
    {
        self.map_with(Selector::future(selector))
    }

    pub fn map_await_with_cancellation<U, F, Fut>(&self, selector: F) -> Sequence<U>
    where
        U: Element,
        F: Fn(T, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<U>> + Send + 'static,
    {
        self.map_with(Selector::cancellable(selector))
    }

    /// Map with an already built selector of any calling convention.
    pub fn map_with<U: Element>(&self, selector: Selector<T, U>) -> Sequence<U> {
        fuse_map(self, selector)
    }
}
