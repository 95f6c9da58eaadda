use std::any::Any;

use aseq_collections::Maybe;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::capability::{CountHint, ListSource, Partition};
use crate::enumerator::BoxEnumerator;
use crate::error;
use crate::iterator::{AsyncIterator, IteratorCore};
use crate::sequence::{AsyncSequence, Element, Sequence};

/// The same element a fixed number of times.
#[derive(Debug, Clone)]
pub struct Repeat<T> {
    element: T,
    count: usize,
}

impl<T: Element> Repeat<T> {
    pub(crate) fn new(element: T, count: usize) -> Self {
        Repeat { element, count }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn with_count(&self, count: usize) -> Sequence<T> {
        if count == 0 {
            Sequence::empty()
        } else {
            Sequence::new(Repeat::new(self.element.clone(), count))
        }
    }
}

struct RepeatCore<T> {
    element: T,
    remaining: usize,
}

#[async_trait]
impl<T: Element> IteratorCore<T> for RepeatCore<T> {
    async fn next(&mut self, _cancel: &CancellationToken) -> error::Result<Option<T>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        Ok(Some(self.element.clone()))
    }
}

impl<T: Element> AsyncSequence<T> for Repeat<T> {
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<T> {
        let core = RepeatCore {
            element: self.element.clone(),
            remaining: self.count,
        };
        AsyncIterator::boxed(core, cancel)
    }

    fn as_partition(&self) -> Option<&dyn Partition<T>> {
        Some(self)
    }

    fn as_list_source(&self) -> Option<&dyn ListSource<T>> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl<T: Element> ListSource<T> for Repeat<T> {
    async fn to_vec(&self, _cancel: &CancellationToken) -> error::Result<Vec<T>> {
        Ok(vec![self.element.clone(); self.count])
    }

    async fn count(
        &self,
        _only_if_cheap: bool,
        _cancel: &CancellationToken,
    ) -> error::Result<CountHint> {
        Ok(CountHint::Known(self.count))
    }
}

#[async_trait]
impl<T: Element> Partition<T> for Repeat<T> {
    fn skip(&self, count: usize) -> Sequence<T> {
        self.with_count(self.count.saturating_sub(count))
    }

    fn take(&self, count: usize) -> Sequence<T> {
        self.with_count(self.count.min(count))
    }

    async fn try_get_element_at(
        &self,
        index: usize,
        _cancel: &CancellationToken,
    ) -> error::Result<Maybe<T>> {
        Ok((index < self.count).then(|| self.element.clone()))
    }

    async fn try_get_first(&self, _cancel: &CancellationToken) -> error::Result<Maybe<T>> {
        Ok((self.count > 0).then(|| self.element.clone()))
    }

    async fn try_get_last(&self, _cancel: &CancellationToken) -> error::Result<Maybe<T>> {
        Ok((self.count > 0).then(|| self.element.clone()))
    }
}
