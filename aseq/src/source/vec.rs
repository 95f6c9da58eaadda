use std::any::Any;
use std::sync::Arc;

use aseq_collections::Maybe;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::capability::{CountHint, ListSource, Partition};
use crate::enumerator::BoxEnumerator;
use crate::error;
use crate::iterator::{AsyncIterator, IteratorCore};
use crate::sequence::{AsyncSequence, Element, Sequence};

/// A window onto shared, immutable elements.
///
/// Skip and take narrow the window; the elements themselves are never copied.
pub struct VecSource<T> {
    items: Arc<[T]>,
    start: usize,
    end: usize,
}

impl<T: Element> VecSource<T> {
    pub(crate) fn new(items: Arc<[T]>) -> Self {
        let end = items.len();
        VecSource {
            items,
            start: 0,
            end,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items[self.start..self.end]
    }

    fn window(&self, start: usize, end: usize) -> Sequence<T> {
        if start >= end {
            return Sequence::empty();
        }
        Sequence::new(VecSource {
            items: self.items.clone(),
            start,
            end,
        })
    }
}

struct VecCore<T> {
    items: Arc<[T]>,
    index: usize,
    end: usize,
}

#[async_trait]
impl<T: Element> IteratorCore<T> for VecCore<T> {
    async fn next(&mut self, _cancel: &CancellationToken) -> error::Result<Option<T>> {
        if self.index >= self.end {
            return Ok(None);
        }
        let item = self.items[self.index].clone();
        self.index += 1;
        Ok(Some(item))
    }
}

impl<T: Element> AsyncSequence<T> for VecSource<T> {
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<T> {
        let core = VecCore {
            items: self.items.clone(),
            index: self.start,
            end: self.end,
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
impl<T: Element> ListSource<T> for VecSource<T> {
    async fn to_vec(&self, _cancel: &CancellationToken) -> error::Result<Vec<T>> {
        Ok(self.as_slice().to_vec())
    }

    async fn count(
        &self,
        _only_if_cheap: bool,
        _cancel: &CancellationToken,
    ) -> error::Result<CountHint> {
        Ok(CountHint::Known(self.len()))
    }
}

#[async_trait]
impl<T: Element> Partition<T> for VecSource<T> {
    fn skip(&self, count: usize) -> Sequence<T> {
        let start = self.start.saturating_add(count).min(self.end);
        self.window(start, self.end)
    }

    fn take(&self, count: usize) -> Sequence<T> {
        let end = self.start.saturating_add(count).min(self.end);
        self.window(self.start, end)
    }

    async fn try_get_element_at(
        &self,
        index: usize,
        _cancel: &CancellationToken,
    ) -> error::Result<Maybe<T>> {
        Ok(self.as_slice().get(index).cloned())
    }

    async fn try_get_first(&self, _cancel: &CancellationToken) -> error::Result<Maybe<T>> {
        Ok(self.as_slice().first().cloned())
    }

    async fn try_get_last(&self, _cancel: &CancellationToken) -> error::Result<Maybe<T>> {
        Ok(self.as_slice().last().cloned())
    }
}
