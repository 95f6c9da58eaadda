use std::any::Any;

use aseq_collections::Maybe;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::capability::{CountHint, ListSource, Partition};
use crate::enumerator::BoxEnumerator;
use crate::error;
use crate::iterator::{AsyncIterator, IteratorCore};
use crate::sequence::{AsyncSequence, Element, Sequence};

/// The elements of `source`, last first.
pub struct Reverse<T> {
    source: Sequence<T>,
}

struct ReverseCore<T> {
    source: Sequence<T>,
    buffer: Vec<T>,
}

#[async_trait]
impl<T: Element> IteratorCore<T> for ReverseCore<T> {
    async fn open(&mut self, cancel: &CancellationToken) -> error::Result<()> {
        self.buffer = self.source.to_vec(cancel).await?;
        Ok(())
    }

    async fn next(&mut self, _cancel: &CancellationToken) -> error::Result<Option<T>> {
        Ok(self.buffer.pop())
    }

    async fn close(&mut self) -> error::Result<()> {
        self.buffer = Vec::new();
        Ok(())
    }
}

impl<T: Element> AsyncSequence<T> for Reverse<T> {
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<T> {
        let core = ReverseCore {
            source: self.source.clone(),
            buffer: Vec::new(),
        };
        AsyncIterator::boxed(core, cancel)
    }

    fn as_partition(&self) -> Option<&dyn Partition<T>> {
        self.source
            .as_partition()
            .map(|_| self as &dyn Partition<T>)
    }

    fn as_list_source(&self) -> Option<&dyn ListSource<T>> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl<T: Element> ListSource<T> for Reverse<T> {
    async fn to_vec(&self, cancel: &CancellationToken) -> error::Result<Vec<T>> {
        let mut items = self.source.to_vec(cancel).await?;
        items.reverse();
        Ok(items)
    }

    async fn count(
        &self,
        only_if_cheap: bool,
        cancel: &CancellationToken,
    ) -> error::Result<CountHint> {
        match self.source.as_list_source() {
            Some(list) => list.count(only_if_cheap, cancel).await,
            None if only_if_cheap => Ok(CountHint::Unknown),
            None => Ok(CountHint::Known(self.source.count(cancel).await?)),
        }
    }
}

// only advertised over a partition source, whose count is always cheap
#[async_trait]
impl<T: Element> Partition<T> for Reverse<T> {
    fn skip(&self, count: usize) -> Sequence<T> {
        self.source.skip_last(count).reverse()
    }

    fn take(&self, count: usize) -> Sequence<T> {
        self.source.take_last(count).reverse()
    }

    async fn try_get_element_at(
        &self,
        index: usize,
        cancel: &CancellationToken,
    ) -> error::Result<Maybe<T>> {
        let count = self.source.count(cancel).await?;
        if index >= count {
            return Ok(None);
        }
        self.source.element_at_or_none(count - 1 - index, cancel).await
    }

    async fn try_get_first(&self, cancel: &CancellationToken) -> error::Result<Maybe<T>> {
        self.source.last_or_none(cancel).await
    }

    async fn try_get_last(&self, cancel: &CancellationToken) -> error::Result<Maybe<T>> {
        self.source.first_or_none(cancel).await
    }
}

impl<T: Element> Sequence<T> {
    /// The elements in reverse order. The whole source is buffered at the
    /// first pull.
    pub fn reverse(&self) -> Sequence<T> {
        if let Some(reversed) = self.downcast_ref::<Reverse<T>>() {
            return reversed.source.clone();
        }
        Sequence::new(Reverse {
            source: self.clone(),
        })
    }
}
