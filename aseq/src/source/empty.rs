use std::any::Any;
use std::marker::PhantomData;

use aseq_collections::Maybe;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::capability::{CountHint, ListSource, Partition};
use crate::enumerator::BoxEnumerator;
use crate::error;
use crate::iterator::{AsyncIterator, IteratorCore};
use crate::sequence::{AsyncSequence, Element, Sequence};

pub struct Empty<T> {
    _element: PhantomData<fn() -> T>,
}

impl<T> Empty<T> {
    pub(crate) fn new() -> Self {
        Self {
            _element: PhantomData,
        }
    }
}

struct EmptyCore;

#[async_trait]
impl<T: Element> IteratorCore<T> for EmptyCore {
    async fn next(&mut self, _cancel: &CancellationToken) -> error::Result<Option<T>> {
        Ok(None)
    }
}

impl<T: Element> AsyncSequence<T> for Empty<T> {
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<T> {
        AsyncIterator::boxed(EmptyCore, cancel)
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
impl<T: Element> ListSource<T> for Empty<T> {
    async fn to_vec(&self, _cancel: &CancellationToken) -> error::Result<Vec<T>> {
        Ok(Vec::new())
    }

    async fn count(
        &self,
        _only_if_cheap: bool,
        _cancel: &CancellationToken,
    ) -> error::Result<CountHint> {
        Ok(CountHint::Known(0))
    }
}

#[async_trait]
impl<T: Element> Partition<T> for Empty<T> {
    fn skip(&self, _count: usize) -> Sequence<T> {
        Sequence::empty()
    }

    fn take(&self, _count: usize) -> Sequence<T> {
        Sequence::empty()
    }

    async fn try_get_element_at(
        &self,
        _index: usize,
        _cancel: &CancellationToken,
    ) -> error::Result<Maybe<T>> {
        Ok(None)
    }

    async fn try_get_first(&self, _cancel: &CancellationToken) -> error::Result<Maybe<T>> {
        Ok(None)
    }

    async fn try_get_last(&self, _cancel: &CancellationToken) -> error::Result<Maybe<T>> {
        Ok(None)
    }
}
