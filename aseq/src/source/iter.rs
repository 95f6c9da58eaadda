use std::any::Any;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::enumerator::BoxEnumerator;
use crate::error;
use crate::iterator::{AsyncIterator, IteratorCore};
use crate::sequence::{AsyncSequence, Element};

/// Replays a synchronous iterable.
#[derive(Debug, Clone)]
pub struct IterSource<I> {
    iterable: I,
}

impl<I> IterSource<I> {
    pub(crate) fn new(iterable: I) -> Self {
        IterSource { iterable }
    }
}

struct IterCore<I: IntoIterator> {
    iterable: I,
    iter: Option<I::IntoIter>,
}

#[async_trait]
impl<T, I> IteratorCore<T> for IterCore<I>
where
    T: Element,
    I: IntoIterator<Item = T> + Clone + Send + 'static,
    I::IntoIter: Send,
{
    async fn open(&mut self, _cancel: &CancellationToken) -> error::Result<()> {
        self.iter = Some(self.iterable.clone().into_iter());
        Ok(())
    }

    async fn next(&mut self, _cancel: &CancellationToken) -> error::Result<Option<T>> {
        Ok(self.iter.as_mut().and_then(Iterator::next))
    }

    async fn close(&mut self) -> error::Result<()> {
        self.iter = None;
        Ok(())
    }
}

impl<T, I> AsyncSequence<T> for IterSource<I>
where
    T: Element,
    I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
    I::IntoIter: Send + 'static,
{
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<T> {
        let core = IterCore {
            iterable: self.iterable.clone(),
            iter: None,
        };
        AsyncIterator::boxed(core, cancel)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
