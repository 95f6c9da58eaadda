use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::enumerator::BoxEnumerator;
use crate::error::{self, Error};
use crate::iterator::{AsyncIterator, IteratorCore};
use crate::sequence::{AsyncSequence, Element};

type StreamFactory<T> = dyn Fn() -> BoxStream<'static, anyhow::Result<T>> + Send + Sync;

/// Adapts a `futures` stream factory. Each traversal gets its own stream.
pub struct StreamSource<T> {
    factory: Arc<StreamFactory<T>>,
}

impl<T: Element> StreamSource<T> {
    pub(crate) fn new(
        factory: impl Fn() -> BoxStream<'static, anyhow::Result<T>> + Send + Sync + 'static,
    ) -> Self {
        StreamSource {
            factory: Arc::new(factory),
        }
    }
}

struct StreamCore<T> {
    factory: Arc<StreamFactory<T>>,
    stream: Option<BoxStream<'static, anyhow::Result<T>>>,
}

#[async_trait]
impl<T: Element> IteratorCore<T> for StreamCore<T> {
    async fn open(&mut self, _cancel: &CancellationToken) -> error::Result<()> {
        self.stream = Some((self.factory)());
        Ok(())
    }

    async fn next(&mut self, _cancel: &CancellationToken) -> error::Result<Option<T>> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        match stream.next().await {
            Some(Ok(item)) => Ok(Some(item)),
            Some(Err(error)) => Err(Error::from_source(error)),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> error::Result<()> {
        self.stream = None;
        Ok(())
    }
}

impl<T: Element> AsyncSequence<T> for StreamSource<T> {
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<T> {
        let core = StreamCore {
            factory: self.factory.clone(),
            stream: None,
        };
        AsyncIterator::boxed(core, cancel)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
