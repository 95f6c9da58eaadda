use std::any::Any;
use std::collections::VecDeque;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::enumerator::BoxEnumerator;
use crate::error;
use crate::iterator::{AsyncIterator, IteratorCore, Upstream};
use crate::sequence::{AsyncSequence, Element, Sequence};

/// The last `count` elements of `source`.
pub struct TakeLast<T> {
    source: Sequence<T>,
    count: usize,
}

struct TakeLastCore<T> {
    source: Sequence<T>,
    upstream: Upstream<T>,
    count: usize,
    buffer: VecDeque<T>,
}

#[async_trait]
impl<T: Element> IteratorCore<T> for TakeLastCore<T> {
    async fn open(&mut self, cancel: &CancellationToken) -> error::Result<()> {
        self.upstream.open(&self.source, cancel);
        while let Some(item) = self.upstream.pull().await? {
            if self.buffer.len() == self.count {
                self.buffer.pop_front();
            }
            self.buffer.push_back(item);
        }
        self.upstream.close().await
    }

    async fn next(&mut self, _cancel: &CancellationToken) -> error::Result<Option<T>> {
        Ok(self.buffer.pop_front())
    }

    async fn close(&mut self) -> error::Result<()> {
        self.buffer = VecDeque::new();
        self.upstream.close().await
    }
}

impl<T: Element> AsyncSequence<T> for TakeLast<T> {
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<T> {
        let core = TakeLastCore {
            source: self.source.clone(),
            upstream: Upstream::new(),
            count: self.count,
            buffer: VecDeque::new(),
        };
        AsyncIterator::boxed(core, cancel)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// All but the last `count` elements of `source`.
pub struct SkipLast<T> {
    source: Sequence<T>,
    count: usize,
}

struct SkipLastCore<T> {
    source: Sequence<T>,
    upstream: Upstream<T>,
    count: usize,
    buffer: VecDeque<T>,
}

#[async_trait]
impl<T: Element> IteratorCore<T> for SkipLastCore<T> {
    async fn open(&mut self, cancel: &CancellationToken) -> error::Result<()> {
        self.upstream.open(&self.source, cancel);
        Ok(())
    }

    async fn next(&mut self, _cancel: &CancellationToken) -> error::Result<Option<T>> {
        // an element is released once `count` newer ones are known to follow
        while let Some(item) = self.upstream.pull().await? {
            self.buffer.push_back(item);
            if self.buffer.len() > self.count {
                return Ok(self.buffer.pop_front());
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> error::Result<()> {
        self.buffer = VecDeque::new();
        self.upstream.close().await
    }
}

impl<T: Element> AsyncSequence<T> for SkipLast<T> {
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<T> {
        let core = SkipLastCore {
            source: self.source.clone(),
            upstream: Upstream::new(),
            count: self.count,
            buffer: VecDeque::with_capacity(self.count.saturating_add(1).min(1024)),
        };
        AsyncIterator::boxed(core, cancel)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Element> Sequence<T> {
    /// The last `count` elements. The source is drained at the first pull,
    /// keeping at most `count` elements.
    pub fn take_last(&self, count: usize) -> Sequence<T> {
        if count == 0 {
            return Sequence::empty();
        }
        Sequence::new(TakeLast {
            source: self.clone(),
            count,
        })
    }

    /// All but the last `count` elements.
    pub fn skip_last(&self, count: usize) -> Sequence<T> {
        if count == 0 {
            return self.clone();
        }
        Sequence::new(SkipLast {
            source: self.clone(),
            count,
        })
    }
}
