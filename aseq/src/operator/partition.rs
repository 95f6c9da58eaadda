//! Skip and take over sources that cannot slice themselves.

use std::any::Any;

use aseq_collections::Maybe;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::capability::{CountHint, ListSource, Partition};
use crate::enumerator::{pull, BoxEnumerator};
use crate::error;
use crate::iterator::{AsyncIterator, IteratorCore, Upstream};
use crate::sequence::{AsyncSequence, Element, Sequence};

/// The elements of `source` at positions `start..end`.
///
/// Slicing a slice narrows the bounds instead of wrapping it again. Bounds
/// saturate: skipping past `usize::MAX` simply skips everything.
pub struct Slice<T> {
    source: Sequence<T>,
    start: usize,
    end: Option<usize>,
}

impl<T: Element> Slice<T> {
    pub(crate) fn new(source: Sequence<T>, start: usize, end: Option<usize>) -> Self {
        Slice { source, start, end }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> Option<usize> {
        self.end
    }

    fn narrowed(&self, start: usize, end: Option<usize>) -> Sequence<T> {
        if matches!(end, Some(end) if end <= start) {
            return Sequence::empty();
        }
        Sequence::new(Slice::new(self.source.clone(), start, end))
    }

    // clamp a count of the whole source to the slice bounds
    fn clamp(&self, count: usize) -> usize {
        let end = self.end.map_or(count, |end| end.min(count));
        end.saturating_sub(self.start)
    }

    async fn pull_last(&self, cancel: &CancellationToken) -> error::Result<Maybe<T>> {
        let mut enumerator = self.enumerator(cancel.clone());
        let mut last = None;
        while let Some(item) = pull(&mut enumerator).await? {
            last = Some(item);
        }
        Ok(last)
    }
}

struct SliceCore<T> {
    source: Sequence<T>,
    upstream: Upstream<T>,
    start: usize,
    end: Option<usize>,
    position: usize,
}

#[async_trait]
impl<T: Element> IteratorCore<T> for SliceCore<T> {
    async fn open(&mut self, cancel: &CancellationToken) -> error::Result<()> {
        self.upstream.open(&self.source, cancel);
        while self.position < self.start {
            if self.upstream.pull().await?.is_none() {
                break;
            }
            self.position += 1;
        }
        Ok(())
    }

    async fn next(&mut self, _cancel: &CancellationToken) -> error::Result<Option<T>> {
        if self.position < self.start || self.end.is_some_and(|end| self.position >= end) {
            return Ok(None);
        }
        let item = self.upstream.pull().await?;
        if item.is_some() {
            self.position += 1;
            if self.end == Some(self.position) {
                // nothing more will be taken
                self.upstream.close().await?;
            }
        }
        Ok(item)
    }

    async fn close(&mut self) -> error::Result<()> {
        self.upstream.close().await
    }
}

impl<T: Element> AsyncSequence<T> for Slice<T> {
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<T> {
        let core = SliceCore {
            source: self.source.clone(),
            upstream: Upstream::new(),
            start: self.start,
            end: self.end,
            position: 0,
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
impl<T: Element> ListSource<T> for Slice<T> {
    async fn to_vec(&self, cancel: &CancellationToken) -> error::Result<Vec<T>> {
        let mut enumerator = self.enumerator(cancel.clone());
        let mut items = Vec::new();
        while let Some(item) = pull(&mut enumerator).await? {
            items.push(item);
        }
        Ok(items)
    }

    async fn count(
        &self,
        only_if_cheap: bool,
        cancel: &CancellationToken,
    ) -> error::Result<CountHint> {
        if let Some(list) = self.source.as_list_source() {
            if let CountHint::Known(count) = list.count(true, cancel).await? {
                return Ok(CountHint::Known(self.clamp(count)));
            }
        }
        if only_if_cheap {
            return Ok(CountHint::Unknown);
        }
        let mut enumerator = self.enumerator(cancel.clone());
        let mut count = 0;
        while pull(&mut enumerator).await?.is_some() {
            count += 1;
        }
        Ok(CountHint::Known(count))
    }
}

#[async_trait]
impl<T: Element> Partition<T> for Slice<T> {
    fn skip(&self, count: usize) -> Sequence<T> {
        self.narrowed(self.start.saturating_add(count), self.end)
    }

    fn take(&self, count: usize) -> Sequence<T> {
        let end = self.start.saturating_add(count);
        self.narrowed(self.start, Some(self.end.map_or(end, |current| current.min(end))))
    }

    async fn try_get_element_at(
        &self,
        index: usize,
        cancel: &CancellationToken,
    ) -> error::Result<Maybe<T>> {
        let Some(position) = self.start.checked_add(index) else {
            return Ok(None);
        };
        if self.end.is_some_and(|end| position >= end) {
            return Ok(None);
        }
        self.source.element_at_or_none(position, cancel).await
    }

    async fn try_get_first(&self, cancel: &CancellationToken) -> error::Result<Maybe<T>> {
        self.try_get_element_at(0, cancel).await
    }

    async fn try_get_last(&self, cancel: &CancellationToken) -> error::Result<Maybe<T>> {
        if let Some(list) = self.source.as_list_source() {
            if let CountHint::Known(count) = list.count(true, cancel).await? {
                return match self.clamp(count) {
                    0 => Ok(None),
                    len => self.try_get_element_at(len - 1, cancel).await,
                };
            }
        }
        self.pull_last(cancel).await
    }
}

impl<T: Element> Sequence<T> {
    /// Everything after the first `count` elements.
    ///
    /// Sources that can slice themselves do so directly, without pulling the
    /// skipped elements.
    pub fn skip(&self, count: usize) -> Sequence<T> {
        if count == 0 {
            return self.clone();
        }
        match self.as_partition() {
            Some(partition) => partition.skip(count),
            None => Sequence::new(Slice::new(self.clone(), count, None)),
        }
    }

    /// At most the first `count` elements.
    ///
    /// `take(0)` is empty and never opens the source.
    pub fn take(&self, count: usize) -> Sequence<T> {
        if count == 0 {
            return Sequence::empty();
        }
        match self.as_partition() {
            Some(partition) => partition.take(count),
            None => Sequence::new(Slice::new(self.clone(), 0, Some(count))),
        }
    }
}
