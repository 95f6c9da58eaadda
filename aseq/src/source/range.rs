use std::any::Any;

use aseq_collections::Maybe;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::capability::{CountHint, ListSource, Partition};
use crate::enumerator::BoxEnumerator;
use crate::error;
use crate::iterator::{AsyncIterator, IteratorCore};
use crate::sequence::{AsyncSequence, Sequence};

/// Consecutive integers. Everything about it is known up front, so all
/// partition queries are answered arithmetically.
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    start: i64,
    count: usize,
}

impl Range {
    // the caller has checked that `start + count - 1` fits
    pub(crate) fn new(start: i64, count: usize) -> Self {
        Range { start, count }
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    fn value_at(&self, index: usize) -> i64 {
        // index < count, and start + count - 1 fits in an i64
        self.start + index as i64
    }
}

struct RangeCore {
    range: Range,
    index: usize,
}

#[async_trait]
impl IteratorCore<i64> for RangeCore {
    async fn next(&mut self, _cancel: &CancellationToken) -> error::Result<Option<i64>> {
        if self.index < self.range.count {
            let value = self.range.value_at(self.index);
            self.index += 1;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }
}

impl AsyncSequence<i64> for Range {
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<i64> {
        let core = RangeCore {
            range: self.clone(),
            index: 0,
        };
        AsyncIterator::boxed(core, cancel)
    }

    fn as_partition(&self) -> Option<&dyn Partition<i64>> {
        Some(self)
    }

    fn as_list_source(&self) -> Option<&dyn ListSource<i64>> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl ListSource<i64> for Range {
    async fn to_vec(&self, _cancel: &CancellationToken) -> error::Result<Vec<i64>> {
        let mut values = Vec::with_capacity(self.count);
        values.extend((0..self.count).map(|index| self.value_at(index)));
        Ok(values)
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
impl Partition<i64> for Range {
    fn skip(&self, count: usize) -> Sequence<i64> {
        if count >= self.count {
            return Sequence::empty();
        }
        Sequence::new(Range::new(self.value_at(count), self.count - count))
    }

    fn take(&self, count: usize) -> Sequence<i64> {
        if count == 0 {
            return Sequence::empty();
        }
        Sequence::new(Range::new(self.start, count.min(self.count)))
    }

    async fn try_get_element_at(
        &self,
        index: usize,
        _cancel: &CancellationToken,
    ) -> error::Result<Maybe<i64>> {
        Ok((index < self.count).then(|| self.value_at(index)))
    }

    async fn try_get_first(&self, _cancel: &CancellationToken) -> error::Result<Maybe<i64>> {
        Ok((self.count > 0).then_some(self.start))
    }

    async fn try_get_last(&self, _cancel: &CancellationToken) -> error::Result<Maybe<i64>> {
        Ok((self.count > 0).then(|| self.value_at(self.count - 1)))
    }
}
