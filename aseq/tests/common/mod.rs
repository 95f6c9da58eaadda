// disable dead code warning for this module: every test file includes it,
// but none of them uses all of it
#![allow(dead_code)]

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use aseq::{
    error, AsyncIterator, AsyncSequence, BoxEnumerator, CancellationToken, CountHint,
    IteratorCore, ListSource, Maybe, Partition, Sequence,
};
use async_trait::async_trait;

/// How often the instrumented source was touched.
#[derive(Debug, Default)]
pub struct Counters {
    opened: AtomicUsize,
    pulled: AtomicUsize,
    disposed: AtomicUsize,
}

impl Counters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// A source over fixed items that records opens, pulls and disposals.
#[derive(Clone)]
pub struct Instrumented {
    items: Arc<[i32]>,
    fail_at: Option<usize>,
    stall_at: Option<usize>,
    fail_on_dispose: bool,
    capable: bool,
    counters: Arc<Counters>,
}

impl Instrumented {
    /// A pull-only source.
    pub fn new(items: Vec<i32>) -> Self {
        Self {
            items: items.into(),
            fail_at: None,
            stall_at: None,
            fail_on_dispose: false,
            capable: false,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Also advertise partition and list capabilities.
    pub fn capable(mut self) -> Self {
        self.capable = true;
        self
    }

    /// Fail the pull for the element at `index`.
    pub fn fail_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// Never complete the pull for the element at `index`.
    pub fn stall_at(mut self, index: usize) -> Self {
        self.stall_at = Some(index);
        self
    }

    /// Report a failure from every disposal (the disposal is still counted).
    pub fn fail_on_dispose(mut self) -> Self {
        self.fail_on_dispose = true;
        self
    }

    pub fn counters(&self) -> Arc<Counters> {
        self.counters.clone()
    }

    pub fn sequence(self) -> Sequence<i32> {
        Sequence::new(self)
    }

    fn window(&self, start: usize, end: usize) -> Sequence<i32> {
        let mut window = self.clone();
        window.items = self.items[start..end.max(start)].into();
        Sequence::new(window)
    }
}

struct InstrumentedCore {
    source: Instrumented,
    index: usize,
}

#[async_trait]
impl IteratorCore<i32> for InstrumentedCore {
    async fn open(&mut self, _cancel: &CancellationToken) -> error::Result<()> {
        self.source.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn next(&mut self, _cancel: &CancellationToken) -> error::Result<Option<i32>> {
        self.source.counters.pulled.fetch_add(1, Ordering::SeqCst);
        let index = self.index;
        if self.source.stall_at == Some(index) {
            std::future::pending::<()>().await;
        }
        if self.source.fail_at == Some(index) {
            return Err(error::Error::Source(anyhow::anyhow!("failed at {index}")));
        }
        self.index += 1;
        Ok(self.source.items.get(index).copied())
    }

    async fn close(&mut self) -> error::Result<()> {
        self.source.counters.disposed.fetch_add(1, Ordering::SeqCst);
        if self.source.fail_on_dispose {
            return Err(error::Error::Source(anyhow::anyhow!("dispose failed")));
        }
        Ok(())
    }
}

impl AsyncSequence<i32> for Instrumented {
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<i32> {
        let core = InstrumentedCore {
            source: self.clone(),
            index: 0,
        };
        AsyncIterator::boxed(core, cancel)
    }

    fn as_partition(&self) -> Option<&dyn Partition<i32>> {
        self.capable.then_some(self as &dyn Partition<i32>)
    }

    fn as_list_source(&self) -> Option<&dyn ListSource<i32>> {
        self.capable.then_some(self as &dyn ListSource<i32>)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl ListSource<i32> for Instrumented {
    async fn to_vec(&self, _cancel: &CancellationToken) -> error::Result<Vec<i32>> {
        Ok(self.items.to_vec())
    }

    async fn count(
        &self,
        _only_if_cheap: bool,
        _cancel: &CancellationToken,
    ) -> error::Result<CountHint> {
        Ok(CountHint::Known(self.items.len()))
    }
}

#[async_trait]
impl Partition<i32> for Instrumented {
    fn skip(&self, count: usize) -> Sequence<i32> {
        let start = count.min(self.items.len());
        self.window(start, self.items.len())
    }

    fn take(&self, count: usize) -> Sequence<i32> {
        self.window(0, count.min(self.items.len()))
    }

    async fn try_get_element_at(
        &self,
        index: usize,
        _cancel: &CancellationToken,
    ) -> error::Result<Maybe<i32>> {
        Ok(self.items.get(index).copied())
    }

    async fn try_get_first(&self, _cancel: &CancellationToken) -> error::Result<Maybe<i32>> {
        Ok(self.items.first().copied())
    }

    async fn try_get_last(&self, _cancel: &CancellationToken) -> error::Result<Maybe<i32>> {
        Ok(self.items.last().copied())
    }
}
