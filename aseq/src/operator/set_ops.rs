//! Except, intersect and union, all deduplicating through a [`Set`].

use std::any::Any;
use std::hash::Hash;
use std::sync::Arc;

use aseq_collections::{DefaultComparer, EqualityComparer, Set};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::enumerator::{release_all, BoxEnumerator};
use crate::error;
use crate::iterator::{AsyncIterator, IteratorCore, Upstream};
use crate::sequence::{AsyncSequence, Element, Sequence};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetOp {
    Except,
    Intersect,
}

/// Elements of `first` that are (intersect) or are not (except) in `second`,
/// each yielded at most once.
///
/// `second` is drained into a set at the first pull; `first` is only opened
/// after that.
pub struct SetFilter<T, C> {
    first: Sequence<T>,
    second: Sequence<T>,
    comparer: Arc<C>,
    op: SetOp,
}

struct SetFilterCore<T, C> {
    first: Sequence<T>,
    second: Sequence<T>,
    first_upstream: Upstream<T>,
    second_upstream: Upstream<T>,
    set: Set<T, Arc<C>>,
    op: SetOp,
}

#[async_trait]
impl<T, C> IteratorCore<T> for SetFilterCore<T, C>
where
    T: Element,
    C: EqualityComparer<T> + 'static,
{
    async fn open(&mut self, cancel: &CancellationToken) -> error::Result<()> {
        self.second_upstream.open(&self.second, cancel);
        while let Some(item) = self.second_upstream.pull().await? {
            self.set.add(item);
        }
        self.second_upstream.close().await?;
        self.first_upstream.open(&self.first, cancel);
        Ok(())
    }

    async fn next(&mut self, _cancel: &CancellationToken) -> error::Result<Option<T>> {
        while let Some(item) = self.first_upstream.pull().await? {
            let keep = match self.op {
                // marks the key as seen, so later duplicates are dropped too
                SetOp::Except => self.set.add(item.clone()),
                // a matched key leaves the set, so it cannot match twice
                SetOp::Intersect => self.set.remove(&item),
            };
            if keep {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> error::Result<()> {
        self.set.clear();
        let first = self.first_upstream.close().await;
        let second = self.second_upstream.close().await;
        release_all([first, second])
    }
}

impl<T, C> AsyncSequence<T> for SetFilter<T, C>
where
    T: Element,
    C: EqualityComparer<T> + 'static,
{
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<T> {
        let core = SetFilterCore {
            first: self.first.clone(),
            second: self.second.clone(),
            first_upstream: Upstream::new(),
            second_upstream: Upstream::new(),
            set: Set::with_comparer(self.comparer.clone()),
            op: self.op,
        };
        AsyncIterator::boxed(core, cancel)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Elements of every source in turn, each distinct element once.
pub struct Union<T, C> {
    sources: Vec<Sequence<T>>,
    comparer: Arc<C>,
}

struct UnionCore<T, C> {
    sources: Vec<Sequence<T>>,
    index: usize,
    upstream: Upstream<T>,
    seen: Set<T, Arc<C>>,
}

#[async_trait]
impl<T, C> IteratorCore<T> for UnionCore<T, C>
where
    T: Element,
    C: EqualityComparer<T> + 'static,
{
    async fn next(&mut self, cancel: &CancellationToken) -> error::Result<Option<T>> {
        loop {
            if !self.upstream.is_open() {
                let Some(source) = self.sources.get(self.index) else {
                    return Ok(None);
                };
                self.upstream.open(source, cancel);
                self.index += 1;
            }
            match self.upstream.pull().await? {
                Some(item) => {
                    if self.seen.add(item.clone()) {
                        return Ok(Some(item));
                    }
                }
                None => self.upstream.close().await?,
            }
        }
    }

    async fn close(&mut self) -> error::Result<()> {
        self.seen.clear();
        self.upstream.close().await
    }
}

impl<T, C> AsyncSequence<T> for Union<T, C>
where
    T: Element,
    C: EqualityComparer<T> + 'static,
{
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<T> {
        let core = UnionCore {
            sources: self.sources.clone(),
            index: 0,
            upstream: Upstream::new(),
            seen: Set::with_comparer(self.comparer.clone()),
        };
        AsyncIterator::boxed(core, cancel)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Element> Sequence<T> {
    /// Distinct elements of `self` that do not occur in `other`.
    pub fn except(&self, other: &Sequence<T>) -> Sequence<T>
    where
        T: Eq + Hash,
    {
        self.except_by(other, DefaultComparer::new())
    }

    pub fn except_by<C>(&self, other: &Sequence<T>, comparer: C) -> Sequence<T>
    where
        C: EqualityComparer<T> + 'static,
    {
        self.filtered(other, comparer, SetOp::Except)
    }

    /// Distinct elements of `self` that also occur in `other`.
    pub fn intersect(&self, other: &Sequence<T>) -> Sequence<T>
    where
        T: Eq + Hash,
    {
        self.intersect_by(other, DefaultComparer::new())
    }

    pub fn intersect_by<C>(&self, other: &Sequence<T>, comparer: C) -> Sequence<T>
    where
        C: EqualityComparer<T> + 'static,
    {
        self.filtered(other, comparer, SetOp::Intersect)
    }

    /// Distinct elements of `self`, then those of `other` not seen yet.
    pub fn union(&self, other: &Sequence<T>) -> Sequence<T>
    where
        T: Eq + Hash,
    {
        self.union_by(other, DefaultComparer::new())
    }

    pub fn union_by<C>(&self, other: &Sequence<T>, comparer: C) -> Sequence<T>
    where
        C: EqualityComparer<T> + 'static,
    {
        Sequence::new(Union {
            sources: vec![self.clone(), other.clone()],
            comparer: Arc::new(comparer),
        })
    }

    fn filtered<C>(&self, other: &Sequence<T>, comparer: C, op: SetOp) -> Sequence<T>
    where
        C: EqualityComparer<T> + 'static,
    {
        Sequence::new(SetFilter {
            first: self.clone(),
            second: other.clone(),
            comparer: Arc::new(comparer),
            op,
        })
    }
}
