//! Concatenation, and appending or prepending single elements.

use std::any::Any;
use std::sync::Arc;

use aseq_collections::SingleLinkedNode;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::capability::{CountHint, ListSource};
use crate::enumerator::BoxEnumerator;
use crate::error;
use crate::iterator::{AsyncIterator, IteratorCore, Upstream};
use crate::sequence::{AsyncSequence, Element, Sequence};

/// Every source in turn.
///
/// Concatenating onto a concatenation adds to its source list, so a long
/// `a.concat(b).concat(c)...` chain stays one stage deep.
pub struct Concat<T> {
    sources: Vec<Sequence<T>>,
}

impl<T: Element> Concat<T> {
    pub fn sources(&self) -> &[Sequence<T>] {
        &self.sources
    }
}

struct ConcatCore<T> {
    sources: Vec<Sequence<T>>,
    index: usize,
    upstream: Upstream<T>,
}

#[async_trait]
impl<T: Element> IteratorCore<T> for ConcatCore<T> {
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
                Some(item) => return Ok(Some(item)),
                None => self.upstream.close().await?,
            }
        }
    }

    async fn close(&mut self) -> error::Result<()> {
        self.upstream.close().await
    }
}

impl<T: Element> AsyncSequence<T> for Concat<T> {
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<T> {
        let core = ConcatCore {
            sources: self.sources.clone(),
            index: 0,
            upstream: Upstream::new(),
        };
        AsyncIterator::boxed(core, cancel)
    }

    fn as_list_source(&self) -> Option<&dyn ListSource<T>> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl<T: Element> ListSource<T> for Concat<T> {
    async fn to_vec(&self, cancel: &CancellationToken) -> error::Result<Vec<T>> {
        let mut items = Vec::new();
        for source in &self.sources {
            items.extend(source.to_vec(cancel).await?);
        }
        Ok(items)
    }

    async fn count(
        &self,
        only_if_cheap: bool,
        cancel: &CancellationToken,
    ) -> error::Result<CountHint> {
        let mut total = 0usize;
        for source in &self.sources {
            let count = match source.as_list_source() {
                Some(list) => list.count(only_if_cheap, cancel).await?,
                None if only_if_cheap => CountHint::Unknown,
                None => CountHint::Known(source.count(cancel).await?),
            };
            match count {
                CountHint::Known(count) => total = total.saturating_add(count),
                CountHint::Unknown => return Ok(CountHint::Unknown),
            }
        }
        Ok(CountHint::Known(total))
    }
}

/// `source` with single elements added before and after it.
///
/// The added elements live in shared linked chains: appending to an
/// `AppendPrepend` makes a new stage that shares every node of the old one.
pub struct AppendPrepend<T> {
    source: Sequence<T>,
    prepended: Option<Arc<SingleLinkedNode<T>>>,
    appended: Option<Arc<SingleLinkedNode<T>>>,
}

impl<T: Element> AppendPrepend<T> {
    fn prepended_count(&self) -> usize {
        self.prepended.as_ref().map_or(0, |node| node.count())
    }

    fn appended_count(&self) -> usize {
        self.appended.as_ref().map_or(0, |node| node.count())
    }
}

fn link<T>(chain: Option<&Arc<SingleLinkedNode<T>>>, item: T) -> Arc<SingleLinkedNode<T>> {
    match chain {
        Some(node) => node.add(item),
        None => SingleLinkedNode::new(item),
    }
}

struct AppendPrependCore<T> {
    source: Sequence<T>,
    upstream: Upstream<T>,
    // the newest prepended element comes first, so this is yielded in order
    prefix: std::vec::IntoIter<T>,
    appended: Option<Arc<SingleLinkedNode<T>>>,
    suffix: Option<std::vec::IntoIter<T>>,
}

#[async_trait]
impl<T: Element> IteratorCore<T> for AppendPrependCore<T> {
    async fn open(&mut self, cancel: &CancellationToken) -> error::Result<()> {
        self.upstream.open(&self.source, cancel);
        Ok(())
    }

    async fn next(&mut self, _cancel: &CancellationToken) -> error::Result<Option<T>> {
        if let Some(item) = self.prefix.next() {
            return Ok(Some(item));
        }
        if self.suffix.is_none() {
            if let Some(item) = self.upstream.pull().await? {
                return Ok(Some(item));
            }
            self.upstream.close().await?;
            let suffix = self.appended.as_ref().map_or_else(Vec::new, |node| node.to_vec());
            self.suffix = Some(suffix.into_iter());
        }
        Ok(self.suffix.as_mut().and_then(Iterator::next))
    }

    async fn close(&mut self) -> error::Result<()> {
        self.prefix = Vec::new().into_iter();
        self.suffix = None;
        self.upstream.close().await
    }
}

impl<T: Element> AsyncSequence<T> for AppendPrepend<T> {
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<T> {
        let prefix: Vec<T> = self
            .prepended
            .as_ref()
            .map_or_else(Vec::new, |node| node.iter().cloned().collect());
        let core = AppendPrependCore {
            source: self.source.clone(),
            upstream: Upstream::new(),
            prefix: prefix.into_iter(),
            appended: self.appended.clone(),
            suffix: None,
        };
        AsyncIterator::boxed(core, cancel)
    }

    fn as_list_source(&self) -> Option<&dyn ListSource<T>> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl<T: Element> ListSource<T> for AppendPrepend<T> {
    async fn to_vec(&self, cancel: &CancellationToken) -> error::Result<Vec<T>> {
        let middle = self.source.to_vec(cancel).await?;
        let mut items =
            Vec::with_capacity(self.prepended_count() + middle.len() + self.appended_count());
        if let Some(prepended) = &self.prepended {
            items.extend(prepended.iter().cloned());
        }
        items.extend(middle);
        if let Some(appended) = &self.appended {
            appended.fill_reversed(&mut items);
        }
        Ok(items)
    }

    async fn count(
        &self,
        only_if_cheap: bool,
        cancel: &CancellationToken,
    ) -> error::Result<CountHint> {
        let middle = match self.source.as_list_source() {
            Some(list) => list.count(only_if_cheap, cancel).await?,
            None if only_if_cheap => CountHint::Unknown,
            None => CountHint::Known(self.source.count(cancel).await?),
        };
        let added = self.prepended_count() + self.appended_count();
        Ok(middle.map(|count| count.saturating_add(added)))
    }
}

impl<T: Element> Sequence<T> {
    /// The elements of `self`, then those of `other`.
    pub fn concat(&self, other: &Sequence<T>) -> Sequence<T> {
        let mut sources = match self.downcast_ref::<Concat<T>>() {
            Some(concat) => concat.sources.clone(),
            None => vec![self.clone()],
        };
        match other.downcast_ref::<Concat<T>>() {
            Some(concat) => sources.extend(concat.sources.iter().cloned()),
            None => sources.push(other.clone()),
        }
        Sequence::new(Concat { sources })
    }

    /// The elements of `self`, then `item`.
    pub fn append(&self, item: T) -> Sequence<T> {
        match self.downcast_ref::<AppendPrepend<T>>() {
            Some(stage) => Sequence::new(AppendPrepend {
                source: stage.source.clone(),
                prepended: stage.prepended.clone(),
                appended: Some(link(stage.appended.as_ref(), item)),
            }),
            None => Sequence::new(AppendPrepend {
                source: self.clone(),
                prepended: None,
                appended: Some(SingleLinkedNode::new(item)),
            }),
        }
    }

    /// `item`, then the elements of `self`.
    pub fn prepend(&self, item: T) -> Sequence<T> {
        match self.downcast_ref::<AppendPrepend<T>>() {
            Some(stage) => Sequence::new(AppendPrepend {
                source: stage.source.clone(),
                prepended: Some(link(stage.prepended.as_ref(), item)),
                appended: stage.appended.clone(),
            }),
            None => Sequence::new(AppendPrepend {
                source: self.clone(),
                prepended: Some(SingleLinkedNode::new(item)),
                appended: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_concat_flattens() {
        let cancel = CancellationToken::new();
        let a = Sequence::from_vec(vec![1, 2]);
        let b = Sequence::from_iterable(vec![3]);
        let c = Sequence::range(4, 2).unwrap().map(|x| x as i32);
        let joined = a.concat(&b).concat(&a.concat(&c));
        assert_eq!(joined.downcast_ref::<Concat<i32>>().unwrap().sources().len(), 4);
        assert_eq!(joined.to_vec(&cancel).await.unwrap(), vec![1, 2, 3, 1, 2, 4, 5]);
    }

    #[tokio::test]
    async fn test_concat_count() {
        let cancel = CancellationToken::new();
        let cheap = Sequence::from_vec(vec![1, 2]).concat(&Sequence::repeat(0, 3));
        let list = cheap.as_list_source().unwrap();
        assert_eq!(list.count(true, &cancel).await.unwrap(), CountHint::Known(5));

        let mixed = cheap.concat(&Sequence::from_iterable(vec![7]));
        let list = mixed.as_list_source().unwrap();
        assert_eq!(list.count(true, &cancel).await.unwrap(), CountHint::Unknown);
        assert_eq!(list.count(false, &cancel).await.unwrap(), CountHint::Known(6));
    }

    #[tokio::test]
    async fn test_append_prepend_order() {
        let cancel = CancellationToken::new();
        let source = Sequence::from_iterable(vec![3, 4]);
        let extended = source.append(5).prepend(2).append(6).prepend(1);
        let stage = extended.downcast_ref::<AppendPrepend<i32>>().unwrap();
        assert!(stage.source.downcast_ref::<AppendPrepend<i32>>().is_none());
        assert_eq!(extended.to_vec(&cancel).await.unwrap(), vec![1, 2, 3, 4, 5, 6]);
        let list = extended.as_list_source().unwrap();
        assert_eq!(list.to_vec(&cancel).await.unwrap(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(list.count(false, &cancel).await.unwrap(), CountHint::Known(6));
    }

    #[tokio::test]
    async fn test_extending_shares_but_does_not_alter() {
        let cancel = CancellationToken::new();
        let base = Sequence::from_vec(vec![0]).append(1);
        let left = base.append(2);
        let right = base.append(3);
        assert_eq!(base.to_vec(&cancel).await.unwrap(), vec![0, 1]);
        assert_eq!(left.to_vec(&cancel).await.unwrap(), vec![0, 1, 2]);
        assert_eq!(right.to_vec(&cancel).await.unwrap(), vec![0, 1, 3]);
    }
}
