//! Operations that run a traversal to produce a value.
//!
//! Each one first asks the sequence for a capability that answers it
//! directly and only pulls when there is none. Capability calls are raced
//! against the cancellation token just like pulls are. Every path ends with
//! the traversal's enumerator disposed.

use std::hash::Hash;

use aseq_collections::{DefaultComparer, EqualityComparer, Maybe, Set};
use tokio_util::sync::CancellationToken;

use crate::capability::CountHint;
use crate::enumerator::{finish, pull, BoxEnumerator};
use crate::error::{self, Error};
use crate::iterator::{ensure_not_cancelled, race};
use crate::sequence::{Element, Sequence};

impl<T: Element> Sequence<T> {
    /// The number of elements.
    pub async fn count(&self, cancel: &CancellationToken) -> error::Result<usize> {
        ensure_not_cancelled(cancel)?;
        if let Some(list) = self.as_list_source() {
            if let CountHint::Known(count) = race(cancel, list.count(false, cancel)).await?? {
                return Ok(count);
            }
        }
        let mut enumerator = self.enumerator(cancel.clone());
        let mut count = 0;
        while pull(&mut enumerator).await?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    /// All elements, in order.
    pub async fn to_vec(&self, cancel: &CancellationToken) -> error::Result<Vec<T>> {
        ensure_not_cancelled(cancel)?;
        if let Some(list) = self.as_list_source() {
            return race(cancel, list.to_vec(cancel)).await?;
        }
        let mut enumerator = self.enumerator(cancel.clone());
        let mut items = Vec::new();
        while let Some(item) = pull(&mut enumerator).await? {
            items.push(item);
        }
        Ok(items)
    }

    /// The distinct elements, in order of first occurrence.
    pub async fn to_set(&self, cancel: &CancellationToken) -> error::Result<Set<T>>
    where
        T: Eq + Hash,
    {
        self.to_set_by(DefaultComparer::new(), cancel).await
    }

    pub async fn to_set_by<C>(
        &self,
        comparer: C,
        cancel: &CancellationToken,
    ) -> error::Result<Set<T, C>>
    where
        C: EqualityComparer<T>,
    {
        let mut set = Set::with_comparer(comparer);
        set.extend(self.to_vec(cancel).await?);
        Ok(set)
    }

    /// The element at `index`; [`Error::NoElements`] if there are not enough.
    pub async fn element_at(&self, index: usize, cancel: &CancellationToken) -> error::Result<T> {
        self.element_at_or_none(index, cancel)
            .await?
            .ok_or(Error::NoElements)
    }

    pub async fn element_at_or_none(
        &self,
        index: usize,
        cancel: &CancellationToken,
    ) -> error::Result<Maybe<T>> {
        ensure_not_cancelled(cancel)?;
        if let Some(partition) = self.as_partition() {
            return race(cancel, partition.try_get_element_at(index, cancel)).await?;
        }
        let mut enumerator = self.enumerator(cancel.clone());
        let result = nth(&mut enumerator, index).await;
        finish(&mut enumerator, result).await
    }

    pub async fn first(&self, cancel: &CancellationToken) -> error::Result<T> {
        self.first_or_none(cancel).await?.ok_or(Error::NoElements)
    }

    pub async fn first_or_none(&self, cancel: &CancellationToken) -> error::Result<Maybe<T>> {
        ensure_not_cancelled(cancel)?;
        if let Some(partition) = self.as_partition() {
            return race(cancel, partition.try_get_first(cancel)).await?;
        }
        let mut enumerator = self.enumerator(cancel.clone());
        let result = pull(&mut enumerator).await;
        finish(&mut enumerator, result).await
    }

    pub async fn last(&self, cancel: &CancellationToken) -> error::Result<T> {
        self.last_or_none(cancel).await?.ok_or(Error::NoElements)
    }

    pub async fn last_or_none(&self, cancel: &CancellationToken) -> error::Result<Maybe<T>> {
        ensure_not_cancelled(cancel)?;
        if let Some(partition) = self.as_partition() {
            return race(cancel, partition.try_get_last(cancel)).await?;
        }
        let mut enumerator = self.enumerator(cancel.clone());
        let mut last = None;
        while let Some(item) = pull(&mut enumerator).await? {
            last = Some(item);
        }
        Ok(last)
    }

    /// The only element. Fails with [`Error::NoElements`] on an empty
    /// sequence and [`Error::MoreThanOneElement`] as soon as a second element
    /// shows up.
    pub async fn single(&self, cancel: &CancellationToken) -> error::Result<T> {
        let mut enumerator = self.enumerator(cancel.clone());
        let result = single(&mut enumerator).await;
        finish(&mut enumerator, result).await
    }

    /// Whether there is at least one element.
    pub async fn any(&self, cancel: &CancellationToken) -> error::Result<bool> {
        ensure_not_cancelled(cancel)?;
        if let Some(list) = self.as_list_source() {
            if let CountHint::Known(count) = race(cancel, list.count(true, cancel)).await?? {
                return Ok(count > 0);
            }
        }
        let mut enumerator = self.enumerator(cancel.clone());
        let result = pull(&mut enumerator).await.map(|item| item.is_some());
        finish(&mut enumerator, result).await
    }

    /// Whether some element equals `value`. Stops at the first match.
    pub async fn contains(&self, value: &T, cancel: &CancellationToken) -> error::Result<bool>
    where
        T: PartialEq,
    {
        let mut enumerator = self.enumerator(cancel.clone());
        let result = find(&mut enumerator, |item| item == value).await;
        finish(&mut enumerator, result.map(|found| found.is_some())).await
    }

    /// Run `action` on every element, in order.
    pub async fn for_each(
        &self,
        mut action: impl FnMut(T) + Send,
        cancel: &CancellationToken,
    ) -> error::Result<()> {
        let mut enumerator = self.enumerator(cancel.clone());
        while let Some(item) = pull(&mut enumerator).await? {
            action(item);
        }
        Ok(())
    }
}

async fn nth<T: Clone>(enumerator: &mut BoxEnumerator<T>, index: usize) -> error::Result<Maybe<T>> {
    let mut position = 0;
    while let Some(item) = pull(enumerator).await? {
        if position == index {
            return Ok(Some(item));
        }
        position += 1;
    }
    Ok(None)
}

async fn find<T: Clone>(
    enumerator: &mut BoxEnumerator<T>,
    mut matches: impl FnMut(&T) -> bool + Send,
) -> error::Result<Maybe<T>> {
    while let Some(item) = pull(enumerator).await? {
        if matches(&item) {
            return Ok(Some(item));
        }
    }
    Ok(None)
}

async fn single<T: Clone>(enumerator: &mut BoxEnumerator<T>) -> error::Result<T> {
    let Some(item) = pull(enumerator).await? else {
        return Err(Error::NoElements);
    };
    if pull(enumerator).await?.is_some() {
        return Err(Error::MoreThanOneElement);
    }
    Ok(item)
}
