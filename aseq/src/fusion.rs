//! Folding adjacent filter and map stages into one stage.
//!
//! Appending a `filter` to a sequence that already is a filter stage extends
//! that stage's predicate list instead of wrapping it; a `map` on a filter
//! stage becomes a single filter-map stage; a `map` on a type preserving map
//! stage composes the selectors. The fused stage evaluates callbacks in the
//! same order, with the same short-circuiting, as the wrapped chain would.

use tokio_util::sync::CancellationToken;

use crate::callback::{Predicate, Selector};
use crate::error;
use crate::operator::filter::{Filter, FilterMap};
use crate::operator::map::Map;
use crate::sequence::{Element, Sequence};

/// An ordered list of filter stages.
pub struct Predicates<T> {
    stages: Vec<Predicate<T>>,
}

impl<T> Clone for Predicates<T> {
    fn clone(&self) -> Self {
        Self {
            stages: self.stages.clone(),
        }
    }
}

impl<T: Element> Predicates<T> {
    pub fn new(first: Predicate<T>) -> Self {
        Self {
            stages: vec![first],
        }
    }

    /// A new list with `next` evaluated after every existing stage.
    pub fn and(&self, next: Predicate<T>) -> Self {
        let mut stages = Vec::with_capacity(self.stages.len() + 1);
        stages.extend(self.stages.iter().cloned());
        stages.push(next);
        Self { stages }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Whether every stage accepts `item`. Stops at the first stage that
    /// rejects or fails.
    pub async fn matches(&self, item: &T, cancel: &CancellationToken) -> error::Result<bool> {
        for stage in &self.stages {
            if !stage.invoke(item, cancel).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

pub(crate) fn fuse_filter<T: Element>(
    source: &Sequence<T>,
    predicate: Predicate<T>,
) -> Sequence<T> {
    if let Some(filter) = source.downcast_ref::<Filter<T>>() {
        return Sequence::new(filter.and(predicate));
    }
    Sequence::new(Filter::new(source.clone(), Predicates::new(predicate)))
}

pub(crate) fn fuse_map<T: Element, U: Element>(
    source: &Sequence<T>,
    selector: Selector<T, U>,
) -> Sequence<U> {
    if let Some(filter) = source.downcast_ref::<Filter<T>>() {
        return Sequence::new(filter.then_map(selector));
    }
    // only stages whose input type is `T` can be recognised here: the input
    // type of an arbitrary map stage is erased behind `Sequence<T>`
    if let Some(map) = source.downcast_ref::<Map<T, T>>() {
        return Sequence::new(map.then(selector));
    }
    if let Some(filter_map) = source.downcast_ref::<FilterMap<T, T>>() {
        return Sequence::new(filter_map.then(selector));
    }
    Sequence::new(Map::new(source.clone(), selector))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[tokio::test]
    async fn test_matches_short_circuits_in_order() {
        let cancel = CancellationToken::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = |name: &'static str, accept: bool| {
            let seen = seen.clone();
            Predicate::new(move |_: &i32| {
                seen.lock().push(name);
                accept
            })
        };
        let predicates = Predicates::new(record("a", true))
            .and(record("b", false))
            .and(record("c", true));
        assert_eq!(predicates.len(), 3);
        assert!(!predicates.matches(&1, &cancel).await.unwrap());
        assert_eq!(*seen.lock(), vec!["a", "b"]);
    }

    #[test]
    fn test_filter_on_filter_extends_stage_list() {
        let source = Sequence::from_vec(vec![1, 2, 3]);
        let once = fuse_filter(&source, Predicate::new(|x: &i32| *x > 1));
        let fused = fuse_filter(&once, Predicate::new(|x: &i32| *x < 3));
        let filter = fused.downcast_ref::<Filter<i32>>().unwrap();
        assert_eq!(filter.predicates().len(), 2);
    }

    #[test]
    fn test_map_on_filter_becomes_filter_map() {
        let source = Sequence::from_vec(vec![1, 2, 3]);
        let filtered = fuse_filter(&source, Predicate::new(|x: &i32| *x > 1));
        let mapped = fuse_map(&filtered, Selector::new(|x: i32| x.to_string()));
        assert!(mapped.downcast_ref::<FilterMap<i32, String>>().is_some());
    }

    #[test]
    fn test_map_on_map_composes() {
        let source = Sequence::from_vec(vec![1, 2, 3]);
        let once = fuse_map(&source, Selector::new(|x: i32| x + 1));
        let twice = fuse_map(&once, Selector::new(|x: i32| x * 2));
        let map = twice.downcast_ref::<Map<i32, i32>>().unwrap();
        assert!(map.source().downcast_ref::<Map<i32, i32>>().is_none());
    }
}
