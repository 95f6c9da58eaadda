//! User supplied predicates and selectors.
//!
//! A callback may be a plain function, a function returning a future, or a
//! function returning a future that also wants the traversal's cancellation
//! token. Operators never care which: they call `invoke` and await it, which
//! is the single suspension point for applying a user function.

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;

use crate::error::{self, Error};
use crate::sequence::Element;

type SyncSelect<T, U> = dyn Fn(T) -> anyhow::Result<U> + Send + Sync;
type AsyncSelect<T, U> = dyn Fn(T) -> BoxFuture<'static, anyhow::Result<U>> + Send + Sync;
type CancellableSelect<T, U> =
    dyn Fn(T, CancellationToken) -> BoxFuture<'static, anyhow::Result<U>> + Send + Sync;

/// A transform from `T` to `U`.
pub enum Selector<T, U> {
    Sync(Arc<SyncSelect<T, U>>),
    Async(Arc<AsyncSelect<T, U>>),
    AsyncWithCancellation(Arc<CancellableSelect<T, U>>),
}

impl<T, U> Clone for Selector<T, U> {
    fn clone(&self) -> Self {
        match self {
            Selector::Sync(f) => Selector::Sync(f.clone()),
            Selector::Async(f) => Selector::Async(f.clone()),
            Selector::AsyncWithCancellation(f) => Selector::AsyncWithCancellation(f.clone()),
        }
    }
}

impl<T: Element, U: Element> Selector<T, U> {
    pub fn new(f: impl Fn(T) -> U + Send + Sync + 'static) -> Self {
        Selector::Sync(Arc::new(move |item: T| -> anyhow::Result<U> { Ok(f(item)) }))
    }

    pub fn fallible(f: impl Fn(T) -> anyhow::Result<U> + Send + Sync + 'static) -> Self {
        Selector::Sync(Arc::new(f))
    }

    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<U>> + Send + 'static,
    {
        Selector::Async(Arc::new(move |item| f(item).boxed()))
    }

    pub fn cancellable<F, Fut>(f: F) -> Self
    where
        F: Fn(T, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<U>> + Send + 'static,
    {
        Selector::AsyncWithCancellation(Arc::new(move |item, cancel| f(item, cancel).boxed()))
    }

    pub async fn invoke(&self, item: T, cancel: &CancellationToken) -> error::Result<U> {
        let result = match self {
            Selector::Sync(f) => f(item),
            Selector::Async(f) => f(item).await,
            Selector::AsyncWithCancellation(f) => f(item, cancel.clone()).await,
        };
        result.map_err(Error::from_callback)
    }

    /// A selector applying `self` and then `next`.
    ///
    /// An error from `self` is reported without running `next`.
    pub fn then<V: Element>(self, next: Selector<U, V>) -> Selector<T, V> {
        match (self, next) {
            (Selector::Sync(first), Selector::Sync(second)) => {
                Selector::Sync(Arc::new(move |item: T| -> anyhow::Result<V> {
                    second(first(item)?)
                }))
            }
            (first, second) => {
                let composed = move |item: T, cancel: CancellationToken| {
                    let first = first.clone();
                    let second = second.clone();
                    async move {
                        let intermediate = first.invoke(item, &cancel).await?;
                        Ok::<V, anyhow::Error>(second.invoke(intermediate, &cancel).await?)
                    }
                    .boxed()
                };
                Selector::AsyncWithCancellation(Arc::new(composed))
            }
        }
    }
}

type SyncTest<T> = dyn Fn(&T) -> anyhow::Result<bool> + Send + Sync;
type AsyncTest<T> = dyn Fn(T) -> BoxFuture<'static, anyhow::Result<bool>> + Send + Sync;
type CancellableTest<T> =
    dyn Fn(T, CancellationToken) -> BoxFuture<'static, anyhow::Result<bool>> + Send + Sync;

/// A filter condition over `T`.
pub enum Predicate<T> {
    Sync(Arc<SyncTest<T>>),
    Async(Arc<AsyncTest<T>>),
    AsyncWithCancellation(Arc<CancellableTest<T>>),
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        match self {
            Predicate::Sync(f) => Predicate::Sync(f.clone()),
            Predicate::Async(f) => Predicate::Async(f.clone()),
            Predicate::AsyncWithCancellation(f) => Predicate::AsyncWithCancellation(f.clone()),
        }
    }
}

impl<T: Element> Predicate<T> {
    pub fn new(f: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Predicate::Sync(Arc::new(move |item: &T| -> anyhow::Result<bool> { Ok(f(item)) }))
    }

    pub fn fallible(f: impl Fn(&T) -> anyhow::Result<bool> + Send + Sync + 'static) -> Self {
        Predicate::Sync(Arc::new(f))
    }

    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        Predicate::Async(Arc::new(move |item| f(item).boxed()))
    }

    pub fn cancellable<F, Fut>(f: F) -> Self
    where
        F: Fn(T, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        Predicate::AsyncWithCancellation(Arc::new(move |item, cancel| f(item, cancel).boxed()))
    }

    pub async fn invoke(&self, item: &T, cancel: &CancellationToken) -> error::Result<bool> {
        let result = match self {
            Predicate::Sync(f) => f(item),
            Predicate::Async(f) => f(item.clone()).await,
            Predicate::AsyncWithCancellation(f) => f(item.clone(), cancel.clone()).await,
        };
        result.map_err(Error::from_callback)
    }
}
