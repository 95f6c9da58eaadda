//! Bridging push based sources and pull based sequences.
//!
//! [`Sequence::from_observable`] subscribes once per traversal and buffers
//! what the source pushes until it is pulled. [`Sequence::to_observable`]
//! goes the other way: every subscription spawns a task that pulls the
//! sequence and pushes each element to the observer.

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::enumerator::{pull, BoxEnumerator};
use crate::error::{self, Error};
use crate::iterator::{AsyncIterator, IteratorCore};
use crate::sequence::{AsyncSequence, Element, Sequence};

/// Receives pushed notifications.
///
/// After `on_error` or `on_completed` no further notifications are expected.
pub trait Observer<T>: Send + Sync {
    fn on_next(&self, item: T);

    fn on_error(&self, error: anyhow::Error);

    fn on_completed(&self);
}

/// A push based source.
pub trait Observable<T>: Send + Sync + 'static {
    fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Subscription;
}

/// A live subscription. Unsubscribes when dropped.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// A subscription with nothing to release.
    pub fn empty() -> Self {
        Self { unsubscribe: None }
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BridgeState {
    Active,
    Disposed,
}

struct Shared<T> {
    queue: VecDeque<T>,
    error: Option<anyhow::Error>,
    completed: bool,
    state: BridgeState,
}

/// The observer handed to the push source. Everything it touches is behind
/// one lock; `notify` wakes a pull waiting for the next notification.
struct Bridge<T> {
    shared: Mutex<Shared<T>>,
    notify: Notify,
}

impl<T> Bridge<T> {
    fn new() -> Self {
        Self {
            shared: Mutex::new(Shared {
                queue: VecDeque::new(),
                error: None,
                completed: false,
                state: BridgeState::Active,
            }),
            notify: Notify::new(),
        }
    }

    fn is_accepting(shared: &Shared<T>) -> bool {
        shared.state == BridgeState::Active && !shared.completed && shared.error.is_none()
    }
}

impl<T: Element> Observer<T> for Bridge<T> {
    fn on_next(&self, item: T) {
        {
            let mut shared = self.shared.lock();
            if !Self::is_accepting(&shared) {
                return;
            }
            shared.queue.push_back(item);
        }
        self.notify.notify_one();
    }

    fn on_error(&self, error: anyhow::Error) {
        {
            let mut shared = self.shared.lock();
            if !Self::is_accepting(&shared) {
                return;
            }
            shared.error = Some(error);
        }
        self.notify.notify_one();
    }

    fn on_completed(&self) {
        {
            let mut shared = self.shared.lock();
            if !Self::is_accepting(&shared) {
                return;
            }
            shared.completed = true;
        }
        self.notify.notify_one();
    }
}

/// A sequence over a push source.
pub struct ObservableSource<T> {
    observable: Arc<dyn Observable<T>>,
}

struct ObservableCore<T> {
    observable: Arc<dyn Observable<T>>,
    bridge: Arc<Bridge<T>>,
    subscription: Option<Subscription>,
}

#[async_trait]
impl<T: Element> IteratorCore<T> for ObservableCore<T> {
    async fn open(&mut self, _cancel: &CancellationToken) -> error::Result<()> {
        debug!("subscribing to push source");
        let observer: Arc<dyn Observer<T>> = self.bridge.clone();
        self.subscription = Some(self.observable.subscribe(observer));
        Ok(())
    }

    async fn next(&mut self, _cancel: &CancellationToken) -> error::Result<Option<T>> {
        loop {
            let notified = self.bridge.notify.notified();
            {
                let mut shared = self.bridge.shared.lock();
                // elements pushed before a failure are still delivered
                if let Some(item) = shared.queue.pop_front() {
                    return Ok(Some(item));
                }
                if let Some(error) = shared.error.take() {
                    return Err(Error::from_source(error));
                }
                if shared.completed {
                    return Ok(None);
                }
            }
            notified.await;
        }
    }

    async fn close(&mut self) -> error::Result<()> {
        {
            let mut shared = self.bridge.shared.lock();
            shared.state = BridgeState::Disposed;
            shared.queue.clear();
        }
        if let Some(subscription) = self.subscription.take() {
            debug!("unsubscribing from push source");
            subscription.unsubscribe();
        }
        Ok(())
    }
}

impl<T: Element> AsyncSequence<T> for ObservableSource<T> {
    fn enumerator(&self, cancel: CancellationToken) -> BoxEnumerator<T> {
        let core = ObservableCore {
            observable: self.observable.clone(),
            bridge: Arc::new(Bridge::new()),
            subscription: None,
        };
        AsyncIterator::boxed(core, cancel)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A push source over a sequence.
pub struct SequenceObservable<T> {
    source: Sequence<T>,
}

impl<T: Element> Observable<T> for SequenceObservable<T> {
    /// Spawns the pull loop on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Subscription {
        let cancel = CancellationToken::new();
        let enumerator = self.source.enumerator(cancel.clone());
        tokio::spawn(push_all(enumerator, observer, cancel.clone()));
        Subscription::new(move || cancel.cancel())
    }
}

async fn push_all<T: Element>(
    mut enumerator: BoxEnumerator<T>,
    observer: Arc<dyn Observer<T>>,
    cancel: CancellationToken,
) {
    loop {
        match pull(&mut enumerator).await {
            Ok(Some(item)) => observer.on_next(item),
            Ok(None) => {
                observer.on_completed();
                break;
            }
            // unsubscribed: the observer no longer listens
            Err(error) if error.is_cancelled() && cancel.is_cancelled() => break,
            Err(error) => {
                observer.on_error(anyhow::Error::new(error));
                break;
            }
        }
    }
    if let Err(error) = enumerator.dispose().await {
        warn!(%error, "failed to release a pushed sequence");
    }
    debug!("push loop finished");
}

impl<T: Element> Sequence<T> {
    /// A sequence over a push source. Each traversal subscribes at its first
    /// pull and unsubscribes when it is disposed.
    pub fn from_observable(observable: impl Observable<T>) -> Sequence<T> {
        Sequence::new(ObservableSource {
            observable: Arc::new(observable),
        })
    }

    /// This sequence as a push source.
    pub fn to_observable(&self) -> SequenceObservable<T> {
        SequenceObservable {
            source: self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;

    /// Pushes its items from a spawned task, then completes or fails.
    struct Scripted {
        items: Vec<i32>,
        fail: bool,
        subscribed: Arc<AtomicUsize>,
        unsubscribed: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(items: Vec<i32>, fail: bool) -> Self {
            Self {
                items,
                fail,
                subscribed: Arc::new(AtomicUsize::new(0)),
                unsubscribed: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Observable<i32> for Scripted {
        fn subscribe(&self, observer: Arc<dyn Observer<i32>>) -> Subscription {
            self.subscribed.fetch_add(1, Ordering::SeqCst);
            let items = self.items.clone();
            let fail = self.fail;
            tokio::spawn(async move {
                for item in items {
                    tokio::task::yield_now().await;
                    observer.on_next(item);
                }
                if fail {
                    observer.on_error(anyhow::anyhow!("push source failed"));
                } else {
                    observer.on_completed();
                }
            });
            let unsubscribed = self.unsubscribed.clone();
            Subscription::new(move || {
                unsubscribed.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    /// Records what it is told on a channel.
    struct Recorder {
        sender: mpsc::UnboundedSender<String>,
    }

    impl Observer<i32> for Recorder {
        fn on_next(&self, item: i32) {
            let _ = self.sender.send(format!("next {item}"));
        }

        fn on_error(&self, error: anyhow::Error) {
            let _ = self.sender.send(format!("error {error}"));
        }

        fn on_completed(&self) {
            let _ = self.sender.send("completed".to_string());
        }
    }

    #[tokio::test]
    async fn test_from_observable() {
        let cancel = CancellationToken::new();
        let source = Scripted::new(vec![1, 2, 3], false);
        let subscribed = source.subscribed.clone();
        let unsubscribed = source.unsubscribed.clone();
        let sequence = Sequence::from_observable(source);
        assert_eq!(subscribed.load(Ordering::SeqCst), 0);
        assert_eq!(sequence.to_vec(&cancel).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(sequence.to_vec(&cancel).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(subscribed.load(Ordering::SeqCst), 2);
        assert_eq!(unsubscribed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_from_observable_error_after_items() {
        let cancel = CancellationToken::new();
        let sequence = Sequence::from_observable(Scripted::new(vec![1], true));
        let mut enumerator = sequence.enumerator(cancel);
        assert!(enumerator.move_next().await.unwrap());
        let error = enumerator.move_next().await.unwrap_err();
        assert!(matches!(error, Error::Source(_)));
    }

    #[tokio::test]
    async fn test_early_dispose_unsubscribes() {
        let cancel = CancellationToken::new();
        let source = Scripted::new(vec![1, 2, 3], false);
        let unsubscribed = source.unsubscribed.clone();
        let sequence = Sequence::from_observable(source);
        assert_eq!(sequence.first(&cancel).await.unwrap(), 1);
        assert_eq!(unsubscribed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_push() {
        struct Silent;

        impl Observable<i32> for Silent {
            fn subscribe(&self, _observer: Arc<dyn Observer<i32>>) -> Subscription {
                Subscription::empty()
            }
        }

        let cancel = CancellationToken::new();
        let sequence = Sequence::from_observable(Silent);
        let mut enumerator = sequence.enumerator(cancel.clone());
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });
        assert!(enumerator.move_next().await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_to_observable_pushes_then_completes() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let observable = Sequence::from_vec(vec![1, 2]).to_observable();
        let subscription = observable.subscribe(Arc::new(Recorder { sender }));
        let mut received = Vec::new();
        while let Some(event) = receiver.recv().await {
            received.push(event);
        }
        drop(subscription);
        insta::assert_debug_snapshot!(received, @r###"
        [
            "next 1",
            "next 2",
            "completed",
        ]
        "###);
    }

    #[tokio::test]
    async fn test_to_observable_reports_failure() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let failing = Sequence::from_vec(vec![1, 2]).try_map(|x| {
            if x == 2 {
                anyhow::bail!("two");
            }
            Ok(x)
        });
        let _subscription = failing.to_observable().subscribe(Arc::new(Recorder { sender }));
        assert_eq!(receiver.recv().await.unwrap(), "next 1");
        assert_eq!(receiver.recv().await.unwrap(), "error callback failed: two");
        assert_eq!(receiver.recv().await, None);
    }

    #[tokio::test]
    async fn test_round_trip() {
        let cancel = CancellationToken::new();
        let sequence = Sequence::range(0, 50).unwrap();
        let round_tripped = Sequence::from_observable(sequence.to_observable());
        assert_eq!(
            round_tripped.to_vec(&cancel).await.unwrap(),
            sequence.to_vec(&cancel).await.unwrap()
        );
    }
}
