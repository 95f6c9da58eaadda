//! The enumerator skeleton shared by every operator.
//!
//! An operator only describes how to set itself up ([`IteratorCore::open`]),
//! how to compute its next element ([`IteratorCore::next`]) and how to let go
//! of what it holds ([`IteratorCore::close`]). [`AsyncIterator`] wraps such a
//! core and owns the state transitions, the cancellation race and the
//! dispose-on-every-exit discipline.

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::enumerator::{pull, AsyncEnumerator, BoxEnumerator};
use crate::error::{self, Error};
use crate::sequence::{Element, Sequence};

/// Lifecycle of an enumerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Nothing acquired yet.
    NotStarted,
    /// A pull is in flight.
    Running,
    /// Positioned on an element.
    Iterating,
    /// Everything released; terminal.
    Disposed,
}

/// The operator specific part of an enumerator.
#[async_trait]
pub trait IteratorCore<T>: Send {
    /// First-pull setup: acquire upstream enumerators, seed buffers.
    async fn open(&mut self, _cancel: &CancellationToken) -> error::Result<()> {
        Ok(())
    }

    /// Compute the next element, or `None` when the traversal is over.
    async fn next(&mut self, cancel: &CancellationToken) -> error::Result<Option<T>>;

    /// Release owned resources. Called once by the state machine.
    async fn close(&mut self) -> error::Result<()> {
        Ok(())
    }
}

/// An enumerator driving an [`IteratorCore`].
pub struct AsyncIterator<T, C> {
    core: C,
    state: State,
    current: Option<T>,
    cancel: CancellationToken,
}

impl<T: Element, C: IteratorCore<T> + 'static> AsyncIterator<T, C> {
    pub fn new(core: C, cancel: CancellationToken) -> Self {
        Self {
            core,
            state: State::NotStarted,
            current: None,
            cancel,
        }
    }

    pub fn boxed(core: C, cancel: CancellationToken) -> BoxEnumerator<T> {
        Box::new(Self::new(core, cancel))
    }

    pub fn state(&self) -> State {
        self.state
    }

    async fn fail(&mut self, error: Error) -> error::Result<bool> {
        if let Err(release) = self.dispose().await {
            warn!(%release, %error, "release failed while unwinding a failed pull");
        }
        Err(error)
    }
}

#[async_trait]
impl<T: Element, C: IteratorCore<T> + 'static> AsyncEnumerator<T> for AsyncIterator<T, C> {
    async fn move_next(&mut self) -> error::Result<bool> {
        match self.state {
            State::Disposed => return Ok(false),
            State::Running => {
                // the future of the previous pull was dropped before it
                // finished, so the core may be half way through a step
                trace!("resuming after an abandoned pull");
                return self.fail(Error::Cancelled).await;
            }
            State::NotStarted => {
                if self.cancel.is_cancelled() {
                    self.state = State::Disposed;
                    return Err(Error::Cancelled);
                }
                trace!("opening enumerator");
                self.state = State::Running;
                let cancel = self.cancel.clone();
                let opened = race(&cancel, self.core.open(&cancel)).await;
                if let Err(error) = opened.and_then(|opened| opened) {
                    return self.fail(error).await;
                }
            }
            State::Iterating => self.state = State::Running,
        }

        let cancel = self.cancel.clone();
        let next = race(&cancel, self.core.next(&cancel)).await;
        match next.and_then(|next| next) {
            Ok(Some(item)) => {
                self.current = Some(item);
                self.state = State::Iterating;
                Ok(true)
            }
            Ok(None) => {
                trace!("enumerator exhausted");
                self.dispose().await?;
                Ok(false)
            }
            Err(error) => self.fail(error).await,
        }
    }

    fn current(&self) -> error::Result<&T> {
        match (self.state, &self.current) {
            (State::Iterating, Some(item)) => Ok(item),
            _ => Err(Error::NoCurrent),
        }
    }

    async fn dispose(&mut self) -> error::Result<()> {
        if self.state == State::Disposed {
            return Ok(());
        }
        trace!(state = ?self.state, "disposing enumerator");
        self.state = State::Disposed;
        self.current = None;
        self.core.close().await
    }
}

/// An upstream enumerator owned by an operator core.
pub struct Upstream<T> {
    enumerator: Option<BoxEnumerator<T>>,
}

impl<T: Element> Upstream<T> {
    pub fn new() -> Self {
        Self { enumerator: None }
    }

    pub fn open(&mut self, source: &Sequence<T>, cancel: &CancellationToken) {
        self.enumerator = Some(source.enumerator(cancel.clone()));
    }

    pub fn is_open(&self) -> bool {
        self.enumerator.is_some()
    }

    /// Pull the next upstream element; a closed upstream is exhausted.
    pub async fn pull(&mut self) -> error::Result<Option<T>> {
        match &mut self.enumerator {
            Some(enumerator) => pull(enumerator).await,
            None => Ok(None),
        }
    }

    pub async fn close(&mut self) -> error::Result<()> {
        match self.enumerator.take() {
            Some(mut enumerator) => enumerator.dispose().await,
            None => Ok(()),
        }
    }
}

impl<T: Element> Default for Upstream<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `future` to completion unless `cancel` fires first.
///
/// Cancellation wins a tie, and dropping `future` is how an in-flight step
/// (a pending upstream pull, a slow callback) is interrupted.
pub(crate) async fn race<F: Future>(
    cancel: &CancellationToken,
    future: F,
) -> error::Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        output = future => Ok(output),
    }
}

/// Fail fast if the traversal has been cancelled.
///
/// Used by loops that run without passing through the state machine, such as
/// the direct `to_vec` and `count` paths.
pub(crate) fn ensure_not_cancelled(cancel: &CancellationToken) -> error::Result<()> {
    if cancel.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}
