use async_trait::async_trait;
use tracing::warn;

use crate::error;

/// A single cursor over one traversal of a sequence.
///
/// The cursor starts before the first element. `move_next` advances it and
/// may suspend; `current` is only valid right after a `move_next` that
/// returned `true`. `dispose` releases everything the cursor owns; it is
/// idempotent, and a disposed cursor reports exhaustion on every further
/// pull.
///
/// Pulling takes `&mut self`, so one cursor can never be pulled from two
/// places at once. Independent traversals get independent cursors.
#[async_trait]
pub trait AsyncEnumerator<T>: Send {
    /// Advance to the next element. Returns `false` once exhausted.
    async fn move_next(&mut self) -> error::Result<bool>;

    /// The element produced by the last successful `move_next`.
    fn current(&self) -> error::Result<&T>;

    /// Release all owned resources. Safe to call any number of times.
    async fn dispose(&mut self) -> error::Result<()>;
}

pub type BoxEnumerator<T> = Box<dyn AsyncEnumerator<T>>;

/// Pull the next element out of an enumerator.
pub async fn pull<T: Clone>(enumerator: &mut BoxEnumerator<T>) -> error::Result<Option<T>> {
    if enumerator.move_next().await? {
        Ok(Some(enumerator.current()?.clone()))
    } else {
        Ok(None)
    }
}

/// Dispose `enumerator` and hand back `result`.
///
/// For loops that stop pulling before the enumerator is exhausted. A failure
/// of the loop itself wins over a failure to release.
pub(crate) async fn finish<T, R>(
    enumerator: &mut BoxEnumerator<T>,
    result: error::Result<R>,
) -> error::Result<R> {
    let released = enumerator.dispose().await;
    match result {
        Ok(value) => released.map(|()| value),
        Err(error) => {
            if let Err(release) = released {
                warn!(%release, %error, "release failed after an early exit");
            }
            Err(error)
        }
    }
}

/// Combine the outcomes of releasing several resources.
///
/// Callers attempt every release before calling this; the first failure is
/// returned and the rest are logged.
pub(crate) fn release_all(
    results: impl IntoIterator<Item = error::Result<()>>,
) -> error::Result<()> {
    let mut first = None;
    for result in results {
        if let Err(error) = result {
            if first.is_none() {
                first = Some(error);
            } else {
                warn!(%error, "additional release failure");
            }
        }
    }
    match first {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
