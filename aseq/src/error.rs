use thiserror::Error;

/// Errors raised while building or pulling a sequence.
#[derive(Debug, Error)]
pub enum Error {
    /// An argument was outside of its allowed range.
    ///
    /// Raised synchronously when the sequence is built, never during a pull.
    #[error("argument `{name}` out of range: {reason}")]
    ArgumentOutOfRange {
        name: &'static str,
        reason: &'static str,
    },
    /// The sequence has no (or not enough) elements for the operation.
    #[error("sequence contains no matching element")]
    NoElements,
    /// The sequence has more than one element where exactly one was expected.
    #[error("sequence contains more than one element")]
    MoreThanOneElement,
    /// `current` was read while the enumerator was not positioned on an element.
    #[error("enumerator is not positioned on an element")]
    NoCurrent,
    /// The traversal was cancelled.
    #[error("operation was cancelled")]
    Cancelled,
    /// A user supplied predicate or selector failed.
    #[error("callback failed: {0}")]
    Callback(#[source] anyhow::Error),
    /// An external source failed.
    #[error("source failed: {0}")]
    Source(#[source] anyhow::Error),
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Wrap a callback failure, unless it already carries one of our errors.
    pub(crate) fn from_callback(error: anyhow::Error) -> Self {
        match error.downcast::<Error>() {
            Ok(inner) => inner,
            Err(error) => Error::Callback(error),
        }
    }

    /// Wrap a source failure, unless it already carries one of our errors.
    pub(crate) fn from_source(error: anyhow::Error) -> Self {
        match error.downcast::<Error>() {
            Ok(inner) => inner,
            Err(error) => Error::Source(error),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
