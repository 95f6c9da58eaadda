//! Lazily evaluated, asynchronous pull sequences.
//!
//! A [`Sequence`] is an immutable, re-enumerable description of a
//! computation. Each traversal gets its own enumerator, which is pulled one
//! element at a time, may suspend on every pull, observes a
//! [`CancellationToken`] and releases everything it holds on every exit path.
//!
//! ```
//! # async fn example() -> aseq::error::Result<()> {
//! use aseq::{CancellationToken, Sequence};
//!
//! let cancel = CancellationToken::new();
//! let squares = Sequence::range(1, 10)?
//!     .filter(|x| x % 2 == 1)
//!     .map(|x| x * x)
//!     .take(3);
//! assert_eq!(squares.to_vec(&cancel).await?, vec![1, 9, 25]);
//! # Ok(())
//! # }
//! ```

pub mod callback;
pub mod capability;
pub mod enumerator;
pub mod error;
mod fusion;
pub mod iterator;
pub mod observable;
pub mod operator;
mod sequence;
pub mod source;
mod terminal;

pub use aseq_collections::{
    DefaultComparer, EqualityComparer, FnComparer, KeyComparer, Maybe, Set,
};
pub use tokio_util::sync::CancellationToken;

pub use crate::callback::{Predicate, Selector};
pub use crate::capability::{CountHint, ListSource, Partition};
pub use crate::enumerator::{AsyncEnumerator, BoxEnumerator};
pub use crate::error::{Error, Result};
pub use crate::fusion::Predicates;
pub use crate::iterator::{AsyncIterator, IteratorCore, State, Upstream};
pub use crate::observable::{Observable, Observer, Subscription};
pub use crate::sequence::{AsyncSequence, Element, Sequence};
