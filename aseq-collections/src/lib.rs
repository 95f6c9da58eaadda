mod comparer;
mod linked;
mod set;

pub use comparer::{DefaultComparer, EqualityComparer, FnComparer, KeyComparer};
pub use linked::{SingleLinkedNode, SingleLinkedNodeIter};
pub use set::{Set, SetIter};

/// An optional value used to report "no element" without an error.
///
/// `None` means there is no value at all; `Some(value)` carries any value,
/// including `T::default()`, so the two cases never collide.
pub type Maybe<T> = Option<T>;
