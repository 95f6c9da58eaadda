//! Intermediate operators: each one is a sequence wrapping its source(s).

mod concat;
mod distinct;
pub(crate) mod filter;
pub(crate) mod map;
mod partition;
mod reverse;
mod set_ops;
mod take_last;

pub use concat::{AppendPrepend, Concat};
pub use distinct::Distinct;
pub use filter::{Filter, FilterMap};
pub use map::Map;
pub use partition::Slice;
pub use reverse::Reverse;
pub use set_ops::{SetFilter, Union};
pub use take_last::{SkipLast, TakeLast};
