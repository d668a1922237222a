//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod unwind;

pub(crate) use circular::{ResolutionStack, MAX_DEPTH};
pub(crate) use unwind::UnwindStack;
