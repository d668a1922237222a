//! Type-erased values passed between callables.

use std::any::Any;
use std::sync::Arc;

use crate::error::{IncantError, IncantResult};

/// A type-erased, shareable value.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Wraps `v` into a [`Value`].
#[inline]
pub fn value<T: Any + Send + Sync>(v: T) -> Value {
    Arc::new(v)
}

/// Typed access to [`Value`]s.
///
/// # Examples
///
/// ```rust
/// use ferrous_incant::{value, ValueExt};
///
/// let v = value(41u64);
/// assert_eq!(v.get::<u64>().unwrap() + 1, 42);
/// assert!(v.get::<i32>().is_err());
/// ```
pub trait ValueExt {
    /// Downcasts to a shared `Arc<T>`.
    fn cast<T: Any + Send + Sync>(self) -> IncantResult<Arc<T>>;

    /// Clones the inner `T` out.
    fn get<T: Any + Clone>(&self) -> IncantResult<T>;
}

impl ValueExt for Value {
    fn cast<T: Any + Send + Sync>(self) -> IncantResult<Arc<T>> {
        self.downcast::<T>().map_err(|_| IncantError::TypeMismatch {
            name: "<value>".to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    fn get<T: Any + Clone>(&self) -> IncantResult<T> {
        self.downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| IncantError::TypeMismatch {
                name: "<value>".to_string(),
                expected: std::any::type_name::<T>(),
            })
    }
}
