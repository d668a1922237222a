//! Type tokens and callable identities.

use std::any::TypeId;
use std::fmt;

/// Declared-type token for a parameter or return value.
///
/// Equality and hashing use the `TypeId` only; the name is kept for
/// diagnostics.
///
/// # Examples
///
/// ```rust
/// use ferrous_incant::{TypeKey, type_key};
///
/// let a = type_key::<u32>();
/// let b = TypeKey::of::<u32>();
/// assert_eq!(a, b);
/// assert_eq!(a.name(), "u32");
/// assert_ne!(a, type_key::<i32>());
/// ```
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Token for `T`.
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeKey {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The `type_name` of the type.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Helper for creating type tokens.
#[inline(always)]
pub fn type_key<T: ?Sized + 'static>() -> TypeKey {
    TypeKey::of::<T>()
}

/// Identity of a callable: the address of its shared allocation.
///
/// Two handles have the same id exactly when they are clones of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallableId(pub(crate) usize);
