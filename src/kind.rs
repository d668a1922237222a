//! Callable and scoped-resource kinds.

use std::fmt;

/// Whether a factory's result is a scoped resource, and how it is entered.
///
/// Declared on rules. `None` lets the resolver infer the kind from the
/// factory itself; a scoped kind must agree with the factory.
///
/// # Examples
///
/// ```rust
/// use ferrous_incant::{ScopeKind, CallableKind};
///
/// assert_eq!(CallableKind::AsyncScopedResource.scope_kind(), ScopeKind::Async);
/// assert!(ScopeKind::Sync.is_scoped());
/// assert!(!ScopeKind::None.is_scoped());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum ScopeKind {
    /// A plain value factory, or infer from the factory
    #[default]
    None,
    /// Entered and released by blocking calls
    Sync,
    /// Entered and released by awaiting
    Async,
}

impl ScopeKind {
    /// Returns true for the scoped variants.
    pub fn is_scoped(self) -> bool {
        !matches!(self, ScopeKind::None)
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::None => write!(f, "plain"),
            ScopeKind::Sync => write!(f, "sync"),
            ScopeKind::Async => write!(f, "async"),
        }
    }
}

/// The shape of a callable's body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallableKind {
    /// Blocking function
    Function,
    /// Function returning a future
    AsyncFunction,
    /// Blocking enter/release resource
    ScopedResource,
    /// Awaited enter/release resource
    AsyncScopedResource,
}

impl CallableKind {
    /// The scope kind this callable implements.
    pub fn scope_kind(self) -> ScopeKind {
        match self {
            CallableKind::Function | CallableKind::AsyncFunction => ScopeKind::None,
            CallableKind::ScopedResource => ScopeKind::Sync,
            CallableKind::AsyncScopedResource => ScopeKind::Async,
        }
    }

    /// Whether invoking this callable must suspend.
    pub fn is_async(self) -> bool {
        matches!(self, CallableKind::AsyncFunction | CallableKind::AsyncScopedResource)
    }
}

impl fmt::Display for CallableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallableKind::Function => write!(f, "function"),
            CallableKind::AsyncFunction => write!(f, "async function"),
            CallableKind::ScopedResource => write!(f, "scoped resource"),
            CallableKind::AsyncScopedResource => write!(f, "async scoped resource"),
        }
    }
}

/// Requested flavor of a composed callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Flavor {
    /// Async if anything in the graph is async, sync otherwise
    #[default]
    Auto,
    /// Must be synchronous; async nodes are a construction error
    Sync,
    /// Always async, even if every node is synchronous
    Async,
}

/// How a composed call ended, passed to scoped-resource release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The target returned normally
    Completed,
    /// A factory, the target, or a later resource failed
    Failed,
    /// The call was cancelled or dropped
    Cancelled,
}
