//! Error types for composition and invocation.

use thiserror::Error;

use crate::kind::{CallableKind, ScopeKind};

/// Boxed error produced by user factories and targets.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while composing or invoking callables.
///
/// The variants fall into three groups:
///
/// - **Construction errors** (`Circular`, `DepthExceeded`, `AsyncInSync`,
///   `ScopeKindMismatch`, `TypeConflict`, `NoReturnType`) are raised by
///   `compose` and indicate a wiring mistake. They are never swallowed.
/// - **Call errors** (`MissingArgument`, `UnexpectedArgument`,
///   `TooManyPositional`, `MultipleValues`, `TypeMismatch`, `NotSync`) come
///   from binding arguments to a signature or from invoking a callable the
///   wrong way.
/// - **Runtime errors** (`Factory`, `Release`, `Unwind`, `Cancelled`) come
///   from the callables themselves and from scoped-resource cleanup.
///
/// # Examples
///
/// ```rust
/// use ferrous_incant::IncantError;
///
/// let circular = IncantError::Circular(vec!["a".into(), "b".into(), "a".into()]);
/// assert_eq!(circular.to_string(), "Circular dependency: a -> b -> a");
///
/// let failed = IncantError::factory("connection refused");
/// assert_eq!(failed.to_string(), "connection refused");
/// assert!(failed.factory_error().is_some());
/// ```
#[derive(Debug, Error)]
pub enum IncantError {
    /// A factory depends on itself, directly or transitively (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<String>),
    /// Maximum resolution depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// An async node was found under a composition required to be synchronous
    #[error("`{node}` is async and cannot run inside a synchronous composition of `{target}`")]
    AsyncInSync { target: String, node: String },
    /// A rule declared a scoped kind its factory does not implement
    #[error("factory `{factory}` is declared as a {declared} scoped resource but is a {actual}")]
    ScopeKindMismatch {
        factory: String,
        declared: ScopeKind,
        actual: CallableKind,
    },
    /// Two forwarded parameters with the same name declare different types
    #[error("conflicting types for parameter `{name}`: {first} and {second}")]
    TypeConflict {
        name: String,
        first: &'static str,
        second: &'static str,
    },
    /// Registration by return type on a callable with no declared return type
    #[error("`{0}` declares no return type; provide a type explicitly")]
    NoReturnType(String),

    /// A required parameter received no value
    #[error("missing required argument `{0}`")]
    MissingArgument(String),
    /// A keyword argument names no parameter
    #[error("unexpected keyword argument `{0}`")]
    UnexpectedArgument(String),
    /// More positional values than positional parameters
    #[error("takes {expected} positional argument(s) but {given} were given")]
    TooManyPositional { expected: usize, given: usize },
    /// A parameter was given both positionally and by keyword
    #[error("multiple values for argument `{0}`")]
    MultipleValues(String),
    /// A value could not be downcast to the requested type
    #[error("argument `{name}` is not a `{expected}`")]
    TypeMismatch { name: String, expected: &'static str },
    /// A synchronous invocation was attempted on an async callable
    #[error("`{0}` is async; invoke it with `acall` or `call_async`")]
    NotSync(String),

    /// A factory or target failed; the error is carried unchanged
    #[error(transparent)]
    Factory(BoxError),
    /// One or more scoped resources failed to release after a successful call
    #[error("{} scoped resource(s) failed to release: {}", .0.len(), join_errors(.0))]
    Release(Vec<IncantError>),
    /// The call failed and one or more scoped resources also failed to release
    #[error("{error} (while unwinding, {} scoped resource(s) failed to release)", .release.len())]
    Unwind {
        #[source]
        error: Box<IncantError>,
        release: Vec<IncantError>,
    },
    /// The call was cancelled before completing
    #[error("Operation was cancelled")]
    Cancelled,
}

impl IncantError {
    /// Wraps an arbitrary error raised by a factory or target.
    pub fn factory(error: impl Into<BoxError>) -> Self {
        IncantError::Factory(error.into())
    }

    /// Returns the factory error this error carries, looking through unwind
    /// chains.
    pub fn factory_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            IncantError::Factory(inner) => Some(inner.as_ref()),
            IncantError::Unwind { error, .. } => error.factory_error(),
            _ => None,
        }
    }

    /// True for errors raised while building a composition.
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            IncantError::Circular(_)
                | IncantError::DepthExceeded(_)
                | IncantError::AsyncInSync { .. }
                | IncantError::ScopeKindMismatch { .. }
                | IncantError::TypeConflict { .. }
                | IncantError::NoReturnType(_)
        )
    }

    /// Errors raised while releasing scoped resources, if any.
    pub fn release_errors(&self) -> &[IncantError] {
        match self {
            IncantError::Release(errors) => errors,
            IncantError::Unwind { release, .. } => release,
            _ => &[],
        }
    }
}

fn join_errors(errors: &[IncantError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for composition and invocation.
pub type IncantResult<T> = Result<T, IncantError>;
