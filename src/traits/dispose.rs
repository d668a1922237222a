//! Disposal traits for resource cleanup.

/// Trait for synchronous resource disposal.
///
/// Implement this trait for values that need structured teardown (flushing
/// buffers, closing connections) and hand them out through
/// [`Resource::disposing`](crate::Resource::disposing). The composed call
/// disposes them in reverse order of entry.
///
/// # Examples
///
/// ```
/// use ferrous_incant::{Dispose, Callable, Resource, Signature, Incanter, ScopeKind, CallArgs};
/// use std::sync::Arc;
///
/// struct Cache {
///     name: String,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         println!("Flushing cache: {}", self.name);
///     }
/// }
///
/// let mut incanter = Incanter::new();
/// incanter.register_by_name(
///     "cache",
///     Callable::scoped("cache", Signature::new().returns::<Cache>(), |_| {
///         Ok(Resource::disposing(Arc::new(Cache { name: "user_cache".to_string() })))
///     }),
/// );
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}

/// Trait for asynchronous resource disposal.
///
/// Implement this trait for values that require async teardown (graceful
/// connection shutdown, async I/O cleanup) and hand them out through
/// [`AsyncResource::disposing`](crate::AsyncResource::disposing).
///
/// # Examples
///
/// ```
/// use ferrous_incant::{AsyncDispose, AsyncResource};
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct DatabaseClient {
///     connection_id: String,
/// }
///
/// #[async_trait]
/// impl AsyncDispose for DatabaseClient {
///     async fn dispose(&self) {
///         println!("Closing database connection: {}", self.connection_id);
///     }
/// }
///
/// let resource = AsyncResource::disposing(Arc::new(DatabaseClient {
///     connection_id: "conn_123".to_string(),
/// }));
/// assert!(resource.value().downcast_ref::<DatabaseClient>().is_some());
/// ```
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    /// Perform asynchronous cleanup of resources.
    async fn dispose(&self);
}
