//! Callables: a signature plus a sync, async, or scoped body.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::composer::Plan;
use crate::descriptors::{CallArgs, Param, Signature};
use crate::error::{IncantError, IncantResult};
use crate::key::{CallableId, TypeKey};
use crate::kind::{CallableKind, Exit};
use crate::traits::{AsyncDispose, Dispose};
use crate::value::{value, Value};

/// Boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub(crate) type SyncBody = Arc<dyn Fn(Arguments) -> IncantResult<Value> + Send + Sync>;
pub(crate) type AsyncBody =
    Arc<dyn Fn(Arguments) -> BoxFuture<'static, IncantResult<Value>> + Send + Sync>;
pub(crate) type ScopedBody = Arc<dyn Fn(Arguments) -> IncantResult<Resource> + Send + Sync>;
pub(crate) type AsyncScopedBody =
    Arc<dyn Fn(Arguments) -> BoxFuture<'static, IncantResult<AsyncResource>> + Send + Sync>;

pub(crate) type SyncRelease = Box<dyn FnOnce(Exit) -> IncantResult<()> + Send>;
pub(crate) type AsyncRelease =
    Box<dyn FnOnce(Exit) -> BoxFuture<'static, IncantResult<()>> + Send>;

pub(crate) enum Body {
    Sync(SyncBody),
    Async(AsyncBody),
    Scoped(ScopedBody),
    AsyncScoped(AsyncScopedBody),
    Composed(Arc<Plan>),
}

struct CallableInner {
    name: Cow<'static, str>,
    signature: Signature,
    body: Body,
}

/// A named, introspectable callable.
///
/// Cloning is cheap and preserves identity: clones compare equal, separately
/// constructed callables never do, even with identical bodies.
///
/// # Examples
///
/// ```rust
/// use ferrous_incant::{Callable, Signature, Param, CallArgs, ValueExt, value};
///
/// let add = Callable::sync(
///     "add",
///     Signature::new()
///         .param(Param::new("a").typed::<i64>())
///         .param(Param::new("b").typed::<i64>())
///         .returns::<i64>(),
///     |args| Ok(value(args.get::<i64>("a")? + args.get::<i64>("b")?)),
/// );
///
/// let out = add.call(CallArgs::new().arg(2i64).kwarg("b", 3i64)).unwrap();
/// assert_eq!(out.get::<i64>().unwrap(), 5);
/// assert_eq!(add, add.clone());
/// ```
#[derive(Clone)]
pub struct Callable {
    inner: Arc<CallableInner>,
}

impl Callable {
    fn from_body(name: impl Into<Cow<'static, str>>, signature: Signature, body: Body) -> Self {
        Callable {
            inner: Arc::new(CallableInner {
                name: name.into(),
                signature,
                body,
            }),
        }
    }

    /// A blocking function.
    pub fn sync<F>(name: impl Into<Cow<'static, str>>, signature: Signature, f: F) -> Self
    where
        F: Fn(Arguments) -> IncantResult<Value> + Send + Sync + 'static,
    {
        Self::from_body(name, signature, Body::Sync(Arc::new(f)))
    }

    /// A function returning a future.
    pub fn async_fn<F, Fut>(name: impl Into<Cow<'static, str>>, signature: Signature, f: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = IncantResult<Value>> + Send + 'static,
    {
        let body: AsyncBody = Arc::new(move |args| Box::pin(f(args)));
        Self::from_body(name, signature, Body::Async(body))
    }

    /// A scoped resource entered and released by blocking calls.
    ///
    /// Calling `f` enters the resource; the returned [`Resource`] carries the
    /// produced value and its release step.
    pub fn scoped<F>(name: impl Into<Cow<'static, str>>, signature: Signature, f: F) -> Self
    where
        F: Fn(Arguments) -> IncantResult<Resource> + Send + Sync + 'static,
    {
        Self::from_body(name, signature, Body::Scoped(Arc::new(f)))
    }

    /// A scoped resource entered and released by awaiting.
    pub fn async_scoped<F, Fut>(
        name: impl Into<Cow<'static, str>>,
        signature: Signature,
        f: F,
    ) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = IncantResult<AsyncResource>> + Send + 'static,
    {
        let body: AsyncScopedBody = Arc::new(move |args| Box::pin(f(args)));
        Self::from_body(name, signature, Body::AsyncScoped(body))
    }

    /// A zero-argument factory returning a clone of `v`.
    pub fn constant<T: Any + Send + Sync>(name: impl Into<Cow<'static, str>>, v: T) -> Self {
        let v = value(v);
        Self::sync(name, Signature::new().returns::<T>(), move |_| Ok(v.clone()))
    }

    /// A zero-argument factory returning an already-erased value.
    pub fn constant_value(
        name: impl Into<Cow<'static, str>>,
        v: Value,
        returns: Option<TypeKey>,
    ) -> Self {
        Self::sync(name, Signature::from_params(Vec::new(), returns), move |_| Ok(v.clone()))
    }

    /// A typed zero-argument function.
    pub fn from_fn0<R, F>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        R: Any + Send + Sync,
        F: Fn() -> R + Send + Sync + 'static,
    {
        Self::sync(name, Signature::new().returns::<R>(), move |_| Ok(value(f())))
    }

    /// A typed one-argument function; the argument is cloned out of its value.
    pub fn from_fn1<A, R, F>(name: impl Into<Cow<'static, str>>, a: &'static str, f: F) -> Self
    where
        A: Any + Clone + Send + Sync,
        R: Any + Send + Sync,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        let signature = Signature::new().param(Param::new(a).typed::<A>()).returns::<R>();
        Self::sync(name, signature, move |args| Ok(value(f(args.at::<A>(0)?))))
    }

    /// A typed two-argument function.
    pub fn from_fn2<A, B, R, F>(
        name: impl Into<Cow<'static, str>>,
        params: [&'static str; 2],
        f: F,
    ) -> Self
    where
        A: Any + Clone + Send + Sync,
        B: Any + Clone + Send + Sync,
        R: Any + Send + Sync,
        F: Fn(A, B) -> R + Send + Sync + 'static,
    {
        let signature = Signature::new()
            .param(Param::new(params[0]).typed::<A>())
            .param(Param::new(params[1]).typed::<B>())
            .returns::<R>();
        Self::sync(name, signature, move |args| {
            Ok(value(f(args.at::<A>(0)?, args.at::<B>(1)?)))
        })
    }

    pub(crate) fn composed(name: String, plan: Arc<Plan>) -> Self {
        let signature = plan.signature().clone();
        Self::from_body(name, signature, Body::Composed(plan))
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn signature(&self) -> &Signature {
        &self.inner.signature
    }

    /// Identity of this callable.
    pub fn id(&self) -> CallableId {
        CallableId(Arc::as_ptr(&self.inner) as *const () as usize)
    }

    /// True if both handles refer to the same callable.
    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn kind(&self) -> CallableKind {
        match &self.inner.body {
            Body::Sync(_) => CallableKind::Function,
            Body::Async(_) => CallableKind::AsyncFunction,
            Body::Scoped(_) => CallableKind::ScopedResource,
            Body::AsyncScoped(_) => CallableKind::AsyncScopedResource,
            Body::Composed(plan) if plan.is_async() => CallableKind::AsyncFunction,
            Body::Composed(_) => CallableKind::Function,
        }
    }

    /// Whether invoking this callable must be awaited.
    pub fn is_async(&self) -> bool {
        self.kind().is_async()
    }

    /// True for callables produced by composition.
    pub fn is_composed(&self) -> bool {
        matches!(self.inner.body, Body::Composed(_))
    }

    /// Invokes a synchronous callable.
    ///
    /// Scoped resources are entered and released immediately around producing
    /// their value. Async callables fail with [`IncantError::NotSync`].
    pub fn call(&self, args: CallArgs) -> IncantResult<Value> {
        let values = self.signature().bind(args)?;
        self.invoke_sync(values)
    }

    /// Invokes any callable, awaiting it if needed.
    pub async fn call_async(&self, args: CallArgs) -> IncantResult<Value> {
        let values = self.signature().bind(args)?;
        self.invoke_async(values).await
    }

    pub(crate) fn arguments(&self, values: Vec<Value>) -> Arguments {
        Arguments {
            signature: self.signature().clone(),
            values,
        }
    }

    /// Invokes with values already bound to this callable's signature.
    pub(crate) fn invoke_sync(&self, values: Vec<Value>) -> IncantResult<Value> {
        match &self.inner.body {
            Body::Sync(f) => f(self.arguments(values)),
            Body::Scoped(f) => {
                let (v, release) = f(self.arguments(values))?.into_parts();
                release(Exit::Completed).map_err(|e| IncantError::Release(vec![e]))?;
                Ok(v)
            }
            Body::Composed(plan) if !plan.is_async() => plan.run_sync(values),
            _ => Err(IncantError::NotSync(self.name().to_string())),
        }
    }

    pub(crate) fn invoke_async(&self, values: Vec<Value>) -> BoxFuture<'static, IncantResult<Value>> {
        let this = self.clone();
        Box::pin(async move {
            match &this.inner.body {
                Body::Async(f) => f(this.arguments(values)).await,
                Body::AsyncScoped(f) => {
                    let (v, release) = f(this.arguments(values)).await?.into_parts();
                    release(Exit::Completed)
                        .await
                        .map_err(|e| IncantError::Release(vec![e]))?;
                    Ok(v)
                }
                Body::Composed(plan) if plan.is_async() => plan.clone().run_async(values).await,
                _ => this.invoke_sync(values),
            }
        })
    }

    /// Invokes with bound values, aborting once `token` is cancelled.
    #[cfg(feature = "async")]
    pub(crate) fn invoke_cancellable(
        &self,
        values: Vec<Value>,
        token: crate::cancellation::CancellationToken,
    ) -> BoxFuture<'static, IncantResult<Value>> {
        match &self.inner.body {
            Body::Composed(plan) => plan.clone().run_async_cancellable(values, token),
            _ => {
                let call = self.invoke_async(values);
                Box::pin(async move {
                    token.throw_if_cancelled()?;
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => Err(IncantError::Cancelled),
                        r = call => r,
                    }
                })
            }
        }
    }

    /// Enters a sync scoped resource.
    pub(crate) fn enter_sync(&self, values: Vec<Value>) -> IncantResult<Resource> {
        match &self.inner.body {
            Body::Scoped(f) => f(self.arguments(values)),
            _ => Err(self.scope_mismatch(crate::kind::ScopeKind::Sync)),
        }
    }

    /// Enters an async scoped resource.
    pub(crate) fn enter_async(
        &self,
        values: Vec<Value>,
    ) -> BoxFuture<'static, IncantResult<AsyncResource>> {
        match &self.inner.body {
            Body::AsyncScoped(f) => f(self.arguments(values)),
            _ => {
                let err = self.scope_mismatch(crate::kind::ScopeKind::Async);
                Box::pin(async move { Err(err) })
            }
        }
    }

    fn scope_mismatch(&self, declared: crate::kind::ScopeKind) -> IncantError {
        IncantError::ScopeKindMismatch {
            factory: self.name().to_string(),
            declared,
            actual: self.kind(),
        }
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Callable {}

impl std::hash::Hash for Callable {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("signature", self.signature())
            .finish()
    }
}

/// Bound arguments handed to a callable body.
///
/// Holds exactly one value per parameter, in declaration order.
pub struct Arguments {
    signature: Signature,
    values: Vec<Value>,
}

impl Arguments {
    /// The erased value of parameter `name`.
    pub fn value(&self, name: &str) -> IncantResult<&Value> {
        self.signature
            .position(name)
            .and_then(|ix| self.values.get(ix))
            .ok_or_else(|| IncantError::MissingArgument(name.to_string()))
    }

    /// Clones parameter `name` out as a `T`.
    pub fn get<T: Any + Clone>(&self, name: &str) -> IncantResult<T> {
        self.value(name)?
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| IncantError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Parameter `name` as a shared `Arc<T>`.
    pub fn arc<T: Any + Send + Sync>(&self, name: &str) -> IncantResult<Arc<T>> {
        self.value(name)?
            .clone()
            .downcast::<T>()
            .map_err(|_| IncantError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Clones the parameter at position `ix` out as a `T`.
    pub fn at<T: Any + Clone>(&self, ix: usize) -> IncantResult<T> {
        let name = self
            .signature
            .params()
            .get(ix)
            .map(|p| p.name().to_string())
            .unwrap_or_else(|| ix.to_string());
        self.values
            .get(ix)
            .ok_or_else(|| IncantError::MissingArgument(name.clone()))?
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| IncantError::TypeMismatch {
                name,
                expected: std::any::type_name::<T>(),
            })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Consumes the arguments, returning the raw values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// A sync scoped resource that has been entered.
///
/// # Examples
///
/// ```rust
/// use ferrous_incant::{Resource, Exit};
/// use std::sync::{Arc, Mutex};
///
/// let log = Arc::new(Mutex::new(Vec::new()));
/// let sink = log.clone();
/// let res = Resource::new(7u8, move |exit| {
///     sink.lock().unwrap().push(exit);
///     Ok(())
/// });
/// assert!(res.value().downcast_ref::<u8>().is_some());
/// ```
pub struct Resource {
    value: Value,
    release: SyncRelease,
}

impl Resource {
    /// A resource producing `v`, released by `release`.
    pub fn new<T, F>(v: T, release: F) -> Self
    where
        T: Any + Send + Sync,
        F: FnOnce(Exit) -> IncantResult<()> + Send + 'static,
    {
        Self::from_value(value(v), release)
    }

    pub fn from_value<F>(v: Value, release: F) -> Self
    where
        F: FnOnce(Exit) -> IncantResult<()> + Send + 'static,
    {
        Resource {
            value: v,
            release: Box::new(release),
        }
    }

    /// A resource whose value is `service`, disposed on release.
    pub fn disposing<T: Dispose>(service: Arc<T>) -> Self {
        let v: Value = service.clone();
        Self::from_value(v, move |_| {
            service.dispose();
            Ok(())
        })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn into_parts(self) -> (Value, SyncRelease) {
        (self.value, self.release)
    }
}

/// An async scoped resource that has been entered.
pub struct AsyncResource {
    value: Value,
    release: AsyncRelease,
}

impl AsyncResource {
    /// A resource producing `v`, released by awaiting `release`.
    pub fn new<T, F, Fut>(v: T, release: F) -> Self
    where
        T: Any + Send + Sync,
        F: FnOnce(Exit) -> Fut + Send + 'static,
        Fut: Future<Output = IncantResult<()>> + Send + 'static,
    {
        Self::from_value(value(v), release)
    }

    pub fn from_value<F, Fut>(v: Value, release: F) -> Self
    where
        F: FnOnce(Exit) -> Fut + Send + 'static,
        Fut: Future<Output = IncantResult<()>> + Send + 'static,
    {
        AsyncResource {
            value: v,
            release: Box::new(move |exit| Box::pin(release(exit))),
        }
    }

    /// A resource whose value is `service`, disposed asynchronously on release.
    pub fn disposing<T: AsyncDispose>(service: Arc<T>) -> Self {
        let v: Value = service.clone();
        Self::from_value(v, move |_| async move {
            service.dispose().await;
            Ok(())
        })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn into_parts(self) -> (Value, AsyncRelease) {
        (self.value, self.release)
    }
}
