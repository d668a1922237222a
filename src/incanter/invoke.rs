//! Invocation helpers: compose-and-call, and incant.
//!
//! `call`/`acall` compose the target and invoke the result. `incant` and
//! `aincant` adapt a bag of available values down to whatever the target
//! declares, dropping the rest.

use std::any::{Any, TypeId};
use std::collections::BTreeSet;
use std::sync::Arc;

use super::{ComposeOptions, Incanter};
use crate::cache::{read, write, Lock, Map};
use crate::callable::Callable;
use crate::descriptors::CallArgs;
use crate::error::{IncantError, IncantResult};
use crate::key::CallableId;
use crate::kind::Flavor;
use crate::value::{value, Value};

#[cfg(feature = "async")]
use crate::cancellation::CancellationToken;

impl Incanter {
    /// Composes `target` as a sync callable and invokes the result.
    ///
    /// Fails with [`IncantError::AsyncInSync`] at compose time if anything
    /// in the graph is async.
    pub fn call(&self, target: &Callable, args: CallArgs) -> IncantResult<Value> {
        let composed = self.compose_with(target, ComposeOptions::new().flavor(Flavor::Sync))?;
        composed.call(args)
    }

    /// Composes `target` as an async callable and awaits it.
    pub async fn acall(&self, target: &Callable, args: CallArgs) -> IncantResult<Value> {
        let composed = self.compose_with(target, ComposeOptions::new().flavor(Flavor::Async))?;
        composed.call_async(args).await
    }

    /// Like [`acall`](Self::acall), aborting when `token` is cancelled.
    ///
    /// On cancellation every scoped resource entered so far is released in
    /// reverse order with [`Exit::Cancelled`](crate::Exit::Cancelled) before
    /// [`IncantError::Cancelled`] is returned.
    #[cfg(feature = "async")]
    pub async fn acall_cancellable(
        &self,
        target: &Callable,
        args: CallArgs,
        token: CancellationToken,
    ) -> IncantResult<Value> {
        let composed = self.compose_with(target, ComposeOptions::new().flavor(Flavor::Async))?;
        let values = composed.signature().bind(args)?;
        composed.invoke_cancellable(values, token).await
    }

    /// Invokes `target` with whatever it declares out of `available`.
    ///
    /// Each parameter is filled from a same-named value, else from the first
    /// positional value of its declared type, else left to its default.
    /// Unused values are dropped.
    pub fn incant(&self, target: &Callable, available: Available) -> IncantResult<Value> {
        let values = self.adapt(target, &available.shape())?.fill(available)?;
        target.invoke_sync(values)
    }

    /// Async counterpart of [`incant`](Self::incant).
    pub async fn aincant(&self, target: &Callable, available: Available) -> IncantResult<Value> {
        let values = self.adapt(target, &available.shape())?.fill(available)?;
        target.invoke_async(values).await
    }

    /// Precomputes how `target` is filled from values of the given shape.
    ///
    /// The plan is cached per target and shape.
    pub fn adapt(&self, target: &Callable, shape: &Shape) -> IncantResult<AdaptedCall> {
        let key = (target.id(), shape.clone());
        if let Some(plan) = self.incants.get(&key) {
            return Ok(AdaptedCall {
                target: target.clone(),
                plan,
            });
        }

        let plan = Arc::new(incant_plan(target, shape)?);
        let plan = self.incants.insert(key, target.clone(), plan);
        Ok(AdaptedCall {
            target: target.clone(),
            plan,
        })
    }
}

/// Values offered to [`Incanter::incant`]: named ones and unnamed ones
/// matched by type.
///
/// # Examples
///
/// ```rust
/// use ferrous_incant::{Incanter, Available, Callable, ValueExt};
///
/// let incanter = Incanter::new();
/// let handler = Callable::from_fn2("handler", ["a", "c"], |a: i32, c: i32| a + c);
///
/// let available = Available::new().with("a", 1i32).with("b", 2i32).with("c", 3i32);
/// let out = incanter.incant(&handler, available).unwrap();
/// assert_eq!(out.get::<i32>().unwrap(), 4);
/// ```
#[derive(Clone, Default)]
pub struct Available {
    named: Vec<(String, Value)>,
    positional: Vec<Value>,
}

impl Available {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers `v` under `name`. A later value replaces an earlier one.
    pub fn with<T: Any + Send + Sync>(self, name: impl Into<String>, v: T) -> Self {
        self.with_value(name, value(v))
    }

    pub fn with_value(mut self, name: impl Into<String>, v: Value) -> Self {
        let name = name.into();
        self.named.retain(|(existing, _)| *existing != name);
        self.named.push((name, v));
        self
    }

    /// Offers `v` to any parameter declared as `T`.
    pub fn positional<T: Any + Send + Sync>(self, v: T) -> Self {
        self.positional_value(value(v))
    }

    pub fn positional_value(mut self, v: Value) -> Self {
        self.positional.push(v);
        self
    }

    /// The names and positional types on offer.
    pub fn shape(&self) -> Shape {
        Shape {
            names: self.named.iter().map(|(n, _)| n.clone()).collect(),
            positional: self.positional.iter().map(|v| (**v).type_id()).collect(),
        }
    }

    fn named_value(&self, name: &str) -> Option<Value> {
        self.named
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }
}

/// The names and positional types of an [`Available`], without the values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Shape {
    names: BTreeSet<String>,
    positional: Vec<TypeId>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.names.insert(name.into());
        self
    }

    pub fn positional<T: Any>(mut self) -> Self {
        self.positional.push(TypeId::of::<T>());
        self
    }
}

#[derive(Debug, Clone)]
enum Fill {
    Named(String),
    Positional(usize),
    Default,
}

fn incant_plan(target: &Callable, shape: &Shape) -> IncantResult<Vec<Fill>> {
    target
        .signature()
        .params()
        .iter()
        .map(|param| {
            if shape.names.contains(param.name()) {
                return Ok(Fill::Named(param.name().to_string()));
            }
            let by_type = param
                .declared_type()
                .and_then(|ty| shape.positional.iter().position(|id| *id == ty.id()));
            match by_type {
                Some(ix) => Ok(Fill::Positional(ix)),
                None if param.has_default() => Ok(Fill::Default),
                None => Err(IncantError::MissingArgument(param.name().to_string())),
            }
        })
        .collect()
}

/// A callable bound to a precomputed incant plan.
#[derive(Clone)]
pub struct AdaptedCall {
    target: Callable,
    plan: Arc<Vec<Fill>>,
}

impl AdaptedCall {
    pub fn target(&self) -> &Callable {
        &self.target
    }

    /// Invokes the target synchronously.
    pub fn call(&self, available: Available) -> IncantResult<Value> {
        let values = self.fill(available)?;
        self.target.invoke_sync(values)
    }

    /// Invokes the target, awaiting it if needed.
    pub async fn call_async(&self, available: Available) -> IncantResult<Value> {
        let values = self.fill(available)?;
        self.target.invoke_async(values).await
    }

    fn fill(&self, available: Available) -> IncantResult<Vec<Value>> {
        let params = self.target.signature().params();
        self.plan
            .iter()
            .zip(params)
            .map(|(fill, param)| match fill {
                Fill::Named(name) => available
                    .named_value(name)
                    .ok_or_else(|| IncantError::MissingArgument(name.clone())),
                Fill::Positional(ix) => {
                    let v = available
                        .positional
                        .get(*ix)
                        .ok_or_else(|| IncantError::MissingArgument(param.name().to_string()))?;
                    match param.declared_type() {
                        Some(ty) if (**v).type_id() == ty.id() => Ok(v.clone()),
                        _ => Err(IncantError::TypeMismatch {
                            name: param.name().to_string(),
                            expected: param.declared_type().map_or("<untyped>", |ty| ty.name()),
                        }),
                    }
                }
                Fill::Default => param
                    .default()
                    .cloned()
                    .ok_or_else(|| IncantError::MissingArgument(param.name().to_string())),
            })
            .collect()
    }
}

/// Incant plans per (target, shape).
#[derive(Default)]
pub(crate) struct IncantCache {
    entries: Lock<Map<(CallableId, Shape), (Callable, Arc<Vec<Fill>>)>>,
}

impl IncantCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &(CallableId, Shape)) -> Option<Arc<Vec<Fill>>> {
        read(&self.entries).get(key).map(|(_, plan)| plan.clone())
    }

    fn insert(&self, key: (CallableId, Shape), target: Callable, plan: Arc<Vec<Fill>>) -> Arc<Vec<Fill>> {
        let mut entries = write(&self.entries);
        entries.entry(key).or_insert((target, plan)).1.clone()
    }

    pub(crate) fn clear(&self) {
        write(&self.entries).clear();
    }
}
