//! The public entry point: rule registration and composition.

mod invoke;

pub use invoke::{AdaptedCall, Available, Shape};

use std::any::Any;
use std::sync::Arc;

use crate::cache::{CacheInputs, CompositionCache};
use crate::callable::Callable;
use crate::composer;
use crate::config::IncanterConfig;
use crate::descriptors::Param;
use crate::error::{IncantError, IncantResult};
use crate::key::type_key;
use crate::kind::{Flavor, ScopeKind};
use crate::observer::{IncantObserver, Observers};
use crate::registration::{HookSet, Registry, Rule, SnapshotId, Supply};
use crate::resolver::Resolver;

use invoke::IncantCache;

/// Per-composition options for [`Incanter::compose_with`].
///
/// # Examples
///
/// ```rust
/// use ferrous_incant::{ComposeOptions, Flavor, Hook, HookSet, Callable};
///
/// let audit = Callable::from_fn0("audit", || ());
/// let options = ComposeOptions::new()
///     .flavor(Flavor::Sync)
///     .hooks(HookSet::new().with(Hook::for_name("user", None)))
///     .force(audit);
/// # let _ = options;
/// ```
#[derive(Clone, Default)]
pub struct ComposeOptions {
    hooks: Option<HookSet>,
    flavor: Flavor,
    forced: Vec<(Callable, ScopeKind)>,
}

impl ComposeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides matched before the registry, on the target's own parameters.
    pub fn hooks(mut self, hooks: HookSet) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// Runs `factory` before the target on every call, discarding its result.
    pub fn force(self, factory: Callable) -> Self {
        self.force_scoped(factory, ScopeKind::None)
    }

    /// Like [`force`](Self::force), declaring the factory's scope kind.
    pub fn force_scoped(mut self, factory: Callable, scope: ScopeKind) -> Self {
        self.forced.push((factory, scope));
        self
    }
}

/// Registry of rules plus a cache of the callables composed against it.
///
/// Registration takes `&mut self` and is expected at setup time; composition
/// and invocation take `&self` and are safe to share across threads. Clones
/// share the composition cache.
///
/// # Examples
///
/// ```rust
/// use ferrous_incant::{Incanter, Callable, CallArgs, Supply, ValueExt};
///
/// let mut incanter = Incanter::new();
/// incanter.register_by_name("dep1", Supply::value(2i64));
/// incanter.register_by_name("dep2", Callable::from_fn1("dep2", "dep1", |d: i64| d * 10));
///
/// let target = Callable::from_fn2("target", ["dep1", "dep2"], |a: i64, b: i64| a + b);
/// let out = incanter.call(&target, CallArgs::new()).unwrap();
/// assert_eq!(out.get::<i64>().unwrap(), 22);
/// ```
#[derive(Clone)]
pub struct Incanter {
    registry: Registry,
    cache: Arc<CompositionCache>,
    incants: Arc<IncantCache>,
    observers: Arc<Observers>,
    config: IncanterConfig,
}

impl Default for Incanter {
    fn default() -> Self {
        Self::new()
    }
}

impl Incanter {
    pub fn new() -> Self {
        Self::with_config(IncanterConfig::default())
    }

    pub fn with_config(config: IncanterConfig) -> Self {
        Incanter {
            registry: Registry::new(),
            cache: Arc::new(CompositionCache::new()),
            incants: Arc::new(IncantCache::new()),
            observers: Arc::new(Observers::new()),
            config,
        }
    }

    pub fn config(&self) -> &IncanterConfig {
        &self.config
    }

    /// Identity of the current set of rules.
    pub fn snapshot(&self) -> SnapshotId {
        self.registry.snapshot()
    }

    /// Number of registered rules.
    pub fn rule_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of cached compositions.
    pub fn cached_compositions(&self) -> usize {
        self.cache.len()
    }

    /// Drops every cached composition and incant plan.
    ///
    /// Callables composed afterwards are new objects.
    pub fn clear_cache(&self) {
        self.cache.clear();
        self.incants.clear();
    }

    /// Adds an observer for compositions composed from now on.
    pub fn add_observer(&mut self, observer: Arc<dyn IncantObserver>) -> &mut Self {
        Arc::make_mut(&mut self.observers).add(observer);
        self
    }

    /// Registers a rule. Rules registered later take precedence.
    ///
    /// `factory_of` receives the matched parameter and returns the factory
    /// that satisfies it. `scope` declares whether that factory is a scoped
    /// resource; [`ScopeKind::None`] infers it from the factory.
    pub fn register<P, F>(&mut self, predicate: P, factory_of: F, scope: ScopeKind) -> &mut Self
    where
        P: Fn(&Param) -> bool + Send + Sync + 'static,
        F: Fn(&Param) -> Callable + Send + Sync + 'static,
    {
        self.registry.push(Rule::new(predicate, factory_of, scope));
        tracing::debug!(rules = self.registry.len(), "registered rule");
        self
    }

    /// Registers `factory` for every parameter matching `predicate`.
    pub fn register_hook<P>(&mut self, predicate: P, factory: Callable, scope: ScopeKind) -> &mut Self
    where
        P: Fn(&Param) -> bool + Send + Sync + 'static,
    {
        self.register(predicate, move |_| factory.clone(), scope)
    }

    /// Satisfies parameters called `name`.
    pub fn register_by_name(&mut self, name: impl Into<String>, supply: impl Into<Supply>) -> &mut Self {
        let name = name.into();
        let factory = supply.into().into_callable(name.clone());
        self.register_hook(move |p| p.name() == name, factory, ScopeKind::None)
    }

    /// Satisfies parameters called like the factory itself.
    pub fn register_by_own_name(&mut self, factory: &Callable) -> &mut Self {
        let name = factory.name().to_string();
        self.register_by_name(name, factory)
    }

    /// Satisfies parameters declared as `T`.
    pub fn register_by_type<T: ?Sized + 'static>(&mut self, supply: impl Into<Supply>) -> &mut Self {
        let ty = type_key::<T>();
        let factory = supply.into().into_callable(ty.name());
        self.register_hook(move |p| p.declared_type() == Some(ty), factory, ScopeKind::None)
    }

    /// Satisfies parameters declared as the factory's return type.
    pub fn register_by_return_type(&mut self, factory: &Callable) -> IncantResult<&mut Self> {
        let ty = factory
            .signature()
            .return_type()
            .ok_or_else(|| IncantError::NoReturnType(factory.name().to_string()))?;
        Ok(self.register_hook(
            move |p| p.declared_type() == Some(ty),
            factory.clone(),
            ScopeKind::None,
        ))
    }

    /// Registers a constant for parameters declared as `T`.
    pub fn register_value<T: Any + Send + Sync>(&mut self, v: T) -> &mut Self {
        self.register_by_type::<T>(Supply::value(v))
    }

    /// Composes `target` against the current rules.
    ///
    /// Returns `target` itself when no parameter can be satisfied. The result
    /// is cached: composing the same target against the same rules returns
    /// the identical callable.
    pub fn compose(&self, target: &Callable) -> IncantResult<Callable> {
        self.compose_with(target, ComposeOptions::default())
    }

    /// Composes `target` with per-composition hooks, flavor and forced
    /// dependencies.
    pub fn compose_with(&self, target: &Callable, options: ComposeOptions) -> IncantResult<Callable> {
        let inputs = CacheInputs {
            target: target.clone(),
            snapshot: self.registry.snapshot(),
            hooks: options.hooks,
            observers: self.observers.clone(),
            flavor: options.flavor,
            forced: options.forced,
        };

        let key = if self.config.cache_compositions {
            let key = inputs.key();
            if let Some(composed) = self.cache.get(&key) {
                tracing::trace!(callable = target.name(), "composition cache hit");
                return Ok(composed);
            }
            Some(key)
        } else {
            None
        };

        let graph = Resolver::new(&self.registry, inputs.hooks.as_ref(), self.config.max_depth)
            .resolve(target, &inputs.forced)?;
        let composed = composer::compose(graph, inputs.flavor, self.observers.clone())?;

        Ok(match key {
            Some(key) => self.cache.insert(key, inputs, composed),
            None => composed,
        })
    }
}
