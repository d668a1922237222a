//! Rules, the rule registry, and per-composition hooks.

use std::any::Any;
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::callable::Callable;
use crate::descriptors::Param;
use crate::key::{type_key, TypeKey};
use crate::kind::ScopeKind;
use crate::value::{value, Value};

/// Predicate over a parameter descriptor.
pub type Predicate = Arc<dyn Fn(&Param) -> bool + Send + Sync>;

/// Produces the factory satisfying a matched parameter.
pub type FactoryOf = Arc<dyn Fn(&Param) -> Callable + Send + Sync>;

static NEXT_SNAPSHOT: AtomicU64 = AtomicU64::new(1);

/// Identity of one state of a registry.
///
/// Process-unique: every registration on any registry yields a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotId(u64);

impl SnapshotId {
    fn next() -> Self {
        SnapshotId(NEXT_SNAPSHOT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A predicate paired with a factory generator. Immutable once created.
#[derive(Clone)]
pub struct Rule {
    predicate: Predicate,
    factory_of: FactoryOf,
    scope: ScopeKind,
}

impl Rule {
    pub fn new<P, F>(predicate: P, factory_of: F, scope: ScopeKind) -> Self
    where
        P: Fn(&Param) -> bool + Send + Sync + 'static,
        F: Fn(&Param) -> Callable + Send + Sync + 'static,
    {
        Rule {
            predicate: Arc::new(predicate),
            factory_of: Arc::new(factory_of),
            scope,
        }
    }

    pub fn matches(&self, param: &Param) -> bool {
        (self.predicate)(param)
    }

    pub fn factory_for(&self, param: &Param) -> Callable {
        (self.factory_of)(param)
    }

    pub fn scope(&self) -> ScopeKind {
        self.scope
    }
}

/// What a registration provides: a ready factory or a bare value.
///
/// Bare values are wrapped into a zero-argument factory.
///
/// # Examples
///
/// ```rust
/// use ferrous_incant::{Supply, Callable};
///
/// let from_value = Supply::value(5u32);
/// let from_factory: Supply = Callable::from_fn0("five", || 5u32).into();
/// # let _ = (from_value, from_factory);
/// ```
#[derive(Clone)]
pub enum Supply {
    /// A factory callable
    Factory(Callable),
    /// A constant, with its type when known
    Value(Value, Option<TypeKey>),
}

impl Supply {
    pub fn value<T: Any + Send + Sync>(v: T) -> Self {
        Supply::Value(value(v), Some(type_key::<T>()))
    }

    pub(crate) fn into_callable(self, name: impl Into<Cow<'static, str>>) -> Callable {
        match self {
            Supply::Factory(f) => f,
            Supply::Value(v, ty) => Callable::constant_value(name, v, ty),
        }
    }
}

impl From<Callable> for Supply {
    fn from(f: Callable) -> Self {
        Supply::Factory(f)
    }
}

impl From<&Callable> for Supply {
    fn from(f: &Callable) -> Self {
        Supply::Factory(f.clone())
    }
}

/// Ordered rule collection, searched newest to oldest.
#[derive(Clone)]
pub(crate) struct Registry {
    rules: Vec<Rule>,
    snapshot: SnapshotId,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Registry {
            rules: Vec::new(),
            snapshot: SnapshotId::next(),
        }
    }

    /// Adds a rule in front of every existing one.
    pub(crate) fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
        self.snapshot = SnapshotId::next();
    }

    pub(crate) fn snapshot(&self) -> SnapshotId {
        self.snapshot
    }

    pub(crate) fn len(&self) -> usize {
        self.rules.len()
    }

    /// First matching rule, newest first.
    pub(crate) fn lookup(&self, param: &Param) -> Option<&Rule> {
        self.rules.iter().rev().find(|rule| rule.matches(param))
    }
}

/// A per-composition override matched before the registry.
///
/// A hook without a factory pins the parameter to a caller-supplied value,
/// even when a registered rule would satisfy it.
#[derive(Clone)]
pub struct Hook {
    predicate: Predicate,
    factory: Option<(FactoryOf, ScopeKind)>,
}

impl Hook {
    /// A hook with a constant factory, or a pin if `factory` is `None`.
    pub fn new<P>(predicate: P, factory: Option<Callable>) -> Self
    where
        P: Fn(&Param) -> bool + Send + Sync + 'static,
    {
        Hook {
            predicate: Arc::new(predicate),
            factory: factory.map(|f| {
                let factory_of: FactoryOf = Arc::new(move |_: &Param| f.clone());
                (factory_of, ScopeKind::None)
            }),
        }
    }

    /// A hook with a factory generator and a declared scope kind.
    pub fn with_factory_of<P, F>(predicate: P, factory_of: F, scope: ScopeKind) -> Self
    where
        P: Fn(&Param) -> bool + Send + Sync + 'static,
        F: Fn(&Param) -> Callable + Send + Sync + 'static,
    {
        Hook {
            predicate: Arc::new(predicate),
            factory: Some((Arc::new(factory_of), scope)),
        }
    }

    /// Matches parameters called `name`.
    pub fn for_name(name: impl Into<String>, factory: Option<Callable>) -> Self {
        let name = name.into();
        Self::new(move |p| p.name() == name, factory)
    }

    /// Matches parameters declared as exactly `T`.
    pub fn for_type<T: ?Sized + 'static>(factory: Option<Callable>) -> Self {
        let ty = type_key::<T>();
        Self::new(move |p| p.declared_type() == Some(ty), factory)
    }

    pub(crate) fn matches(&self, param: &Param) -> bool {
        (self.predicate)(param)
    }
}

/// An ordered set of hooks; later hooks take precedence.
///
/// Cloning shares the set, and the shared set's identity is part of the
/// composition cache key.
///
/// # Examples
///
/// ```rust
/// use ferrous_incant::{Hook, HookSet, Callable};
///
/// let hooks = HookSet::new()
///     .with(Hook::for_name("dep1", Some(Callable::from_fn0("zero", || 0i64))))
///     .with(Hook::for_name("input", None));
/// assert_eq!(hooks.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct HookSet {
    hooks: Arc<Vec<Hook>>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a hook that takes precedence over the ones already present.
    pub fn with(mut self, hook: Hook) -> Self {
        Arc::make_mut(&mut self.hooks).push(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.hooks) as usize
    }

    /// First matching hook, newest first.
    pub(crate) fn lookup(&self, param: &Param) -> Option<Option<(Callable, ScopeKind)>> {
        self.hooks
            .iter()
            .rev()
            .find(|hook| hook.matches(param))
            .map(|hook| {
                hook.factory
                    .as_ref()
                    .map(|(factory_of, scope)| (factory_of(param), *scope))
            })
    }
}

impl FromIterator<Hook> for HookSet {
    fn from_iter<I: IntoIterator<Item = Hook>>(iter: I) -> Self {
        HookSet {
            hooks: Arc::new(iter.into_iter().collect()),
        }
    }
}
