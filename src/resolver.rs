//! Dependency resolution: from a target and a registry to a dependency graph.
//!
//! The resolver walks the target's parameters in declaration order. Each one
//! is either satisfied by a factory (whose own parameters are resolved the
//! same way) or forwarded to the caller of the composed callable. Factories
//! are visited depth-first and recorded post-order, so the node list is a
//! topological order: dependencies always come before their dependents.

use std::collections::HashMap;

use crate::callable::Callable;
use crate::descriptors::{Param, ParamKind};
use crate::error::{IncantError, IncantResult};
use crate::internal::ResolutionStack;
use crate::key::{CallableId, TypeKey};
use crate::kind::ScopeKind;
use crate::registration::{HookSet, Registry};
use crate::value::Value;

/// Where a parameter's value comes from.
#[derive(Clone)]
pub(crate) enum Binding {
    /// The result of node `usize`
    Node(usize),
    /// Forwarded parameter `usize` of the composed signature
    Forwarded(usize),
    /// The parameter's own default, never exposed to the caller
    Default(Value),
}

/// A factory in the graph, with the effective scope kind it is entered with.
pub(crate) struct FactoryNode {
    pub(crate) factory: Callable,
    pub(crate) scope: ScopeKind,
    pub(crate) inputs: Vec<Binding>,
    pub(crate) forced: bool,
}

/// Result of resolving one target.
pub(crate) struct DependencyGraph {
    pub(crate) target: Callable,
    /// Factories in evaluation order.
    pub(crate) nodes: Vec<FactoryNode>,
    /// Consolidated forwarded parameters, in encounter order.
    pub(crate) forwarded: Vec<Param>,
    pub(crate) target_inputs: Vec<Binding>,
}

impl DependencyGraph {
    /// True when composing would not change anything about the target.
    pub(crate) fn is_noop(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The first async node, or the target itself if it is async.
    pub(crate) fn first_async(&self) -> Option<&Callable> {
        self.nodes
            .iter()
            .map(|node| &node.factory)
            .find(|factory| factory.is_async())
            .or_else(|| Some(&self.target).filter(|t| t.is_async()))
    }
}

/// Builds a [`DependencyGraph`] for one composition.
pub(crate) struct Resolver<'a> {
    registry: &'a Registry,
    hooks: Option<&'a HookSet>,
    stack: ResolutionStack,
    nodes: Vec<FactoryNode>,
    index: HashMap<CallableId, usize>,
    forwarded: Vec<Param>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(registry: &'a Registry, hooks: Option<&'a HookSet>, max_depth: usize) -> Self {
        Resolver {
            registry,
            hooks,
            stack: ResolutionStack::new(max_depth),
            nodes: Vec::new(),
            index: HashMap::new(),
            forwarded: Vec::new(),
        }
    }

    /// Resolves `target`, evaluating `forced` factories first in the given order.
    pub(crate) fn resolve(
        mut self,
        target: &Callable,
        forced: &[(Callable, ScopeKind)],
    ) -> IncantResult<DependencyGraph> {
        self.stack.enter(target.id(), target.name())?;

        for (factory, scope) in forced {
            let ix = self.visit(factory, *scope)?;
            self.nodes[ix].forced = true;
        }

        let mut target_inputs = Vec::with_capacity(target.signature().len());
        for param in target.signature().params() {
            let binding = match self.hooks.and_then(|hooks| hooks.lookup(param)) {
                Some(Some((factory, scope))) => Binding::Node(self.visit(&factory, scope)?),
                Some(None) => self.forward(param)?,
                None => self.bind(param, false)?,
            };
            target_inputs.push(binding);
        }

        self.stack.leave(target.id());

        tracing::trace!(
            callable = target.name(),
            factories = self.nodes.len(),
            forwarded = self.forwarded.len(),
            "resolved dependency graph"
        );

        Ok(DependencyGraph {
            target: target.clone(),
            nodes: self.nodes,
            forwarded: self.forwarded,
            target_inputs,
        })
    }

    /// Binds one parameter against the registry.
    fn bind(&mut self, param: &Param, of_factory: bool) -> IncantResult<Binding> {
        if let Some(rule) = self.registry.lookup(param) {
            let factory = rule.factory_for(param);
            return Ok(Binding::Node(self.visit(&factory, rule.scope())?));
        }
        match param.default() {
            // Keyword-only defaults of factories stay private to the factory.
            Some(default) if of_factory && param.is_keyword_only() => {
                Ok(Binding::Default(default.clone()))
            }
            _ => self.forward(param),
        }
    }

    /// Adds `factory` and its dependencies to the graph, returning its node.
    fn visit(&mut self, factory: &Callable, declared: ScopeKind) -> IncantResult<usize> {
        let id = factory.id();
        if let Some(&ix) = self.index.get(&id) {
            debug_assert!(!self.stack.contains(id));
            // Every rule reaching a shared factory must agree with its kind.
            effective_scope(factory, declared)?;
            return Ok(ix);
        }

        self.stack.enter(id, factory.name())?;
        let scope = effective_scope(factory, declared)?;

        let mut inputs = Vec::with_capacity(factory.signature().len());
        for param in factory.signature().params() {
            inputs.push(self.bind(param, true)?);
        }

        self.stack.leave(id);

        let ix = self.nodes.len();
        self.nodes.push(FactoryNode {
            factory: factory.clone(),
            scope,
            inputs,
            forced: false,
        });
        self.index.insert(id, ix);
        Ok(ix)
    }

    /// Records `param` as forwarded, merging it with a same-named one.
    ///
    /// Types must agree; the most recently encountered default wins.
    fn forward(&mut self, param: &Param) -> IncantResult<Binding> {
        let Some(ix) = self.forwarded.iter().position(|p| p.name() == param.name()) else {
            self.forwarded.push(param.clone());
            return Ok(Binding::Forwarded(self.forwarded.len() - 1));
        };

        let existing = &self.forwarded[ix];
        let ty = reconcile(param.name(), existing.declared_type(), param.declared_type())?;
        let default = param.default().or_else(|| existing.default()).cloned();
        let kind = match (existing.kind(), param.kind()) {
            (ParamKind::KeywordOnly, ParamKind::KeywordOnly) => ParamKind::KeywordOnly,
            _ => ParamKind::Positional,
        };

        let mut merged = Param::new(existing.name().to_string())
            .with_type(ty)
            .with_default(default);
        if kind == ParamKind::KeywordOnly {
            merged = merged.keyword_only();
        }
        self.forwarded[ix] = merged;
        Ok(Binding::Forwarded(ix))
    }
}

fn reconcile(
    name: &str,
    first: Option<TypeKey>,
    second: Option<TypeKey>,
) -> IncantResult<Option<TypeKey>> {
    match (first, second) {
        (Some(a), Some(b)) if a != b => Err(IncantError::TypeConflict {
            name: name.to_string(),
            first: a.name(),
            second: b.name(),
        }),
        (Some(a), _) => Ok(Some(a)),
        (None, b) => Ok(b),
    }
}

/// The scope kind `factory` is entered with under a rule declaring `declared`.
fn effective_scope(factory: &Callable, declared: ScopeKind) -> IncantResult<ScopeKind> {
    let actual = factory.kind();
    match declared {
        ScopeKind::None => Ok(actual.scope_kind()),
        _ if declared == actual.scope_kind() => Ok(declared),
        _ => Err(IncantError::ScopeKindMismatch {
            factory: factory.name().to_string(),
            declared,
            actual,
        }),
    }
}
