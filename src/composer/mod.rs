//! Compiles a dependency graph into an executable plan.
//!
//! A [`Plan`] is the ordered list of factory invocations a composed callable
//! performs, plus the wiring of every argument: from an earlier step, from
//! the composed callable's own parameters, or from a private default.

mod exec;

use std::sync::Arc;
use std::time::Instant;

use crate::callable::Callable;
use crate::descriptors::{Param, ParamKind, Signature};
use crate::error::{IncantError, IncantResult};
use crate::kind::{Flavor, ScopeKind};
use crate::observer::Observers;
use crate::resolver::{Binding, DependencyGraph};
use crate::value::Value;

/// Where one argument of a step comes from at call time.
#[derive(Clone)]
pub(crate) enum Source {
    /// Result of step `usize`
    Slot(usize),
    /// Parameter `usize` of the composed signature
    Outer(usize),
    /// A fixed value
    Default(Value),
}

impl Source {
    #[inline]
    fn fetch(&self, outer: &[Value], slots: &[Value]) -> Value {
        match self {
            Source::Slot(ix) => slots[*ix].clone(),
            Source::Outer(ix) => outer[*ix].clone(),
            Source::Default(v) => v.clone(),
        }
    }
}

fn gather(sources: &[Source], outer: &[Value], slots: &[Value]) -> Vec<Value> {
    sources.iter().map(|s| s.fetch(outer, slots)).collect()
}

/// One factory invocation.
pub(crate) struct Step {
    pub(crate) factory: Callable,
    pub(crate) scope: ScopeKind,
    pub(crate) inputs: Vec<Source>,
    pub(crate) forced: bool,
}

/// The compiled form of a composed callable.
pub(crate) struct Plan {
    signature: Signature,
    steps: Vec<Step>,
    target: Callable,
    target_inputs: Vec<Source>,
    is_async: bool,
    observers: Arc<Observers>,
}

impl Plan {
    pub(crate) fn signature(&self) -> &Signature {
        &self.signature
    }

    pub(crate) fn is_async(&self) -> bool {
        self.is_async
    }

    pub(crate) fn target(&self) -> &Callable {
        &self.target
    }
}

/// Turns `graph` into a composed callable of the requested flavor.
///
/// Returns the target itself when the graph has no factories and the flavor
/// does not force a wrapper.
pub(crate) fn compose(
    graph: DependencyGraph,
    flavor: Flavor,
    observers: Arc<Observers>,
) -> IncantResult<Callable> {
    let started = Instant::now();
    let first_async = graph.first_async().map(|c| c.name().to_string());

    if flavor == Flavor::Sync {
        if let Some(node) = first_async.clone() {
            return Err(IncantError::AsyncInSync {
                target: graph.target.name().to_string(),
                node,
            });
        }
    }

    if graph.is_noop() && flavor != Flavor::Async {
        tracing::trace!(callable = graph.target.name(), "nothing to compose, returning target");
        return Ok(graph.target);
    }

    let is_async = flavor == Flavor::Async || first_async.is_some();
    let (signature, outer_index) = outer_signature(&graph);

    let map = |binding: &Binding| match binding {
        Binding::Node(ix) => Source::Slot(*ix),
        Binding::Forwarded(ix) => Source::Outer(outer_index[*ix]),
        Binding::Default(v) => Source::Default(v.clone()),
    };

    let steps: Vec<Step> = graph
        .nodes
        .iter()
        .map(|node| Step {
            factory: node.factory.clone(),
            scope: node.scope,
            inputs: node.inputs.iter().map(map).collect(),
            forced: node.forced,
        })
        .collect();
    let target_inputs = graph.target_inputs.iter().map(map).collect();

    let plan = Plan {
        signature,
        steps,
        target: graph.target.clone(),
        target_inputs,
        is_async,
        observers: observers.clone(),
    };

    let factories = plan.steps.len();
    let composed = Callable::composed(format!("invoke_{}", graph.target.name()), Arc::new(plan));

    tracing::debug!(
        callable = graph.target.name(),
        factories,
        is_async,
        "composed callable"
    );
    observers.composed(graph.target.name(), factories, is_async, started.elapsed());

    Ok(composed)
}

/// Orders forwarded parameters: required positional, defaulted positional,
/// then keyword-only. Returns the signature and each forwarded parameter's
/// position in it.
fn outer_signature(graph: &DependencyGraph) -> (Signature, Vec<usize>) {
    let rank = |p: &Param| match (p.kind(), p.has_default()) {
        (ParamKind::Positional, false) => 0,
        (ParamKind::Positional, true) => 1,
        (ParamKind::KeywordOnly, _) => 2,
    };

    let mut order: Vec<usize> = (0..graph.forwarded.len()).collect();
    order.sort_by_key(|&ix| rank(&graph.forwarded[ix]));

    let mut outer_index = vec![0; graph.forwarded.len()];
    for (position, &ix) in order.iter().enumerate() {
        outer_index[ix] = position;
    }

    let params = order.iter().map(|&ix| graph.forwarded[ix].clone()).collect();
    let signature = Signature::from_params(params, graph.target.signature().return_type());
    (signature, outer_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::MAX_DEPTH;
    use crate::registration::{Registry, Rule};
    use crate::resolver::Resolver;
    use crate::value::value;

    fn registry_with(name: &'static str, factory: Callable) -> Registry {
        let mut registry = Registry::new();
        registry.push(Rule::new(
            move |p| p.name() == name,
            move |_| factory.clone(),
            ScopeKind::None,
        ));
        registry
    }

    #[test]
    fn test_outer_signature_order() {
        let target = Callable::sync(
            "target",
            Signature::new()
                .param(Param::new("a").default_value(1u8))
                .param(Param::new("flag").keyword_only())
                .param(Param::new("b")),
            |_| Ok(value(())),
        );
        let registry = Registry::new();
        let graph = Resolver::new(&registry, None, MAX_DEPTH)
            .resolve(&target, &[])
            .unwrap();

        let (signature, outer_index) = outer_signature(&graph);
        let names: Vec<&str> = signature.params().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["b", "a", "flag"]);
        assert_eq!(outer_index, vec![1, 2, 0]);
    }

    #[test]
    fn test_async_flavor_always_wraps() {
        let target = Callable::from_fn0("target", || 1u8);
        let registry = Registry::new();
        let graph = Resolver::new(&registry, None, MAX_DEPTH)
            .resolve(&target, &[])
            .unwrap();
        let composed = compose(graph, Flavor::Async, Arc::new(Observers::new())).unwrap();
        assert!(!composed.ptr_eq(&target));
        assert!(composed.is_async());
        assert_eq!(composed.name(), "invoke_target");
    }

    #[test]
    fn test_sync_flavor_rejects_async_factory() {
        let dep = Callable::async_fn("dep", Signature::new(), |_| async { Ok(value(1u8)) });
        let registry = registry_with("dep", dep);
        let target = Callable::sync(
            "target",
            Signature::new().param(Param::new("dep")),
            |_| Ok(value(())),
        );
        let graph = Resolver::new(&registry, None, MAX_DEPTH)
            .resolve(&target, &[])
            .unwrap();
        let err = compose(graph, Flavor::Sync, Arc::new(Observers::new()))
            .err()
            .unwrap();
        assert!(matches!(err, IncantError::AsyncInSync { ref node, .. } if node == "dep"));
    }
}
