//! Running a plan: materialize factories in order, call the target, unwind.

use std::sync::Arc;
use std::time::Instant;

use super::{gather, Plan};
use crate::callable::BoxFuture;
use crate::error::{IncantError, IncantResult};
use crate::internal::UnwindStack;
use crate::kind::ScopeKind;
use crate::value::Value;

#[cfg(feature = "async")]
use crate::cancellation::CancellationToken;

impl Plan {
    /// Runs the plan to completion on the calling thread.
    pub(crate) fn run_sync(&self, outer: Vec<Value>) -> IncantResult<Value> {
        let started = Instant::now();
        let mut unwind = UnwindStack::new(self.observers.clone());
        let result = self.drive_sync(&outer, &mut unwind);
        let result = unwind.unwind_sync(result);
        self.finish(started, &result);
        result
    }

    fn drive_sync(&self, outer: &[Value], unwind: &mut UnwindStack) -> IncantResult<Value> {
        let mut slots: Vec<Value> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let args = gather(&step.inputs, outer, &slots);
            let produced = match step.scope {
                ScopeKind::None => step.factory.invoke_sync(args)?,
                ScopeKind::Sync => {
                    let (v, release) = step.factory.enter_sync(args)?.into_parts();
                    unwind.push_sync(step.factory.name(), release);
                    v
                }
                ScopeKind::Async => {
                    return Err(IncantError::NotSync(step.factory.name().to_string()))
                }
            };
            tracing::trace!(factory = step.factory.name(), forced = step.forced, "materialized");
            slots.push(produced);
        }
        let args = gather(&self.target_inputs, outer, &slots);
        self.target.invoke_sync(args)
    }

    /// Runs the plan, suspending at every async factory, resource and the
    /// target.
    ///
    /// Dropping the returned future before completion releases whatever was
    /// entered with [`Exit::Cancelled`](crate::Exit::Cancelled).
    pub(crate) fn run_async(
        self: Arc<Self>,
        outer: Vec<Value>,
    ) -> BoxFuture<'static, IncantResult<Value>> {
        Box::pin(async move {
            let started = Instant::now();
            let mut unwind = UnwindStack::new(self.observers.clone());
            let result = self.drive_async(&outer, &mut unwind).await;
            let result = unwind.unwind_async(result).await;
            self.finish(started, &result);
            result
        })
    }

    /// Like [`run_async`](Self::run_async), aborting once `token` is cancelled.
    ///
    /// Entered resources are released before this future completes.
    #[cfg(feature = "async")]
    pub(crate) fn run_async_cancellable(
        self: Arc<Self>,
        outer: Vec<Value>,
        token: CancellationToken,
    ) -> BoxFuture<'static, IncantResult<Value>> {
        Box::pin(async move {
            let started = Instant::now();
            let mut unwind = UnwindStack::new(self.observers.clone());
            let result = if token.is_cancelled() {
                Err(IncantError::Cancelled)
            } else {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(IncantError::Cancelled),
                    r = self.drive_async(&outer, &mut unwind) => r,
                }
            };
            if matches!(result, Err(IncantError::Cancelled)) {
                tracing::debug!(callable = self.target().name(), "composed call cancelled");
            }
            let result = unwind.unwind_async(result).await;
            self.finish(started, &result);
            result
        })
    }

    async fn drive_async(&self, outer: &[Value], unwind: &mut UnwindStack) -> IncantResult<Value> {
        let mut slots: Vec<Value> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let args = gather(&step.inputs, outer, &slots);
            let produced = match step.scope {
                ScopeKind::None => step.factory.invoke_async(args).await?,
                ScopeKind::Sync => {
                    let (v, release) = step.factory.enter_sync(args)?.into_parts();
                    unwind.push_sync(step.factory.name(), release);
                    v
                }
                ScopeKind::Async => {
                    let (v, release) = step.factory.enter_async(args).await?.into_parts();
                    unwind.push_async(step.factory.name(), release);
                    v
                }
            };
            tracing::trace!(factory = step.factory.name(), forced = step.forced, "materialized");
            slots.push(produced);
        }
        let args = gather(&self.target_inputs, outer, &slots);
        self.target.invoke_async(args).await
    }

    fn finish(&self, started: Instant, result: &IncantResult<Value>) {
        if self.observers.has_observers() {
            self.observers
                .call_finished(self.target.name(), started.elapsed(), result.as_ref().err());
        }
    }
}
