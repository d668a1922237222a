//! Diagnostic observers for composition and invocation.
//!
//! Observers receive events when a target is composed, when a composed call
//! finishes, and when scoped resources are entered and released. They are
//! useful for tracing which factories a composition wired in and for
//! debugging cleanup order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::IncantError;
use crate::kind::Exit;

/// Observer trait for composition events.
///
/// # Performance
///
/// Observer calls are made synchronously on the calling thread. Keep
/// implementations lightweight.
///
/// # Examples
///
/// ```
/// use ferrous_incant::{IncantObserver, Incanter};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// struct PrintObserver;
///
/// impl IncantObserver for PrintObserver {
///     fn composed(&self, target: &str, factories: usize, is_async: bool, elapsed: Duration) {
///         println!("composed {} ({} factories, async: {}) in {:?}", target, factories, is_async, elapsed);
///     }
/// }
///
/// let mut incanter = Incanter::new();
/// incanter.add_observer(Arc::new(PrintObserver));
/// ```
pub trait IncantObserver: Send + Sync {
    /// A composition was built (not served from the cache).
    fn composed(&self, target: &str, factories: usize, is_async: bool, elapsed: Duration) {
        let _ = (target, factories, is_async, elapsed);
    }

    /// A composed call finished, successfully or not.
    fn call_finished(&self, target: &str, elapsed: Duration, error: Option<&IncantError>) {
        let _ = (target, elapsed, error);
    }

    /// A scoped resource was entered.
    fn entered(&self, resource: &str) {
        let _ = resource;
    }

    /// A scoped resource was released with `exit`.
    fn released(&self, resource: &str, exit: Exit, error: Option<&IncantError>) {
        let _ = (resource, exit, error);
    }
}

#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn IncantObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn IncantObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn composed(&self, target: &str, factories: usize, is_async: bool, elapsed: Duration) {
        for observer in &self.observers {
            observer.composed(target, factories, is_async, elapsed);
        }
    }

    #[inline]
    pub(crate) fn call_finished(&self, target: &str, elapsed: Duration, error: Option<&IncantError>) {
        for observer in &self.observers {
            observer.call_finished(target, elapsed, error);
        }
    }

    #[inline]
    pub(crate) fn entered(&self, resource: &str) {
        for observer in &self.observers {
            observer.entered(resource);
        }
    }

    #[inline]
    pub(crate) fn released(&self, resource: &str, exit: Exit, error: Option<&IncantError>) {
        for observer in &self.observers {
            observer.released(resource, exit, error);
        }
    }
}

/// Emits every event as a `tracing` event.
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self {
            prefix: "ferrous-incant".to_string(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl IncantObserver for LoggingObserver {
    fn composed(&self, target: &str, factories: usize, is_async: bool, elapsed: Duration) {
        tracing::info!(
            prefix = self.prefix.as_str(),
            callable = target,
            factories,
            is_async,
            ?elapsed,
            "composed"
        );
    }

    fn call_finished(&self, target: &str, elapsed: Duration, error: Option<&IncantError>) {
        match error {
            None => tracing::debug!(prefix = self.prefix.as_str(), callable = target, ?elapsed, "call finished"),
            Some(e) => tracing::warn!(
                prefix = self.prefix.as_str(),
                callable = target,
                ?elapsed,
                error = %e,
                "call failed"
            ),
        }
    }

    fn entered(&self, resource: &str) {
        tracing::trace!(prefix = self.prefix.as_str(), resource, "entered");
    }

    fn released(&self, resource: &str, exit: Exit, error: Option<&IncantError>) {
        match error {
            None => tracing::trace!(prefix = self.prefix.as_str(), resource, ?exit, "released"),
            Some(e) => tracing::warn!(
                prefix = self.prefix.as_str(),
                resource,
                ?exit,
                error = %e,
                "release failed"
            ),
        }
    }
}

/// Counts events with relaxed atomics.
///
/// # Examples
///
/// ```
/// use ferrous_incant::{Incanter, MetricsObserver, Callable, CallArgs};
/// use std::sync::Arc;
///
/// let metrics = Arc::new(MetricsObserver::new());
/// let mut incanter = Incanter::new();
/// incanter.add_observer(metrics.clone());
///
/// incanter.register_value(40u32);
///
/// let target = Callable::from_fn1("answer", "base", |base: u32| base + 2);
/// incanter.call(&target, CallArgs::new()).unwrap();
/// assert_eq!(metrics.composition_count(), 1);
/// assert_eq!(metrics.call_count(), 1);
/// ```
#[derive(Default)]
pub struct MetricsObserver {
    compositions: AtomicU64,
    calls: AtomicU64,
    failures: AtomicU64,
    total_call_time: AtomicU64,
    entered: AtomicU64,
    released: AtomicU64,
    release_failures: AtomicU64,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn composition_count(&self) -> u64 {
        self.compositions.load(Ordering::Relaxed)
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn entered_count(&self) -> u64 {
        self.entered.load(Ordering::Relaxed)
    }

    pub fn released_count(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }

    pub fn release_failure_count(&self) -> u64 {
        self.release_failures.load(Ordering::Relaxed)
    }

    /// Resources entered but not yet released.
    pub fn open_resources(&self) -> u64 {
        self.entered_count().saturating_sub(self.released_count())
    }

    pub fn average_call_time(&self) -> Option<Duration> {
        let count = self.call_count();
        if count == 0 {
            return None;
        }
        let total_ns = self.total_call_time.load(Ordering::Relaxed);
        Some(Duration::from_nanos(total_ns / count))
    }

    pub fn reset(&self) {
        for counter in [
            &self.compositions,
            &self.calls,
            &self.failures,
            &self.total_call_time,
            &self.entered,
            &self.released,
            &self.release_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl IncantObserver for MetricsObserver {
    fn composed(&self, _target: &str, _factories: usize, _is_async: bool, _elapsed: Duration) {
        self.compositions.fetch_add(1, Ordering::Relaxed);
    }

    fn call_finished(&self, _target: &str, elapsed: Duration, error: Option<&IncantError>) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.total_call_time
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
        if error.is_some() {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn entered(&self, _resource: &str) {
        self.entered.fetch_add(1, Ordering::Relaxed);
    }

    fn released(&self, _resource: &str, _exit: Exit, error: Option<&IncantError>) {
        self.released.fetch_add(1, Ordering::Relaxed);
        if error.is_some() {
            self.release_failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_observer_counts() {
        let metrics = MetricsObserver::new();
        metrics.entered("db");
        metrics.entered("tx");
        metrics.released("tx", Exit::Completed, None);
        assert_eq!(metrics.open_resources(), 1);

        metrics.call_finished("t", Duration::from_millis(2), None);
        metrics.call_finished("t", Duration::from_millis(4), Some(&IncantError::Cancelled));
        assert_eq!(metrics.call_count(), 2);
        assert_eq!(metrics.failure_count(), 1);
        assert_eq!(metrics.average_call_time(), Some(Duration::from_millis(3)));

        metrics.reset();
        assert_eq!(metrics.call_count(), 0);
        assert_eq!(metrics.average_call_time(), None);
    }

    #[test]
    fn test_observers_fan_out() {
        let a = Arc::new(MetricsObserver::new());
        let b = Arc::new(MetricsObserver::new());
        let mut observers = Observers::new();
        assert!(!observers.has_observers());
        observers.add(a.clone());
        observers.add(b.clone());
        observers.composed("t", 3, false, Duration::ZERO);
        assert_eq!(a.composition_count(), 1);
        assert_eq!(b.composition_count(), 1);
    }
}
