//! Release stack for entered scoped resources.

use std::sync::Arc;

use crate::callable::{AsyncRelease, SyncRelease};
use crate::error::{IncantError, IncantResult};
use crate::kind::Exit;
use crate::observer::Observers;

enum Entry {
    Sync { name: String, release: SyncRelease },
    Async { name: String, release: AsyncRelease },
}

/// Entered scoped resources of one composed call, released LIFO.
///
/// Sync and async entries share one stack so release order is strictly the
/// reverse of entry order across both kinds. Entries still present when the
/// stack is dropped (a cancelled future, a panic) are released from `Drop`.
pub(crate) struct UnwindStack {
    entries: Vec<Entry>,
    observers: Arc<Observers>,
}

impl UnwindStack {
    pub(crate) fn new(observers: Arc<Observers>) -> Self {
        UnwindStack {
            entries: Vec::new(),
            observers,
        }
    }

    pub(crate) fn push_sync(&mut self, name: &str, release: SyncRelease) {
        self.observers.entered(name);
        self.entries.push(Entry::Sync {
            name: name.to_string(),
            release,
        });
    }

    pub(crate) fn push_async(&mut self, name: &str, release: AsyncRelease) {
        self.observers.entered(name);
        self.entries.push(Entry::Async {
            name: name.to_string(),
            release,
        });
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Releases everything in reverse order, then settles `result` with any
    /// release failures.
    pub(crate) fn unwind_sync<T>(&mut self, result: IncantResult<T>) -> IncantResult<T> {
        let mut exit = exit_for(&result);
        let mut failures = Vec::new();
        while let Some(entry) = self.entries.pop() {
            let (name, outcome) = match entry {
                Entry::Sync { name, release } => {
                    let outcome = release(exit);
                    (name, outcome)
                }
                Entry::Async { name, .. } => {
                    // The composer never pushes async entries into a sync plan.
                    let outcome = Err(IncantError::NotSync(name.clone()));
                    (name, outcome)
                }
            };
            self.record(&name, exit, outcome, &mut exit, &mut failures);
        }
        settle(result, failures)
    }

    /// Async counterpart of [`unwind_sync`](Self::unwind_sync).
    pub(crate) async fn unwind_async<T>(&mut self, result: IncantResult<T>) -> IncantResult<T> {
        let mut exit = exit_for(&result);
        let mut failures = Vec::new();
        while let Some(entry) = self.entries.pop() {
            let (name, outcome) = match entry {
                Entry::Sync { name, release } => {
                    let outcome = release(exit);
                    (name, outcome)
                }
                Entry::Async { name, release } => {
                    let outcome = release(exit).await;
                    (name, outcome)
                }
            };
            self.record(&name, exit, outcome, &mut exit, &mut failures);
        }
        settle(result, failures)
    }

    fn record(
        &self,
        name: &str,
        seen: Exit,
        outcome: IncantResult<()>,
        exit: &mut Exit,
        failures: &mut Vec<IncantError>,
    ) {
        match outcome {
            Ok(()) => self.observers.released(name, seen, None),
            Err(e) => {
                tracing::debug!(resource = name, error = %e, "scoped resource failed to release");
                self.observers.released(name, seen, Some(&e));
                // Outer resources observe the failure of inner ones.
                if *exit == Exit::Completed {
                    *exit = Exit::Failed;
                }
                failures.push(e);
            }
        }
    }
}

impl Drop for UnwindStack {
    fn drop(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let exit = if std::thread::panicking() {
            Exit::Failed
        } else {
            Exit::Cancelled
        };
        let entries = std::mem::take(&mut self.entries);
        let observers = self.observers.clone();
        tracing::debug!(
            count = entries.len(),
            ?exit,
            "releasing scoped resources of an abandoned call"
        );

        let all_sync = entries.iter().all(|e| matches!(e, Entry::Sync { .. }));
        if !all_sync {
            #[cfg(feature = "async")]
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    for entry in entries.into_iter().rev() {
                        let (name, outcome) = match entry {
                            Entry::Sync { name, release } => {
                                let outcome = release(exit);
                                (name, outcome)
                            }
                            Entry::Async { name, release } => {
                                let outcome = release(exit).await;
                                (name, outcome)
                            }
                        };
                        report_abandoned(&observers, &name, exit, outcome);
                    }
                });
                return;
            }
        }

        for entry in entries.into_iter().rev() {
            match entry {
                Entry::Sync { name, release } => {
                    let outcome = release(exit);
                    report_abandoned(&observers, &name, exit, outcome);
                }
                Entry::Async { name, .. } => {
                    tracing::warn!(
                        resource = name.as_str(),
                        "no async runtime available; async scoped resource was not released"
                    );
                }
            }
        }
    }
}

fn report_abandoned(observers: &Observers, name: &str, exit: Exit, outcome: IncantResult<()>) {
    match outcome {
        Ok(()) => observers.released(name, exit, None),
        Err(e) => {
            tracing::warn!(resource = name, error = %e, "scoped resource failed to release");
            observers.released(name, exit, Some(&e));
        }
    }
}

fn exit_for<T>(result: &IncantResult<T>) -> Exit {
    match result {
        Ok(_) => Exit::Completed,
        Err(IncantError::Cancelled) => Exit::Cancelled,
        Err(_) => Exit::Failed,
    }
}

/// Combines a call result with release failures.
pub(crate) fn settle<T>(result: IncantResult<T>, failures: Vec<IncantError>) -> IncantResult<T> {
    if failures.is_empty() {
        return result;
    }
    match result {
        Ok(_) => Err(IncantError::Release(failures)),
        Err(error) => Err(IncantError::Unwind {
            error: Box::new(error),
            release: failures,
        }),
    }
}
