//! Memoization of composed callables.
//!
//! Entries are keyed by the identities of everything a composition depends
//! on. Composition is a pure function of those inputs, so entries are never
//! invalidated; a registry change produces a new snapshot id and therefore a
//! new key.

use std::sync::Arc;

use crate::callable::Callable;
use crate::key::CallableId;
use crate::kind::{Flavor, ScopeKind};
use crate::observer::Observers;
use crate::registration::{HookSet, SnapshotId};

#[cfg(feature = "ahash")]
pub(crate) type Map<K, V> = ahash::AHashMap<K, V>;
#[cfg(not(feature = "ahash"))]
pub(crate) type Map<K, V> = std::collections::HashMap<K, V>;

#[cfg(feature = "parking-lot")]
pub(crate) type Lock<T> = parking_lot::RwLock<T>;
#[cfg(not(feature = "parking-lot"))]
pub(crate) type Lock<T> = std::sync::RwLock<T>;

#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    target: CallableId,
    snapshot: SnapshotId,
    hooks: usize,
    observers: usize,
    flavor: Flavor,
    forced: Vec<(CallableId, ScopeKind)>,
}

/// Inputs of one composition. Held by the cache entry so the identities in
/// its key stay allocated, and therefore unique, for as long as it lives.
pub(crate) struct CacheInputs {
    pub(crate) target: Callable,
    pub(crate) snapshot: SnapshotId,
    pub(crate) hooks: Option<HookSet>,
    pub(crate) observers: Arc<Observers>,
    pub(crate) flavor: Flavor,
    pub(crate) forced: Vec<(Callable, ScopeKind)>,
}

impl CacheInputs {
    pub(crate) fn key(&self) -> CacheKey {
        CacheKey {
            target: self.target.id(),
            snapshot: self.snapshot,
            hooks: self.hooks.as_ref().map_or(0, HookSet::id),
            observers: Arc::as_ptr(&self.observers) as usize,
            flavor: self.flavor,
            forced: self
                .forced
                .iter()
                .map(|(factory, scope)| (factory.id(), *scope))
                .collect(),
        }
    }
}

struct Entry {
    composed: Callable,
    _inputs: CacheInputs,
}

/// Concurrent map from composition inputs to composed callables.
///
/// Concurrent builders of the same key race only on the work; the first
/// insert wins and every caller gets that callable back.
#[derive(Default)]
pub(crate) struct CompositionCache {
    entries: Lock<Map<CacheKey, Entry>>,
}

impl CompositionCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, key: &CacheKey) -> Option<Callable> {
        read(&self.entries).get(key).map(|e| e.composed.clone())
    }

    /// Stores `composed` unless another thread got there first; returns
    /// whichever callable is now cached.
    pub(crate) fn insert(&self, key: CacheKey, inputs: CacheInputs, composed: Callable) -> Callable {
        let mut entries = write(&self.entries);
        let entry = entries.entry(key).or_insert_with(|| Entry {
            composed,
            _inputs: inputs,
        });
        entry.composed.clone()
    }

    pub(crate) fn len(&self) -> usize {
        read(&self.entries).len()
    }

    pub(crate) fn clear(&self) {
        write(&self.entries).clear();
        tracing::debug!("composition cache cleared");
    }
}

#[cfg(feature = "parking-lot")]
pub(crate) fn read<T>(lock: &Lock<T>) -> parking_lot::RwLockReadGuard<'_, T> {
    lock.read()
}

#[cfg(feature = "parking-lot")]
pub(crate) fn write<T>(lock: &Lock<T>) -> parking_lot::RwLockWriteGuard<'_, T> {
    lock.write()
}

// Entries are inserted whole, so a poisoned map is still consistent.
#[cfg(not(feature = "parking-lot"))]
pub(crate) fn read<T>(lock: &Lock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(not(feature = "parking-lot"))]
pub(crate) fn write<T>(lock: &Lock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
