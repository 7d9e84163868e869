//! Process-wide strategy cache.
//!
//! Memoizes synthesized strategies by `(type, mode)`. The map holds a
//! once-cell per key: inserting the cell is a short sharded map
//! operation, and synthesis runs inside `OnceLock::get_or_init`, so a
//! given key is built exactly once even under a concurrent first use,
//! serialized per key rather than globally; unrelated types build in
//! parallel. Synthesis itself never calls back into the cache, so the
//! per-key initialization is never re-entered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::trace;

use mimic_value::{TypeId, TypeRegistry};

use crate::plan::{synthesize, CloneMode, CloneStrategy};
use crate::safety::SafetyClassifier;

type Key = (TypeId, CloneMode);

/// Concurrency-safe memoization of clone strategies.
#[derive(Default)]
pub struct StrategyCache {
    strategies: DashMap<Key, Arc<OnceLock<Arc<CloneStrategy>>>>,
    /// Number of syntheses actually run; lets tests verify the
    /// at-most-once-per-key property under concurrency.
    synth_count: AtomicU64,
}

impl StrategyCache {
    pub fn new() -> Self {
        StrategyCache::default()
    }

    /// Fetch the strategy for `(ty, mode)`, synthesizing it on first
    /// demand.
    pub fn get_or_build(
        &self,
        registry: &TypeRegistry,
        safety: &SafetyClassifier,
        ty: TypeId,
        mode: CloneMode,
    ) -> Arc<CloneStrategy> {
        let cell = self
            .strategies
            .entry((ty, mode))
            .or_insert_with(|| Arc::new(OnceLock::new()))
            .clone();
        cell.get_or_init(|| {
            self.synth_count.fetch_add(1, Ordering::Relaxed);
            Arc::new(synthesize(registry, safety, ty, mode))
        })
        .clone()
    }

    /// Number of syntheses performed since creation or the last reset.
    pub fn synth_count(&self) -> u64 {
        self.synth_count.load(Ordering::Relaxed)
    }

    /// Number of memoized strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Drop every memoized strategy. For policy reconfiguration only;
    /// must not race live clone operations.
    pub fn reset(&self) {
        trace!("clearing strategy cache");
        self.strategies.clear();
        self.synth_count.store(0, Ordering::Relaxed);
    }
}
