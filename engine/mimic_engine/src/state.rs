//! Per-operation clone state: the identity map.
//!
//! One `CloneState` is created per top-level clone invocation and
//! threaded by `&mut` through every recursive sub-clone, then dropped.
//! It is never global, never thread-local and never shared across
//! threads; that keeps the engine reentrant and the traversal testable.
//!
//! Keys are heap addresses (`Shared`/`Arc` allocation pointers), so the
//! map preserves *identity*, not equality: two distinct but equal
//! objects stay distinct in the clone, and one object referenced from
//! many slots is cloned exactly once.

use rustc_hash::FxHashMap;

use mimic_value::Value;

/// Identity map scoped to a single top-level clone operation.
#[derive(Default)]
pub struct CloneState {
    known: FxHashMap<usize, Value>,
}

impl CloneState {
    pub fn new() -> Self {
        CloneState::default()
    }

    /// Counterpart already produced for the source at `addr`, if any.
    pub fn lookup(&self, addr: usize) -> Option<Value> {
        self.known.get(&addr).cloned()
    }

    /// Record the (possibly still in-progress) counterpart for the
    /// source at `addr`. Recording before the target's fields are
    /// filled is what resolves self-cycles.
    pub fn record(&mut self, addr: usize, target: Value) {
        self.known.insert(addr, target);
    }

    /// Number of distinct source references seen so far.
    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}
