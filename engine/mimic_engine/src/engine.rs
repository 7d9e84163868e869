//! Dispatch facade: the four public clone operations.
//!
//! Dispatch order is fixed: null returns null immediately and never
//! touches the caches; a value whose runtime type is safe is returned
//! as-is; everything else resolves a strategy from the cache (building
//! it on first demand) and runs it against the ambient clone state.
//! Resolution always uses the value's actual runtime type, never a
//! declared slot type.
//!
//! Top-level calls create a fresh `CloneState`; recursive sub-clones
//! thread it through explicitly. Each recursion step reserves stack
//! headroom, so pathologically deep graphs grow the stack instead of
//! overflowing it.

use std::sync::Arc;

use smallvec::SmallVec;

use mimic_value::{
    ArrayValue, ObjectValue, Shared, SharedRegistry, StructValue, TupleValue, TypeId, TypeRegistry,
    Value,
};

use crate::cache::StrategyCache;
use crate::errors::{CloneError, CloneResult};
use crate::plan::{ArrayPlan, CloneMode, ClonePlan, CloneStrategy, FieldStep};
use crate::safety::SafetyClassifier;
use crate::stack::ensure_sufficient_stack;
use crate::state::CloneState;

/// The clone engine: classifier, strategy cache and the four public
/// operations. Safe for unlimited concurrent callers; the engine holds
/// no per-operation state.
pub struct CloneEngine {
    registry: SharedRegistry<TypeRegistry>,
    safety: SafetyClassifier,
    cache: StrategyCache,
}

impl CloneEngine {
    pub fn new(registry: SharedRegistry<TypeRegistry>) -> Self {
        CloneEngine {
            safety: SafetyClassifier::new(registry.clone()),
            cache: StrategyCache::new(),
            registry,
        }
    }

    /// The registry this engine resolves runtime types against.
    pub fn registry(&self) -> &SharedRegistry<TypeRegistry> {
        &self.registry
    }

    /// Whether values of `ty` are aliased instead of cloned.
    pub fn is_safe(&self, ty: TypeId) -> bool {
        self.safety.is_safe(ty)
    }

    /// Fully independent copy of the whole graph: shared references and
    /// cycles in the source appear with the same shape in the clone.
    pub fn deep_clone(&self, value: &Value) -> Value {
        let mut state = CloneState::new();
        self.clone_value(value, CloneMode::Deep, &mut state)
    }

    /// Copy of only the top-level container; nested reference fields
    /// still point at the original nested objects.
    pub fn shallow_clone(&self, value: &Value) -> Value {
        let mut state = CloneState::new();
        self.clone_value(value, CloneMode::Shallow, &mut state)
    }

    /// Deep-clone `source`'s state into `existing_target` and return it.
    /// The target's runtime type must equal or descend from the
    /// source's.
    pub fn deep_clone_into(&self, source: &Value, existing_target: &Value) -> CloneResult {
        self.clone_into(source, existing_target, CloneMode::Deep)
    }

    /// Like `deep_clone_into` but without recursion into unsafe fields:
    /// the target's slots end up aliasing the source's references.
    pub fn shallow_clone_into(&self, source: &Value, existing_target: &Value) -> CloneResult {
        self.clone_into(source, existing_target, CloneMode::Shallow)
    }

    /// Force-build the strategy for a type without holding an instance
    /// (ahead-of-time pre-warming). Returns false when the type is safe
    /// and therefore never gets a strategy.
    pub fn prewarm(&self, ty: TypeId, mode: CloneMode) -> bool {
        if self.safety.is_safe(ty) {
            return false;
        }
        self.cache.get_or_build(&self.registry, &self.safety, ty, mode);
        true
    }

    /// Number of strategy syntheses performed so far.
    pub fn synth_count(&self) -> u64 {
        self.cache.synth_count()
    }

    /// Clear every memoized verdict and strategy. For policy
    /// reconfiguration only; must not race live clone operations.
    pub fn reset_all(&self) {
        self.cache.reset();
        self.safety.reset();
    }

    // Traversal

    fn clone_value(&self, value: &Value, mode: CloneMode, state: &mut CloneState) -> Value {
        match value {
            Value::Null => Value::Null,

            // Immutable leaves, enumerations and deny-list values are
            // aliased or bit-copied; no strategy, no identity tracking.
            Value::Bool(_)
            | Value::Int(_)
            | Value::UInt(_)
            | Value::Float32(_)
            | Value::Float(_)
            | Value::Decimal(_)
            | Value::Char(_)
            | Value::Str(_)
            | Value::Timestamp(_)
            | Value::Handle(_)
            | Value::Guid(_)
            | Value::Enum { .. }
            | Value::Opaque(_) => value.clone(),

            Value::Struct(s) => {
                if self.safety.is_safe(s.ty) {
                    return value.clone();
                }
                let strat = self.strategy(s.ty, mode);
                self.run_struct(&strat, s, mode, state)
            }

            Value::Object(o) => {
                if let Some(known) = state.lookup(o.addr()) {
                    return known;
                }
                let ty = o.read().ty;
                if self.safety.is_safe(ty) {
                    return value.clone();
                }
                let strat = self.strategy(ty, mode);
                self.run_object(&strat, o, mode, state)
            }

            Value::Array(a) => {
                if let Some(known) = state.lookup(a.addr()) {
                    return known;
                }
                let ty = a.read().ty;
                let strat = self.strategy(ty, mode);
                self.run_array(&strat, a, mode, state)
            }

            Value::Tuple(t) => {
                if let Some(known) = state.lookup(tuple_addr(t)) {
                    return known;
                }
                let strat = self.strategy(t.ty, mode);
                self.run_tuple(&strat, t, mode, state)
            }

            Value::Boxed(b) => self.clone_boxed(b, mode, state),
        }
    }

    fn strategy(&self, ty: TypeId, mode: CloneMode) -> Arc<CloneStrategy> {
        self.cache.get_or_build(&self.registry, &self.safety, ty, mode)
    }

    /// Reference type: memberwise duplicate (no constructor), identity
    /// registered before any field is fixed so back-references into the
    /// object under construction resolve, then each unsafe field slot
    /// is recursively cloned, readonly slots included, via the direct
    /// write that duplication makes possible.
    fn run_object(
        &self,
        strat: &CloneStrategy,
        source: &Shared<ObjectValue>,
        mode: CloneMode,
        state: &mut CloneState,
    ) -> Value {
        let ClonePlan::Object { steps } = &strat.plan else {
            return Value::Object(source.clone());
        };
        let target = Shared::new(source.read().clone());
        state.record(source.addr(), Value::Object(target.clone()));
        for step in steps {
            // The duplicated slot still aliases the source value.
            let current = match target.read().field(step.slot) {
                Some(v) => v.clone(),
                None => continue,
            };
            let cloned = ensure_sufficient_stack(|| self.clone_value(&current, mode, state));
            target.write().set_field(step.slot, cloned);
        }
        Value::Object(target)
    }

    /// Value type: by-value working copy, unsafe fields cloned into it,
    /// returned by value. Never an identity-map source.
    fn run_struct(
        &self,
        strat: &CloneStrategy,
        source: &StructValue,
        mode: CloneMode,
        state: &mut CloneState,
    ) -> Value {
        let ClonePlan::Struct { steps } = &strat.plan else {
            return Value::Struct(source.clone());
        };
        let mut copy = source.clone();
        for step in steps {
            let Some(current) = copy.fields.get(step.slot).cloned() else {
                continue;
            };
            let cloned = ensure_sufficient_stack(|| self.clone_value(&current, mode, state));
            copy.fields[step.slot] = cloned;
        }
        Value::Struct(copy)
    }

    fn run_array(
        &self,
        strat: &CloneStrategy,
        source: &Shared<ArrayValue>,
        mode: CloneMode,
        state: &mut CloneState,
    ) -> Value {
        let ClonePlan::Array(plan) = &strat.plan else {
            return Value::Array(source.clone());
        };
        let snapshot = source.read().clone();
        match plan {
            ArrayPlan::Bulk | ArrayPlan::Rank2 { safe_elem: true } => {
                // Safe elements: the memberwise element copy is already
                // the clone.
                let target = Shared::new(snapshot);
                state.record(source.addr(), Value::Array(target.clone()));
                Value::Array(target)
            }
            ArrayPlan::Elementwise => {
                let target = self.empty_like(&snapshot);
                state.record(source.addr(), Value::Array(target.clone()));
                for (i, elem) in snapshot.elems.iter().enumerate() {
                    let cloned = ensure_sufficient_stack(|| self.clone_value(elem, mode, state));
                    target.write().elems[i] = cloned;
                }
                Value::Array(target)
            }
            ArrayPlan::Rank2 { safe_elem: false } => {
                let target = self.empty_like(&snapshot);
                state.record(source.addr(), Value::Array(target.clone()));
                let (l1, l2) = (snapshot.dims[0].len, snapshot.dims[1].len);
                for i in 0..l1 {
                    for k in 0..l2 {
                        let flat = i * l2 + k;
                        let Some(elem) = snapshot.elems.get(flat) else {
                            continue;
                        };
                        let cloned =
                            ensure_sufficient_stack(|| self.clone_value(elem, mode, state));
                        target.write().elems[flat] = cloned;
                    }
                }
                Value::Array(target)
            }
            ArrayPlan::Generic => {
                let target = self.empty_like(&snapshot);
                state.record(source.addr(), Value::Array(target.clone()));
                let mut cursor = IndexCursor::new(&snapshot);
                while let Some(flat) = cursor.next_flat(&snapshot) {
                    let Some(elem) = snapshot.elems.get(flat) else {
                        continue;
                    };
                    let cloned = ensure_sufficient_stack(|| self.clone_value(elem, mode, state));
                    target.write().elems[flat] = cloned;
                }
                Value::Array(target)
            }
        }
    }

    /// New array with the source's type and bounds and null elements,
    /// ready to be registered before it is filled.
    fn empty_like(&self, src: &ArrayValue) -> Shared<ArrayValue> {
        Shared::new(ArrayValue::new(
            src.ty,
            src.dims.clone(),
            vec![Value::Null; src.elems.len()],
        ))
    }

    /// Tuples are immutable: collect item clones, construct, then
    /// register identity. Registration happens immediately after
    /// construction so further references to the source tuple resolve
    /// to the one clone; a cycle passing only through tuples cannot be
    /// re-knotted (inherent to collect-then-construct).
    fn run_tuple(
        &self,
        strat: &CloneStrategy,
        source: &Arc<TupleValue>,
        mode: CloneMode,
        state: &mut CloneState,
    ) -> Value {
        let ClonePlan::Tuple { recurse } = &strat.plan else {
            return Value::Tuple(source.clone());
        };
        let items: Vec<Value> = if recurse.is_empty() {
            // Every item type safe: construct directly from the
            // already-safe item values.
            source.items.clone()
        } else {
            source
                .items
                .iter()
                .zip(recurse.iter())
                .map(|(item, deep)| {
                    if *deep {
                        ensure_sufficient_stack(|| self.clone_value(item, mode, state))
                    } else {
                        item.clone()
                    }
                })
                .collect()
        };
        let target = Arc::new(TupleValue::new(source.ty, items));
        state.record(tuple_addr(source), Value::Tuple(target.clone()));
        Value::Tuple(target)
    }

    /// A boxed value type is tracked like a reference type: the box is
    /// the identity, and an in-progress box is registered before its
    /// payload is cloned so self-cycles through the box resolve.
    fn clone_boxed(&self, source: &Shared<Value>, mode: CloneMode, state: &mut CloneState) -> Value {
        if let Some(known) = state.lookup(source.addr()) {
            return known;
        }
        let payload_ty = source.read().type_of(&self.registry);
        if self.safety.is_safe(payload_ty) {
            // Safe payload: aliasing the whole box is correct.
            return Value::Boxed(source.clone());
        }
        match mode {
            CloneMode::Shallow => {
                let dup = Value::Boxed(Shared::new(source.read().clone()));
                state.record(source.addr(), dup.clone());
                dup
            }
            CloneMode::Deep => {
                let target = Shared::new(Value::Null);
                state.record(source.addr(), Value::Boxed(target.clone()));
                let payload = source.read().clone();
                let cloned = ensure_sufficient_stack(|| self.clone_value(&payload, mode, state));
                *target.write() = cloned;
                Value::Boxed(target)
            }
        }
    }

    // Clone-into

    fn clone_into(&self, source: &Value, target: &Value, mode: CloneMode) -> CloneResult {
        // A null target mirrors back null; the cache is never touched.
        if target.is_null() {
            return Ok(Value::Null);
        }
        if source.is_null() {
            return Err(CloneError::MissingSource);
        }
        if matches!(source, Value::Str(_)) {
            return Err(CloneError::UnsupportedTarget);
        }
        match (source, target) {
            (Value::Object(src), Value::Object(dst)) => {
                self.object_into(src, dst, target, mode)
            }
            (Value::Array(src), Value::Array(dst)) => self.array_into(src, dst, target, mode),
            _ => Err(self.mismatch(source, target)),
        }
    }

    /// Copy the source-type slot prefix into the target: memberwise
    /// first, then recursive fixes for unsafe slots (deep mode only).
    /// Fields the descendant target declares beyond the source's layout
    /// are left untouched.
    fn object_into(
        &self,
        src: &Shared<ObjectValue>,
        dst: &Shared<ObjectValue>,
        target: &Value,
        mode: CloneMode,
    ) -> CloneResult {
        let src_ty = src.read().ty;
        let dst_ty = dst.read().ty;
        if !self.registry.descends_from(dst_ty, src_ty) {
            return Err(self.mismatch_types(src_ty, dst_ty));
        }
        if self.safety.is_safe(src_ty) {
            return Ok(target.clone());
        }

        let strat = self.strategy(src_ty, mode);
        let steps: SmallVec<[FieldStep; 8]> = match &strat.plan {
            ClonePlan::Object { steps } => steps.clone(),
            _ => SmallVec::new(),
        };

        let snapshot: Vec<Value> = src.read().fields.clone();
        let prefix = self.registry.field_count(src_ty).min(snapshot.len());

        let mut state = CloneState::new();
        state.record(src.addr(), target.clone());
        {
            let mut body = dst.write();
            for (slot, value) in snapshot.iter().take(prefix).enumerate() {
                body.set_field(slot, value.clone());
            }
        }
        for step in steps.iter().filter(|s| s.slot < prefix) {
            let Some(current) = snapshot.get(step.slot).cloned() else {
                continue;
            };
            let cloned = ensure_sufficient_stack(|| self.clone_value(&current, mode, &mut state));
            dst.write().set_field(step.slot, cloned);
        }
        Ok(target.clone())
    }

    /// Arrays require the identical array type; the overlapping index
    /// space (per-dimension length prefix) is copied.
    fn array_into(
        &self,
        src: &Shared<ArrayValue>,
        dst: &Shared<ArrayValue>,
        target: &Value,
        mode: CloneMode,
    ) -> CloneResult {
        let src_snapshot = src.read().clone();
        let dst_ty = dst.read().ty;
        if src_snapshot.ty != dst_ty {
            return Err(self.mismatch_types(src_snapshot.ty, dst_ty));
        }

        let mut state = CloneState::new();
        state.record(src.addr(), target.clone());

        if src_snapshot.rank() == 1 {
            let n = src_snapshot.elems.len().min(dst.read().elems.len());
            for i in 0..n {
                let elem = &src_snapshot.elems[i];
                let copied = match mode {
                    CloneMode::Shallow => elem.clone(),
                    CloneMode::Deep => {
                        ensure_sufficient_stack(|| self.clone_value(elem, mode, &mut state))
                    }
                };
                dst.write().elems[i] = copied;
            }
        } else {
            let mut cursor = IndexCursor::new(&src_snapshot);
            while let Some((idx, flat)) = cursor.next_indexed(&src_snapshot) {
                let Some(dst_flat) = dst.read().flat_index(&idx) else {
                    continue;
                };
                let Some(elem) = src_snapshot.elems.get(flat) else {
                    continue;
                };
                let copied = match mode {
                    CloneMode::Shallow => elem.clone(),
                    CloneMode::Deep => {
                        ensure_sufficient_stack(|| self.clone_value(elem, mode, &mut state))
                    }
                };
                // The target's element vector may be shorter than its
                // dims promise; skip slots it does not back.
                if let Some(slot) = dst.write().elems.get_mut(dst_flat) {
                    *slot = copied;
                }
            }
        }
        Ok(target.clone())
    }

    fn mismatch(&self, source: &Value, target: &Value) -> CloneError {
        self.mismatch_types(
            source.type_of(&self.registry),
            target.type_of(&self.registry),
        )
    }

    fn mismatch_types(&self, source: TypeId, target: TypeId) -> CloneError {
        CloneError::ArgumentMismatch {
            source_type: self.registry.name(source).to_string(),
            target_type: self.registry.name(target).to_string(),
        }
    }
}

fn tuple_addr(t: &Arc<TupleValue>) -> usize {
    Arc::as_ptr(t) as usize
}

/// Bounds-aware odometer over an array's full index space, last
/// dimension fastest (row-major order).
struct IndexCursor {
    idx: Vec<i64>,
    done: bool,
}

impl IndexCursor {
    fn new(array: &ArrayValue) -> Self {
        IndexCursor {
            idx: array.dims.iter().map(|d| d.lower).collect(),
            done: array.is_empty(),
        }
    }

    fn next_flat(&mut self, array: &ArrayValue) -> Option<usize> {
        self.next_indexed(array).map(|(_, flat)| flat)
    }

    fn next_indexed(&mut self, array: &ArrayValue) -> Option<(Vec<i64>, usize)> {
        if self.done {
            return None;
        }
        let current = self.idx.clone();
        let flat = array.flat_index(&current)?;

        // Advance, rolling over from the last dimension.
        let mut d = self.idx.len();
        loop {
            if d == 0 {
                self.done = true;
                break;
            }
            d -= 1;
            let dim = array.dims[d];
            self.idx[d] += 1;
            if (self.idx[d] - dim.lower) < dim.len as i64 {
                break;
            }
            self.idx[d] = dim.lower;
        }
        Some((current, flat))
    }
}
