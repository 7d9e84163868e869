//! Clone strategy synthesis.
//!
//! Instead of emitting executable code per type, synthesis compiles a
//! reusable `ClonePlan` once per `(type, mode)`: which traversal shape
//! to run and which field slots need recursive cloning. Traversal-
//! planning cost is paid once; every clone of that type replays the
//! plan.
//!
//! Synthesis never invokes user-defined construction, equality, hashing,
//! string conversion or drop logic, and it never needs a constructor:
//! reference types are allocated by memberwise duplication of the
//! source body. It also never consults the strategy cache, so the
//! cache's per-key build lock is never re-entered.

use smallvec::SmallVec;
use tracing::debug;

use mimic_value::{TypeId, TypeRegistry, TypeShape};

use crate::safety::SafetyClassifier;

/// Clone mode half of a strategy key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CloneMode {
    /// Fully independent graph; shared references and cycles preserved.
    Deep,
    /// Top-level container only; nested references stay aliased.
    Shallow,
}

/// One field slot that needs recursive cloning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldStep {
    /// Index into the flattened base-first field vector.
    pub slot: usize,
    /// Nominally-immutable field. Duplication bypasses construction, so
    /// the slot still holds the shared source value and is overwritten
    /// through the privileged direct write the value model allows.
    pub readonly: bool,
}

/// Array traversal shape, resolved from the array type's element
/// safety, rank and bounds class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrayPlan {
    /// Rank-1 zero-based, safe element: bulk copy of the element vector.
    Bulk,
    /// Rank-1 zero-based, unsafe element: element-wise recursion.
    Elementwise,
    /// Rank-2 zero-based: specialized nested loop.
    Rank2 { safe_elem: bool },
    /// Any other rank or non-zero lower bounds: generic bounds-aware
    /// walk over the full index space.
    Generic,
}

/// Compiled clone procedure for one `(type, mode)` key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClonePlan {
    /// Safe shape: return the value as-is. Dispatch short-circuits
    /// before the cache for safe types, so this is a totality fallback.
    Alias,
    Array(ArrayPlan),
    /// Collect item clones, construct, then register identity. A cycle
    /// that passes only through tuples therefore cannot be re-knotted
    /// in the clone; immutable construction forecloses it.
    Tuple {
        /// Per-item recursion flags; empty means construct from aliased
        /// items (every item type safe, arity < 10, no recursion).
        recurse: SmallVec<[bool; 8]>,
    },
    /// Reference type: duplicate the body memberwise, register identity
    /// before any field is fixed, then run the steps.
    Object { steps: SmallVec<[FieldStep; 8]> },
    /// Value type: by-value working copy, run the steps, return by
    /// value. No allocation, no identity registration.
    Struct { steps: SmallVec<[FieldStep; 8]> },
}

/// Immutable compiled strategy, cached per `(type, mode)`.
#[derive(Clone, Debug)]
pub struct CloneStrategy {
    pub ty: TypeId,
    pub mode: CloneMode,
    pub plan: ClonePlan,
}

/// Build the strategy for `(ty, mode)`. Pure except for safety-verdict
/// cache writes; called at most once per key by the strategy cache.
pub fn synthesize(
    registry: &TypeRegistry,
    safety: &SafetyClassifier,
    ty: TypeId,
    mode: CloneMode,
) -> CloneStrategy {
    let plan = match registry.shape(ty) {
        TypeShape::Leaf(_) | TypeShape::Enum | TypeShape::Opaque(_) | TypeShape::Missing => {
            ClonePlan::Alias
        }
        TypeShape::Array {
            elem,
            rank,
            zero_based,
        } => ClonePlan::Array(array_plan(safety, elem, rank, zero_based, mode)),
        TypeShape::Tuple { items } => {
            let recurse: SmallVec<[bool; 8]> = match mode {
                CloneMode::Shallow => SmallVec::new(),
                CloneMode::Deep => {
                    let flags: SmallVec<[bool; 8]> =
                        items.iter().map(|item| !safety.is_safe(*item)).collect();
                    // Arity < 10 with every argument safe constructs
                    // directly from aliased items.
                    if items.len() < 10 && flags.iter().all(|f| !f) {
                        SmallVec::new()
                    } else {
                        flags
                    }
                }
            };
            ClonePlan::Tuple { recurse }
        }
        TypeShape::Class { .. } => ClonePlan::Object {
            steps: field_steps(registry, safety, ty, mode),
        },
        TypeShape::Struct { .. } => ClonePlan::Struct {
            steps: field_steps(registry, safety, ty, mode),
        },
    };

    debug!(ty = %registry.name(ty), ?mode, ?plan, "synthesized clone strategy");
    CloneStrategy { ty, mode, plan }
}

fn array_plan(
    safety: &SafetyClassifier,
    elem: TypeId,
    rank: u32,
    zero_based: bool,
    mode: CloneMode,
) -> ArrayPlan {
    // Shallow mode duplicates the container and aliases every element.
    if matches!(mode, CloneMode::Shallow) {
        return ArrayPlan::Bulk;
    }
    let safe_elem = safety.is_safe(elem);
    match (rank, zero_based) {
        (1, true) if safe_elem => ArrayPlan::Bulk,
        (1, true) => ArrayPlan::Elementwise,
        (2, true) => ArrayPlan::Rank2 { safe_elem },
        _ => ArrayPlan::Generic,
    }
}

/// Steps for every flattened field whose declared type is unsafe. The
/// ancestry walk (and its do-not-introspect boundary) already happened
/// in `flattened_fields`. Shallow mode never recurses into fields.
fn field_steps(
    registry: &TypeRegistry,
    safety: &SafetyClassifier,
    ty: TypeId,
    mode: CloneMode,
) -> SmallVec<[FieldStep; 8]> {
    if matches!(mode, CloneMode::Shallow) {
        return SmallVec::new();
    }
    registry
        .flattened_fields(ty)
        .iter()
        .enumerate()
        .filter(|(_, field)| !safety.is_safe(field.ty))
        .map(|(slot, field)| FieldStep {
            slot,
            readonly: field.readonly,
        })
        .collect()
}
