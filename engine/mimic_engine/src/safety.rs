//! Type safety classification.
//!
//! A type is *safe* when its values can be aliased or bit-copied
//! instead of recursively cloned: immutable leaves, enumerations,
//! pointers and the deny-list of dangerous-to-touch categories
//! (reflection/remoting internals, critical native resources, foreign
//! bridges). A value type is safe iff every field, including inherited
//! ones, is safe. A reference type is never safe: its references must
//! be counted to preserve graph topology.
//!
//! Verdicts are pure and memoized for the process lifetime (until an
//! explicit full reset). Unknown or not-yet-defined types classify as
//! unsafe, conservatively, and that provisional verdict is not cached
//! so the eternal verdict is computed from the defined shape.

use dashmap::DashMap;
use rustc_hash::FxHashSet;

use mimic_value::{SharedRegistry, TypeId, TypeRegistry, TypeShape};

/// Memoizing safety classifier. Safe for unlimited concurrent callers;
/// the only side effect is the verdict cache write.
pub struct SafetyClassifier {
    registry: SharedRegistry<TypeRegistry>,
    verdicts: DashMap<TypeId, bool>,
}

impl SafetyClassifier {
    pub fn new(registry: SharedRegistry<TypeRegistry>) -> Self {
        SafetyClassifier {
            registry,
            verdicts: DashMap::new(),
        }
    }

    /// Whether values of `ty` are returned as-is instead of cloned.
    pub fn is_safe(&self, ty: TypeId) -> bool {
        if let Some(verdict) = self.verdicts.get(&ty) {
            return *verdict;
        }
        let mut visiting = FxHashSet::default();
        self.classify(ty, &mut visiting)
    }

    /// Forget every verdict. For policy reconfiguration only; must not
    /// race live clone operations.
    pub fn reset(&self) {
        self.verdicts.clear();
    }

    fn classify(&self, ty: TypeId, visiting: &mut FxHashSet<TypeId>) -> bool {
        if let Some(verdict) = self.verdicts.get(&ty) {
            return *verdict;
        }

        let verdict = match self.registry.shape(ty) {
            TypeShape::Leaf(_) | TypeShape::Enum | TypeShape::Opaque(_) => true,
            // Reference containers: references must be counted.
            TypeShape::Class { .. } | TypeShape::Array { .. } | TypeShape::Tuple { .. } => false,
            TypeShape::Struct { fields } => {
                // Struct type graphs cannot loop by value, but guard
                // against malformed registrations anyway.
                visiting.insert(ty);
                fields.iter().all(|field| {
                    visiting.contains(&field.ty) || self.classify(field.ty, visiting)
                })
            }
            // Declared but undefined: unsafe for now, verdict deferred
            // until the type is defined.
            TypeShape::Missing => return false,
        };

        self.verdicts.insert(ty, verdict);
        verdict
    }
}
