//! Composite and leaf-adjacent value types.
//!
//! These carry their `TypeId` so the engine can resolve strategies from
//! the runtime type of a value, never from a declared slot type.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::registry::TypeId;
use crate::value::Value;

/// High-precision decimal: 128-bit scaled integer, `units * 10^-scale`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Decimal {
    pub units: i128,
    pub scale: u32,
}

/// Calendar/timestamp value as a raw tick count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    pub ticks: i64,
}

/// Deny-list value: a handle the engine must never traverse or copy.
/// Cloning in any mode aliases the handle wholesale.
#[derive(Clone)]
pub struct OpaqueValue {
    pub ty: TypeId,
    handle: Arc<dyn Any + Send + Sync>,
}

impl OpaqueValue {
    pub fn new(ty: TypeId, handle: Arc<dyn Any + Send + Sync>) -> Self {
        OpaqueValue { ty, handle }
    }

    /// Reference identity of the underlying handle.
    pub fn ref_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.handle, &other.handle)
    }

    /// Downcast the handle for host-side use.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.handle.downcast_ref::<T>()
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque(ty={:?})", self.ty)
    }
}

/// Value-type composite. Copied by value; never an identity-map source
/// unless boxed into a shared slot.
#[derive(Clone, Debug, PartialEq)]
pub struct StructValue {
    pub ty: TypeId,
    /// Field values in flattened declaration order.
    pub fields: Vec<Value>,
}

impl StructValue {
    pub fn new(ty: TypeId, fields: Vec<Value>) -> Self {
        StructValue { ty, fields }
    }
}

/// Reference-type composite body, always held behind `Shared`.
///
/// Slots follow `TypeRegistry::flattened_fields(ty)`: base-class fields
/// first, so an ancestor's layout is a prefix of a descendant's.
#[derive(Clone, Debug)]
pub struct ObjectValue {
    pub ty: TypeId,
    pub fields: Vec<Value>,
}

impl ObjectValue {
    pub fn new(ty: TypeId, fields: Vec<Value>) -> Self {
        ObjectValue { ty, fields }
    }

    pub fn field(&self, slot: usize) -> Option<&Value> {
        self.fields.get(slot)
    }

    pub fn set_field(&mut self, slot: usize, value: Value) {
        if let Some(f) = self.fields.get_mut(slot) {
            *f = value;
        }
    }
}

/// One array dimension: lower bound and length. Zero-based rank-1
/// arrays have a single `{ lower: 0, len }` dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArrayDim {
    pub lower: i64,
    pub len: usize,
}

impl ArrayDim {
    pub fn new(lower: i64, len: usize) -> Self {
        ArrayDim { lower, len }
    }
}

/// Array body: rank-aware bounds plus flat row-major element storage.
#[derive(Clone, Debug)]
pub struct ArrayValue {
    /// Interned array `TypeId` (element type, rank, zero-basedness).
    pub ty: TypeId,
    pub dims: SmallVec<[ArrayDim; 2]>,
    pub elems: Vec<Value>,
}

impl ArrayValue {
    pub fn new(ty: TypeId, dims: SmallVec<[ArrayDim; 2]>, elems: Vec<Value>) -> Self {
        ArrayValue { ty, dims, elems }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total element count over the full index space.
    pub fn len(&self) -> usize {
        self.dims.iter().map(|d| d.len).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_zero_based(&self) -> bool {
        self.dims.iter().all(|d| d.lower == 0)
    }

    /// Flat row-major offset of a multi-dimensional index, honoring
    /// per-dimension lower bounds.
    pub fn flat_index(&self, index: &[i64]) -> Option<usize> {
        if index.len() != self.dims.len() {
            return None;
        }
        let mut flat = 0usize;
        for (dim, &i) in self.dims.iter().zip(index) {
            let off = usize::try_from(i.checked_sub(dim.lower)?).ok()?;
            if off >= dim.len {
                return None;
            }
            flat = flat * dim.len + off;
        }
        Some(flat)
    }
}

/// Fixed-arity immutable tuple composite. Never mutated after
/// construction, so clones are built collect-then-construct.
#[derive(Debug)]
pub struct TupleValue {
    pub ty: TypeId,
    pub items: Vec<Value>,
}

impl TupleValue {
    pub fn new(ty: TypeId, items: Vec<Value>) -> Self {
        TupleValue { ty, items }
    }
}
