//! Runtime values for the Mimic clone engine.
//!
//! The value model mirrors a general-purpose host object model:
//! immutable leaves held inline, reference composites behind `Shared`
//! heap cells with stable identity, value-type composites copied by
//! value, and a `Boxed` wrapper that lifts a value type into a shared
//! polymorphic slot.
//!
//! Equality is *identity* for heap values and *content* for leaves and
//! value types. That matches what the clone engine preserves: two slots
//! that shared one object in the source compare equal; a deep clone of
//! an object never compares equal to its source.

mod composite;

use std::fmt;
use std::sync::Arc;

use smallvec::{smallvec, SmallVec};

pub use composite::{
    ArrayDim, ArrayValue, Decimal, ObjectValue, OpaqueValue, StructValue, Timestamp, TupleValue,
};

use crate::registry::{LeafKind, TypeId, TypeRegistry};
use crate::shared::Shared;

/// Runtime value of unknown, heterogeneous, possibly self-referential
/// shape.
#[derive(Clone)]
pub enum Value {
    // Immutable leaves (inline, aliased or bit-copied by the engine)
    /// The "no value" sentinel.
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float32(f32),
    Float(f64),
    Decimal(Decimal),
    Char(char),
    /// Immutable text; aliasing the allocation is always safe.
    Str(Arc<str>),
    Timestamp(Timestamp),
    /// Native-word-sized handle integer.
    Handle(usize),
    /// 128-bit GUID.
    Guid(u128),

    /// Enumeration value: type plus discriminant, always safe.
    Enum { ty: TypeId, discriminant: i64 },
    /// Deny-list value, aliased wholesale.
    Opaque(OpaqueValue),

    // Composites
    /// Value-type composite, copied by value.
    Struct(StructValue),
    /// Reference-type composite with heap identity.
    Object(Shared<ObjectValue>),
    /// Rank-aware array with heap identity.
    Array(Shared<ArrayValue>),
    /// Immutable fixed-arity tuple with heap identity.
    Tuple(Arc<TupleValue>),
    /// A value type boxed into a shared polymorphic slot; tracked by
    /// the identity map like a reference type.
    Boxed(Shared<Value>),
}

// Factory methods

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(Arc::from(s.into()))
    }

    pub fn decimal(units: i128, scale: u32) -> Self {
        Value::Decimal(Decimal { units, scale })
    }

    pub fn timestamp(ticks: i64) -> Self {
        Value::Timestamp(Timestamp { ticks })
    }

    pub fn enum_value(ty: TypeId, discriminant: i64) -> Self {
        Value::Enum { ty, discriminant }
    }

    pub fn opaque(ty: TypeId, handle: Arc<dyn std::any::Any + Send + Sync>) -> Self {
        Value::Opaque(OpaqueValue::new(ty, handle))
    }

    pub fn struct_value(ty: TypeId, fields: Vec<Value>) -> Self {
        Value::Struct(StructValue::new(ty, fields))
    }

    /// Allocate a reference-type instance. `fields` must follow the
    /// flattened base-first layout of `ty`.
    pub fn object(ty: TypeId, fields: Vec<Value>) -> Self {
        Value::Object(Shared::new(ObjectValue::new(ty, fields)))
    }

    /// Allocate a rank-1 zero-based array.
    pub fn array(ty: TypeId, elems: Vec<Value>) -> Self {
        let dims: SmallVec<[ArrayDim; 2]> = smallvec![ArrayDim::new(0, elems.len())];
        Value::Array(Shared::new(ArrayValue::new(ty, dims, elems)))
    }

    /// Allocate an array with explicit per-dimension bounds. `elems` is
    /// flat row-major over the full index space.
    pub fn array_with_dims(ty: TypeId, dims: SmallVec<[ArrayDim; 2]>, elems: Vec<Value>) -> Self {
        Value::Array(Shared::new(ArrayValue::new(ty, dims, elems)))
    }

    pub fn tuple(ty: TypeId, items: Vec<Value>) -> Self {
        Value::Tuple(Arc::new(TupleValue::new(ty, items)))
    }

    /// Box a value into a shared polymorphic slot.
    pub fn boxed(value: Value) -> Self {
        Value::Boxed(Shared::new(value))
    }
}

// Value methods

impl Value {
    /// Runtime type of the value. Composites carry their own `TypeId`;
    /// leaves resolve through the registry's pre-seeded leaf table.
    /// Never the declared type of whatever slot held the value.
    pub fn type_of(&self, registry: &TypeRegistry) -> TypeId {
        match self {
            Value::Null => registry.leaf(LeafKind::Null),
            Value::Bool(_) => registry.leaf(LeafKind::Bool),
            Value::Int(_) => registry.leaf(LeafKind::I64),
            Value::UInt(_) => registry.leaf(LeafKind::U64),
            Value::Float32(_) => registry.leaf(LeafKind::F32),
            Value::Float(_) => registry.leaf(LeafKind::F64),
            Value::Decimal(_) => registry.leaf(LeafKind::Decimal),
            Value::Char(_) => registry.leaf(LeafKind::Char),
            Value::Str(_) => registry.leaf(LeafKind::Str),
            Value::Timestamp(_) => registry.leaf(LeafKind::Timestamp),
            Value::Handle(_) => registry.leaf(LeafKind::Handle),
            Value::Guid(_) => registry.leaf(LeafKind::Guid),
            Value::Enum { ty, .. } => *ty,
            Value::Opaque(o) => o.ty,
            Value::Struct(s) => s.ty,
            Value::Object(o) => o.read().ty,
            Value::Array(a) => a.read().ty,
            Value::Tuple(t) => t.ty,
            Value::Boxed(b) => b.read().type_of(registry),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_object(&self) -> Option<&Shared<ObjectValue>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Shared<ArrayValue>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Reference identity for heap values; false for everything else.
    pub fn ref_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => a.ref_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ref_eq(b),
            (Value::Boxed(a), Value::Boxed(b)) => a.ref_eq(b),
            (Value::Tuple(a), Value::Tuple(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Convenience: read an object field by slot index.
    pub fn object_field(&self, slot: usize) -> Option<Value> {
        match self {
            Value::Object(o) => o.read().field(slot).cloned(),
            _ => None,
        }
    }

    /// Convenience: write an object field by slot index.
    pub fn set_object_field(&self, slot: usize, value: Value) {
        if let Value::Object(o) = self {
            o.write().set_field(slot, value);
        }
    }

    /// Convenience: read an array element by flat offset.
    pub fn array_elem(&self, flat: usize) -> Option<Value> {
        match self {
            Value::Array(a) => a.read().elems.get(flat).cloned(),
            _ => None,
        }
    }
}

// Trait implementations

impl PartialEq for Value {
    /// Content equality for leaves and value types, reference identity
    /// for heap values. Cycle-safe: recursion only passes through
    /// by-value fields, never through heap references.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Handle(a), Value::Handle(b)) => a == b,
            (Value::Guid(a), Value::Guid(b)) => a == b,
            (
                Value::Enum {
                    ty: t1,
                    discriminant: d1,
                },
                Value::Enum {
                    ty: t2,
                    discriminant: d2,
                },
            ) => t1 == t2 && d1 == d2,
            (Value::Opaque(a), Value::Opaque(b)) => a.ref_eq(b),
            (Value::Struct(a), Value::Struct(b)) => a == b,
            _ => self.ref_eq(other),
        }
    }
}

impl fmt::Debug for Value {
    /// Compact and cycle-safe: heap composites print their identity,
    /// not their contents.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::UInt(n) => write!(f, "UInt({n})"),
            Value::Float32(n) => write!(f, "Float32({n})"),
            Value::Float(n) => write!(f, "Float({n})"),
            Value::Decimal(d) => write!(f, "Decimal({}e-{})", d.units, d.scale),
            Value::Char(c) => write!(f, "Char({c:?})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Timestamp(t) => write!(f, "Timestamp({})", t.ticks),
            Value::Handle(h) => write!(f, "Handle({h:#x})"),
            Value::Guid(g) => write!(f, "Guid({g:#034x})"),
            Value::Enum { ty, discriminant } => write!(f, "Enum({ty:?}#{discriminant})"),
            Value::Opaque(o) => write!(f, "{o:?}"),
            Value::Struct(s) => write!(f, "Struct(ty={:?}, {} fields)", s.ty, s.fields.len()),
            Value::Object(o) => {
                let body = o.read();
                write!(
                    f,
                    "Object(ty={:?}, {} fields, @{:#x})",
                    body.ty,
                    body.fields.len(),
                    o.addr()
                )
            }
            Value::Array(a) => {
                let body = a.read();
                write!(
                    f,
                    "Array(ty={:?}, dims={:?}, @{:#x})",
                    body.ty,
                    body.dims.as_slice(),
                    a.addr()
                )
            }
            Value::Tuple(t) => write!(f, "Tuple(ty={:?}, {} items)", t.ty, t.items.len()),
            Value::Boxed(b) => write!(f, "Boxed(@{:#x})", b.addr()),
        }
    }
}
