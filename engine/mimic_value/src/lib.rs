//! Mimic value model: runtime values and the type registry.
//!
//! This crate provides the object model the clone engine operates on:
//!
//! - `Value`: heterogeneous runtime values: immutable leaves, structs
//!   (value types), objects/arrays/tuples (reference types with heap
//!   identity), boxed value types, enumerations and deny-list opaques.
//! - `TypeRegistry`: registered runtime types with stable, hashable
//!   `TypeId`s, single-inheritance class chains, interned array/tuple
//!   types and flattened field layouts.
//! - `Shared<T>`: the heap cell whose allocation address is a value's
//!   identity.

mod registry;
mod shared;
mod value;

pub use registry::{FieldDescriptor, LeafKind, OpaqueKind, TypeId, TypeRegistry, TypeShape};
pub use shared::{Shared, SharedRegistry};
pub use value::{
    ArrayDim, ArrayValue, Decimal, ObjectValue, OpaqueValue, StructValue, Timestamp, TupleValue,
    Value,
};
