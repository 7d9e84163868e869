//! Type registry: stable, hashable runtime-type identities.
//!
//! Rust values carry no introspectable runtime type, so the registry
//! plays the role a reflection API would: every type that can appear in
//! a value graph is registered once and receives a `TypeId` that is
//! stable, hashable and cheap to compare. Values carry their `TypeId`;
//! the clone engine uses it as the key for safety verdicts and compiled
//! clone strategies.
//!
//! Leaf types (integers, floats, string, timestamp, guid, ...) are
//! pre-seeded so `TypeRegistry::leaf` never allocates. Array and tuple
//! types are interned: asking for `i64[,]` twice yields the same id.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Stable handle to a registered runtime type. Cache key for safety
/// verdicts and clone strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Built-in immutable leaf kinds. Values of these types are aliased or
/// bit-copied, never recursively cloned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LeafKind {
    Null,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Decimal,
    Char,
    Str,
    Timestamp,
    Handle,
    Guid,
}

/// Seeding order; a leaf's `TypeId` is its position in this table.
const LEAF_SEED: [(LeafKind, &str); 18] = [
    (LeafKind::Null, "null"),
    (LeafKind::Bool, "bool"),
    (LeafKind::I8, "i8"),
    (LeafKind::I16, "i16"),
    (LeafKind::I32, "i32"),
    (LeafKind::I64, "i64"),
    (LeafKind::U8, "u8"),
    (LeafKind::U16, "u16"),
    (LeafKind::U32, "u32"),
    (LeafKind::U64, "u64"),
    (LeafKind::F32, "f32"),
    (LeafKind::F64, "f64"),
    (LeafKind::Decimal, "decimal"),
    (LeafKind::Char, "char"),
    (LeafKind::Str, "str"),
    (LeafKind::Timestamp, "timestamp"),
    (LeafKind::Handle, "handle"),
    (LeafKind::Guid, "guid"),
];

/// Deny-list categories: values the engine must never traverse. They
/// are aliased wholesale, exactly like leaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpaqueKind {
    /// Raw pointer / unmanaged handle. Nothing to do but blind-copy.
    Pointer,
    /// Platform reflection internals.
    ReflectionInternal,
    /// Remoting-style object bridge.
    RemotingBridge,
    /// Type holding a critical native finalizable resource.
    NativeResource,
    /// Foreign-object-model bridge (COM-like).
    ForeignBridge,
}

/// Field metadata, used only during strategy synthesis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: Arc<str>,
    /// Declared field type. Dispatch at traversal time always uses the
    /// runtime type of the value actually held in the slot.
    pub ty: TypeId,
    /// Nominally-immutable field. Duplication-based allocation bypasses
    /// construction, so the engine writes these slots directly anyway.
    pub readonly: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<Arc<str>>, ty: TypeId) -> Self {
        FieldDescriptor {
            name: name.into(),
            ty,
            readonly: false,
        }
    }

    /// Mark the field as nominally immutable.
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }
}

/// Shape of a registered type.
#[derive(Clone, Debug)]
pub enum TypeShape {
    /// Declared (forward reference) but not yet defined.
    Missing,
    Leaf(LeafKind),
    /// Enumeration. The variant set is irrelevant to cloning; values
    /// carry a discriminant and are always safe.
    Enum,
    Opaque(OpaqueKind),
    /// Value type: copied by value, safe iff every field is safe.
    Struct { fields: Vec<FieldDescriptor> },
    /// Reference type with single inheritance.
    Class {
        base: Option<TypeId>,
        fields: Vec<FieldDescriptor>,
        /// When false, ancestry walks stop here: neither this class's
        /// fields nor its ancestors' are ever inspected (bridge bases).
        introspectable: bool,
    },
    /// Array type: element type, rank and zero-basedness are part of
    /// the type; per-instance bounds live on the value.
    Array {
        elem: TypeId,
        rank: u32,
        zero_based: bool,
    },
    /// Fixed-arity immutable tuple composite.
    Tuple { items: Vec<TypeId> },
}

struct TypeDef {
    name: Arc<str>,
    shape: TypeShape,
}

#[derive(Default)]
struct RegistryInner {
    defs: Vec<TypeDef>,
    by_name: FxHashMap<Arc<str>, TypeId>,
    arrays: FxHashMap<(TypeId, u32, bool), TypeId>,
    tuples: FxHashMap<Vec<TypeId>, TypeId>,
}

impl RegistryInner {
    fn push(&mut self, name: Arc<str>, shape: TypeShape) -> TypeId {
        let id = TypeId(u32::try_from(self.defs.len()).unwrap_or(u32::MAX));
        self.defs.push(TypeDef {
            name: name.clone(),
            shape,
        });
        self.by_name.insert(name, id);
        id
    }

    fn declare(&mut self, name: &str) -> TypeId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        self.push(Arc::from(name), TypeShape::Missing)
    }
}

/// Process-wide registry of runtime types.
///
/// Registration is append-only; ids are never reused. Defining a type
/// must happen before the engine classifies or clones values of it:
/// safety verdicts and strategies are memoized forever once computed.
pub struct TypeRegistry {
    inner: RwLock<RegistryInner>,
}

impl TypeRegistry {
    /// Create a registry pre-seeded with every built-in leaf type.
    pub fn new() -> Self {
        let mut inner = RegistryInner::default();
        for (kind, name) in LEAF_SEED {
            inner.push(Arc::from(name), TypeShape::Leaf(kind));
        }
        TypeRegistry {
            inner: RwLock::new(inner),
        }
    }

    /// Id of a built-in leaf type.
    pub fn leaf(&self, kind: LeafKind) -> TypeId {
        // Seeded in LEAF_SEED order, so position == id.
        let pos = LEAF_SEED.iter().position(|(k, _)| *k == kind);
        TypeId(u32::try_from(pos.unwrap_or(0)).unwrap_or(0))
    }

    /// Declare a type by name without defining it. Returns the existing
    /// id if the name is already known (forward references).
    pub fn declare(&self, name: &str) -> TypeId {
        self.inner.write().declare(name)
    }

    /// Define a previously declared type as a value type (struct).
    pub fn define_struct(&self, id: TypeId, fields: Vec<FieldDescriptor>) {
        self.define(id, TypeShape::Struct { fields });
    }

    /// Define a previously declared type as a reference type (class).
    pub fn define_class(&self, id: TypeId, base: Option<TypeId>, fields: Vec<FieldDescriptor>) {
        self.define(
            id,
            TypeShape::Class {
                base,
                fields,
                introspectable: true,
            },
        );
    }

    /// Define a previously declared type as an enumeration.
    pub fn define_enum(&self, id: TypeId) {
        self.define(id, TypeShape::Enum);
    }

    /// Define a previously declared type as a deny-list opaque type.
    pub fn define_opaque(&self, id: TypeId, kind: OpaqueKind) {
        self.define(id, TypeShape::Opaque(kind));
    }

    fn define(&self, id: TypeId, shape: TypeShape) {
        let mut inner = self.inner.write();
        if let Some(def) = inner.defs.get_mut(id.index()) {
            def.shape = shape;
        }
    }

    /// Declare and define a struct in one step.
    pub fn register_struct(&self, name: &str, fields: Vec<FieldDescriptor>) -> TypeId {
        let id = self.declare(name);
        self.define_struct(id, fields);
        id
    }

    /// Declare and define a class in one step.
    pub fn register_class(
        &self,
        name: &str,
        base: Option<TypeId>,
        fields: Vec<FieldDescriptor>,
    ) -> TypeId {
        let id = self.declare(name);
        self.define_class(id, base, fields);
        id
    }

    /// Declare and define an enumeration in one step.
    pub fn register_enum(&self, name: &str) -> TypeId {
        let id = self.declare(name);
        self.define_enum(id);
        id
    }

    /// Declare and define a deny-list opaque type in one step.
    pub fn register_opaque(&self, name: &str, kind: OpaqueKind) -> TypeId {
        let id = self.declare(name);
        self.define_opaque(id, kind);
        id
    }

    /// Register a do-not-introspect class boundary. Classes descending
    /// from it have their own fields cloned, but the ancestry walk stops
    /// before this class: its fields (and its ancestors') stay shared.
    pub fn register_boundary_class(&self, name: &str, fields: Vec<FieldDescriptor>) -> TypeId {
        let id = self.declare(name);
        self.define(
            id,
            TypeShape::Class {
                base: None,
                fields,
                introspectable: false,
            },
        );
        id
    }

    /// Interned array type for `elem` with the given rank/bounds class.
    pub fn array_of(&self, elem: TypeId, rank: u32, zero_based: bool) -> TypeId {
        let mut inner = self.inner.write();
        if let Some(&id) = inner.arrays.get(&(elem, rank, zero_based)) {
            return id;
        }
        let elem_name = inner
            .defs
            .get(elem.index())
            .map_or_else(|| Arc::from("?"), |d| d.name.clone());
        let suffix = if zero_based { "" } else { "*" };
        let name: Arc<str> = Arc::from(format!("{elem_name}[{rank}]{suffix}"));
        let id = inner.push(
            name,
            TypeShape::Array {
                elem,
                rank,
                zero_based,
            },
        );
        inner.arrays.insert((elem, rank, zero_based), id);
        id
    }

    /// Interned tuple type for the given item types.
    pub fn tuple_of(&self, items: &[TypeId]) -> TypeId {
        let mut inner = self.inner.write();
        if let Some(&id) = inner.tuples.get(items) {
            return id;
        }
        let name: Arc<str> = Arc::from(format!("tuple/{}", items.len()));
        let id = inner.push(
            name,
            TypeShape::Tuple {
                items: items.to_vec(),
            },
        );
        inner.tuples.insert(items.to_vec(), id);
        id
    }

    /// Name of a registered type.
    pub fn name(&self, id: TypeId) -> Arc<str> {
        self.inner
            .read()
            .defs
            .get(id.index())
            .map_or_else(|| Arc::from("<unknown>"), |d| d.name.clone())
    }

    /// Shape of a registered type. Unknown ids report `Missing`.
    pub fn shape(&self, id: TypeId) -> TypeShape {
        self.inner
            .read()
            .defs
            .get(id.index())
            .map_or(TypeShape::Missing, |d| d.shape.clone())
    }

    /// Whether `ty` is `ancestor` or descends from it through the base
    /// chain.
    pub fn descends_from(&self, ty: TypeId, ancestor: TypeId) -> bool {
        let inner = self.inner.read();
        let mut cur = Some(ty);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = match inner.defs.get(id.index()).map(|d| &d.shape) {
                Some(TypeShape::Class { base, .. }) => *base,
                _ => None,
            };
        }
        false
    }

    /// Fields of a class flattened over its ancestry, base-first: the
    /// layout `ObjectValue::fields` uses. The walk stops below the first
    /// non-introspectable ancestor, so bridge internals never appear.
    ///
    /// For an ancestor/descendant pair, the ancestor's flattened fields
    /// are a prefix of the descendant's.
    pub fn flattened_fields(&self, ty: TypeId) -> Vec<FieldDescriptor> {
        let inner = self.inner.read();
        let mut chain = Vec::new();
        let mut cur = Some(ty);
        while let Some(id) = cur {
            match inner.defs.get(id.index()).map(|d| &d.shape) {
                Some(TypeShape::Class {
                    base,
                    fields,
                    introspectable,
                }) => {
                    if !introspectable {
                        break;
                    }
                    chain.push(fields);
                    cur = *base;
                }
                Some(TypeShape::Struct { fields }) => {
                    chain.push(fields);
                    cur = None;
                }
                _ => break,
            }
        }
        chain
            .into_iter()
            .rev()
            .flat_map(|fields| fields.iter().cloned())
            .collect()
    }

    /// Number of flattened fields of `ty` (object slot count).
    pub fn field_count(&self, ty: TypeId) -> usize {
        self.flattened_fields(ty).len()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        write!(f, "TypeRegistry({} types)", inner.defs.len())
    }
}

#[cfg(test)]
mod tests;
