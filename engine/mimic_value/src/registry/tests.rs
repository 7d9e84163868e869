use pretty_assertions::assert_eq;

use super::*;

#[test]
fn leaf_ids_are_stable_and_named() {
    let reg = TypeRegistry::new();
    let a = reg.leaf(LeafKind::I64);
    let b = reg.leaf(LeafKind::I64);
    assert_eq!(a, b);
    assert_eq!(&*reg.name(a), "i64");
    assert_ne!(reg.leaf(LeafKind::Str), reg.leaf(LeafKind::Guid));
}

#[test]
fn declare_is_idempotent() {
    let reg = TypeRegistry::new();
    let a = reg.declare("Node");
    let b = reg.declare("Node");
    assert_eq!(a, b);
    assert!(matches!(reg.shape(a), TypeShape::Missing));
}

#[test]
fn forward_reference_then_define() {
    let reg = TypeRegistry::new();
    let node = reg.declare("Node");
    reg.define_class(node, None, vec![FieldDescriptor::new("next", node)]);
    match reg.shape(node) {
        TypeShape::Class { fields, .. } => {
            assert_eq!(fields.len(), 1);
            assert_eq!(fields[0].ty, node);
        }
        other => panic!("expected class, got {other:?}"),
    }
}

#[test]
fn array_and_tuple_types_are_interned() {
    let reg = TypeRegistry::new();
    let i64_ = reg.leaf(LeafKind::I64);
    assert_eq!(reg.array_of(i64_, 1, true), reg.array_of(i64_, 1, true));
    assert_ne!(reg.array_of(i64_, 1, true), reg.array_of(i64_, 2, true));
    assert_ne!(reg.array_of(i64_, 1, true), reg.array_of(i64_, 1, false));

    let pair = reg.tuple_of(&[i64_, i64_]);
    assert_eq!(pair, reg.tuple_of(&[i64_, i64_]));
    assert_ne!(pair, reg.tuple_of(&[i64_]));
}

#[test]
fn descends_from_walks_the_base_chain() {
    let reg = TypeRegistry::new();
    let animal = reg.register_class("Animal", None, vec![]);
    let dog = reg.register_class("Dog", Some(animal), vec![]);
    let pug = reg.register_class("Pug", Some(dog), vec![]);
    let rock = reg.register_class("Rock", None, vec![]);

    assert!(reg.descends_from(pug, animal));
    assert!(reg.descends_from(pug, pug));
    assert!(reg.descends_from(dog, animal));
    assert!(!reg.descends_from(animal, dog));
    assert!(!reg.descends_from(rock, animal));
}

#[test]
fn flattened_fields_are_base_first() {
    let reg = TypeRegistry::new();
    let i64_ = reg.leaf(LeafKind::I64);
    let str_ = reg.leaf(LeafKind::Str);
    let base = reg.register_class("Base", None, vec![FieldDescriptor::new("id", i64_)]);
    let derived = reg.register_class(
        "Derived",
        Some(base),
        vec![FieldDescriptor::new("label", str_)],
    );

    let fields = reg.flattened_fields(derived);
    assert_eq!(fields.len(), 2);
    assert_eq!(&*fields[0].name, "id");
    assert_eq!(&*fields[1].name, "label");

    // Ancestor layout is a prefix of the descendant layout.
    assert_eq!(reg.flattened_fields(base), fields[..1].to_vec());
}

#[test]
fn boundary_class_stops_introspection() {
    let reg = TypeRegistry::new();
    let i64_ = reg.leaf(LeafKind::I64);
    let bridge = reg.register_boundary_class(
        "BridgeBase",
        vec![FieldDescriptor::new("native_state", i64_)],
    );
    let proxy = reg.register_class(
        "Proxy",
        Some(bridge),
        vec![FieldDescriptor::new("tag", i64_)],
    );

    // The bridge base itself exposes nothing.
    assert!(reg.flattened_fields(bridge).is_empty());
    // A descendant exposes only its own declared fields.
    let fields = reg.flattened_fields(proxy);
    assert_eq!(fields.len(), 1);
    assert_eq!(&*fields[0].name, "tag");
}

#[test]
fn readonly_flag_round_trips() {
    let reg = TypeRegistry::new();
    let str_ = reg.leaf(LeafKind::Str);
    let id = reg.register_class(
        "Frozen",
        None,
        vec![FieldDescriptor::new("name", str_).readonly()],
    );
    let fields = reg.flattened_fields(id);
    assert!(fields[0].readonly);
}
