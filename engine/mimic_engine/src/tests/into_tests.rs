//! Cloning into a pre-existing target: contract errors, descendant
//! targets, and array overlap copies.

use pretty_assertions::assert_eq;
use smallvec::smallvec;

use mimic_value::{ArrayDim, FieldDescriptor, LeafKind, Value};

use crate::CloneError;

use super::fixtures::{engine, holder_type, node, node_type};

#[test]
fn deep_clone_into_same_type_replaces_target_state() {
    let engine = engine();
    let reg = engine.registry().clone();
    let holder = holder_type(&reg);

    let child = node(&reg, 1);
    let source = Value::object(holder, vec![Value::string("src"), child.clone()]);
    let target = Value::object(holder, vec![Value::string("old"), Value::Null]);

    let result = engine.deep_clone_into(&source, &target);
    let out = result.unwrap_or(Value::Null);

    // The returned value is the target instance itself.
    assert!(out.ref_eq(&target));
    assert_eq!(target.object_field(0), Some(Value::string("src")));

    let filled = target.object_field(1).unwrap_or(Value::Null);
    assert!(!filled.ref_eq(&child), "nested referent deep-cloned");
    assert_eq!(filled.object_field(0), Some(Value::Int(1)));
}

#[test]
fn shallow_clone_into_aliases_nested_referents() {
    let engine = engine();
    let reg = engine.registry().clone();
    let holder = holder_type(&reg);

    let child = node(&reg, 2);
    let source = Value::object(holder, vec![Value::string("s"), child.clone()]);
    let target = Value::object(holder, vec![Value::Null, Value::Null]);

    let result = engine.shallow_clone_into(&source, &target);
    assert!(result.is_ok());

    let filled = target.object_field(1).unwrap_or(Value::Null);
    assert!(filled.ref_eq(&child));
}

#[test]
fn descendant_target_gets_the_base_prefix_only() {
    let engine = engine();
    let reg = engine.registry().clone();
    let node_ty = node_type(&reg);
    let base = reg.register_class("Animal", None, vec![FieldDescriptor::new("den", node_ty)]);
    let derived = reg.register_class(
        "Fox",
        Some(base),
        vec![FieldDescriptor::new("tail", reg.leaf(LeafKind::I64))],
    );

    let den = node(&reg, 3);
    let source = Value::object(base, vec![den.clone()]);
    let target = Value::object(derived, vec![Value::Null, Value::Int(42)]);

    let result = engine.deep_clone_into(&source, &target);
    assert!(result.is_ok());

    let filled = target.object_field(0).unwrap_or(Value::Null);
    assert!(!filled.ref_eq(&den));
    assert_eq!(filled.object_field(0), Some(Value::Int(3)));
    // Slots past the source layout are untouched.
    assert_eq!(target.object_field(1), Some(Value::Int(42)));
}

#[test]
fn ancestor_target_is_rejected() {
    let engine = engine();
    let reg = engine.registry().clone();
    let base = reg.register_class("Animal", None, vec![]);
    let derived = reg.register_class("Fox", Some(base), vec![]);

    let source = Value::object(derived, vec![]);
    let target = Value::object(base, vec![]);

    match engine.deep_clone_into(&source, &target) {
        Err(CloneError::ArgumentMismatch {
            source_type,
            target_type,
        }) => {
            assert_eq!(source_type, "Fox");
            assert_eq!(target_type, "Animal");
        }
        other => panic!("expected argument mismatch, got {other:?}"),
    }
}

#[test]
fn unrelated_types_are_rejected() {
    let engine = engine();
    let reg = engine.registry().clone();
    let a = reg.register_class("A", None, vec![]);
    let b = reg.register_class("B", None, vec![]);

    let result = engine.deep_clone_into(&Value::object(a, vec![]), &Value::object(b, vec![]));
    assert!(matches!(result, Err(CloneError::ArgumentMismatch { .. })));
}

#[test]
fn null_target_mirrors_back_null() {
    let engine = engine();
    let reg = engine.registry().clone();
    let source = node(&reg, 1);
    assert_eq!(engine.deep_clone_into(&source, &Value::Null), Ok(Value::Null));
    // Even a null source is fine when the target is null.
    assert_eq!(engine.deep_clone_into(&Value::Null, &Value::Null), Ok(Value::Null));
}

#[test]
fn null_source_with_present_target_is_an_error() {
    let engine = engine();
    let reg = engine.registry().clone();
    let target = node(&reg, 1);
    assert_eq!(
        engine.deep_clone_into(&Value::Null, &target),
        Err(CloneError::MissingSource)
    );
}

#[test]
fn string_source_is_unsupported() {
    let engine = engine();
    let reg = engine.registry().clone();
    let target = node(&reg, 1);
    assert_eq!(
        engine.deep_clone_into(&Value::string("nope"), &target),
        Err(CloneError::UnsupportedTarget)
    );
}

#[test]
fn non_object_pair_is_a_mismatch() {
    let engine = engine();
    let result = engine.deep_clone_into(&Value::Int(1), &Value::Int(2));
    assert!(matches!(result, Err(CloneError::ArgumentMismatch { .. })));
}

#[test]
fn self_reference_in_the_source_resolves_to_the_target() {
    let engine = engine();
    let reg = engine.registry().clone();

    let source = node(&reg, 1);
    source.set_object_field(1, source.clone());
    let target = node(&reg, 0);

    let result = engine.deep_clone_into(&source, &target);
    assert!(result.is_ok());
    // The identity map is seeded with source -> target, so the
    // back-reference lands on the target itself.
    let next = target.object_field(1).unwrap_or(Value::Null);
    assert!(next.ref_eq(&target));
    assert_eq!(target.object_field(0), Some(Value::Int(1)));
}

#[test]
fn array_into_copies_the_overlapping_prefix() {
    let engine = engine();
    let reg = engine.registry().clone();
    let node_ty = node_type(&reg);
    let ty = reg.array_of(node_ty, 1, true);

    let source = Value::array(ty, vec![node(&reg, 1), node(&reg, 2), node(&reg, 3)]);
    let target = Value::array(ty, vec![Value::Null, Value::Null]);

    let result = engine.deep_clone_into(&source, &target);
    let out = result.unwrap_or(Value::Null);
    assert!(out.ref_eq(&target));

    // Only the two overlapping slots are written.
    let e0 = target.array_elem(0).unwrap_or(Value::Null);
    assert!(!e0.ref_eq(&source.array_elem(0).unwrap_or(Value::Null)));
    assert_eq!(e0.object_field(0), Some(Value::Int(1)));
    assert_eq!(
        target
            .array_elem(1)
            .unwrap_or(Value::Null)
            .object_field(0),
        Some(Value::Int(2))
    );
    assert_eq!(target.array_elem(2), None);
}

#[test]
fn array_into_requires_the_identical_array_type() {
    let engine = engine();
    let reg = engine.registry().clone();
    let ints = reg.array_of(reg.leaf(LeafKind::I64), 1, true);
    let strs = reg.array_of(reg.leaf(LeafKind::Str), 1, true);

    let source = Value::array(ints, vec![Value::Int(1)]);
    let target = Value::array(strs, vec![Value::string("x")]);
    let result = engine.deep_clone_into(&source, &target);
    assert!(matches!(result, Err(CloneError::ArgumentMismatch { .. })));
}

#[test]
fn array_into_skips_slots_the_target_does_not_back() {
    let engine = engine();
    let reg = engine.registry().clone();
    let node_ty = node_type(&reg);
    let ty = reg.array_of(node_ty, 2, true);

    let source = Value::array_with_dims(
        ty,
        smallvec![ArrayDim::new(0, 2), ArrayDim::new(0, 3)],
        (0..6).map(|i| node(&reg, i)).collect(),
    );
    // The target's dims promise six slots but only four are backed.
    let target = Value::array_with_dims(
        ty,
        smallvec![ArrayDim::new(0, 2), ArrayDim::new(0, 3)],
        vec![Value::Null; 4],
    );

    let result = engine.deep_clone_into(&source, &target);
    assert!(result.is_ok());
    for flat in 0..4 {
        let cell = target.array_elem(flat).unwrap_or(Value::Null);
        let expected = i64::try_from(flat).unwrap_or(0);
        assert_eq!(cell.object_field(0), Some(Value::Int(expected)));
    }
    assert_eq!(target.array_elem(4), None);
}

#[test]
fn shallow_array_into_aliases_elements() {
    let engine = engine();
    let reg = engine.registry().clone();
    let node_ty = node_type(&reg);
    let ty = reg.array_of(node_ty, 1, true);

    let shared = node(&reg, 9);
    let source = Value::array(ty, vec![shared.clone()]);
    let target = Value::array(ty, vec![Value::Null]);

    let result = engine.shallow_clone_into(&source, &target);
    assert!(result.is_ok());
    let elem = target.array_elem(0).unwrap_or(Value::Null);
    assert!(elem.ref_eq(&shared));
}
