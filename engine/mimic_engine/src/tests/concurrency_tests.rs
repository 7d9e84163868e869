//! Concurrent callers, strategy pre-warming and the cache lifecycle.

use std::thread;

use pretty_assertions::assert_eq;

use mimic_value::{LeafKind, Value};

use crate::CloneMode;

use super::fixtures::{engine, link, node, node_type};

#[test]
fn concurrent_clones_synthesize_each_strategy_once() {
    let engine = engine();
    let reg = engine.registry().clone();

    let a = node(&reg, 1);
    let b = node(&reg, 2);
    link(&a, &b);
    link(&b, &a);

    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..50 {
                    let clone = engine.deep_clone(&a);
                    let next = clone.object_field(1).unwrap_or(Value::Null);
                    let back = next.object_field(1).unwrap_or(Value::Null);
                    assert!(back.ref_eq(&clone));
                }
            });
        }
    });

    // One type, one mode: exactly one synthesis across all callers.
    assert_eq!(engine.synth_count(), 1);
}

#[test]
fn concurrent_prewarm_builds_once() {
    let engine = engine();
    let reg = engine.registry().clone();
    let node_ty = node_type(&reg);

    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                assert!(engine.prewarm(node_ty, CloneMode::Deep));
            });
        }
    });
    assert_eq!(engine.synth_count(), 1);

    // A later clone of that type reuses the pre-built strategy.
    let clone = engine.deep_clone(&node(&reg, 1));
    assert_eq!(clone.object_field(0), Some(Value::Int(1)));
    assert_eq!(engine.synth_count(), 1);
}

#[test]
fn prewarm_declines_safe_types() {
    let engine = engine();
    let reg = engine.registry().clone();

    assert!(!engine.prewarm(reg.leaf(LeafKind::I64), CloneMode::Deep));
    assert!(!engine.prewarm(reg.leaf(LeafKind::Str), CloneMode::Shallow));
    assert_eq!(engine.synth_count(), 0);
}

#[test]
fn deep_and_shallow_are_separate_cache_keys() {
    let engine = engine();
    let reg = engine.registry().clone();
    let node_ty = node_type(&reg);

    assert!(engine.prewarm(node_ty, CloneMode::Deep));
    assert!(engine.prewarm(node_ty, CloneMode::Shallow));
    assert_eq!(engine.synth_count(), 2);
}

#[test]
fn reset_all_discards_verdicts_and_strategies() {
    let engine = engine();
    let reg = engine.registry().clone();

    let n = node(&reg, 1);
    let _ = engine.deep_clone(&n);
    assert_eq!(engine.synth_count(), 1);

    engine.reset_all();
    assert_eq!(engine.synth_count(), 0);

    // Cloning after the reset re-classifies and re-synthesizes.
    let clone = engine.deep_clone(&n);
    assert!(!clone.ref_eq(&n));
    assert_eq!(engine.synth_count(), 1);
}
