//! Mimic engine: identity-preserving deep and shallow cloning for
//! runtime value graphs.
//!
//! Given any `mimic_value::Value`, heterogeneous and possibly
//! self-referential, the engine produces either a fully independent
//! copy (deep) or a copy of only the top-level container (shallow),
//! preserving shared-reference topology and cycles.
//!
//! # Architecture
//!
//! - `SafetyClassifier`: decides per type whether values are aliased
//!   instead of cloned; verdicts memoized for the process lifetime.
//! - `plan`: synthesizes a reusable `ClonePlan` once per (type, mode).
//! - `StrategyCache`: exactly-once, per-key-serialized memoization of
//!   synthesized strategies.
//! - `CloneState`: per-operation identity map, threaded explicitly
//!   through the traversal; preserves identity and breaks cycles.
//! - `CloneEngine`: the dispatch facade with the four public
//!   operations plus type-only strategy pre-warming and a full cache
//!   reset.
//!
//! User-overridable behaviors (equality, hashing, display, drop) are
//! never invoked; the engine works only on the value model's own
//! storage, so a type without an accessible constructor clones fine.

mod cache;
mod engine;
mod errors;
mod plan;
mod safety;
mod stack;
mod state;

pub use cache::StrategyCache;
pub use engine::CloneEngine;
pub use errors::{CloneError, CloneResult};
pub use plan::{ArrayPlan, CloneMode, ClonePlan, CloneStrategy, FieldStep};
pub use safety::SafetyClassifier;
pub use stack::ensure_sufficient_stack;
pub use state::CloneState;

#[cfg(test)]
mod tests;
