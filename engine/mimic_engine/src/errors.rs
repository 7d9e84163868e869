//! Error taxonomy for the clone-into operations.
//!
//! The plain `deep_clone`/`shallow_clone` operations are total: cycles,
//! self-references and shared sub-structure are normal inputs, and the
//! engine never invokes user-defined behavior that could fail. Only the
//! clone-into variants validate their arguments, synchronously, with no
//! internal retry.

use thiserror::Error;

/// Result of a clone-into operation.
pub type CloneResult = Result<mimic_value::Value, CloneError>;

/// Failure of a clone-into operation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CloneError {
    /// The target's runtime type is neither the source's type nor a
    /// descendant of it.
    #[error("target type `{target_type}` is not `{source_type}` or a descendant of it")]
    ArgumentMismatch {
        source_type: String,
        target_type: String,
    },

    /// Cloning into an immutable string is forbidden.
    #[error("cannot clone into an immutable string")]
    UnsupportedTarget,

    /// The source is null while the target is not.
    #[error("cannot copy a null source into an existing target")]
    MissingSource,
}
