//! Stack safety for deep recursion.
//!
//! Graph traversal recurses once per edge, so adversarially deep graphs
//! would otherwise exhaust the call stack. Uses the `stacker` crate to
//! grow the stack on demand instead of imposing a depth limit.
//!
//! For WASM targets where stacker isn't available, the function just
//! calls the closure directly (WASM has its own stack management).

/// Ensure sufficient stack space is available before executing `f`.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Minimum stack space to keep available (100KB red zone).
    const RED_ZONE: usize = 100 * 1024;

    /// Stack space to allocate when growing (1MB).
    const STACK_PER_RECURSION: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM version - just call directly (WASM has its own stack management).
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
