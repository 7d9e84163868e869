//! Thread-safe shared wrappers for heap values and registries.
//!
//! `Shared<T>` is the single way reference values reach the heap: an
//! `Arc<RwLock<T>>` whose allocation address doubles as the value's
//! identity. The clone engine keys its identity map on that address,
//! so two `Shared` handles compare equal iff they point at the same
//! allocation, never by content.

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared, mutable heap cell with stable identity.
pub struct Shared<T>(Arc<RwLock<T>>);

impl<T> Shared<T> {
    /// Allocate a new heap cell.
    pub fn new(value: T) -> Self {
        Shared(Arc::new(RwLock::new(value)))
    }

    /// Get read access to the cell.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read()
    }

    /// Get write access to the cell.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write()
    }

    /// Stable address of the allocation, used as the identity-map key.
    ///
    /// Valid for as long as any handle to the allocation is alive; the
    /// clone engine holds the source graph for the whole operation, so
    /// addresses recorded during a clone cannot be reused mid-clone.
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Reference identity: same allocation, not same content.
    pub fn ref_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Shared(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Deliberately shallow: shared cells can participate in cycles.
        write!(f, "Shared(@{:#x})", self.addr())
    }
}

/// Thread-safe shared registry wrapper (immutable handle).
///
/// The wrapped registry manages its own interior mutability; this
/// wrapper only provides cheap cloning and shared ownership.
pub struct SharedRegistry<T>(Arc<T>);

impl<T> SharedRegistry<T> {
    /// Create a new shared registry from an owned registry.
    pub fn new(registry: T) -> Self {
        SharedRegistry(Arc::new(registry))
    }
}

impl<T> Clone for SharedRegistry<T> {
    fn clone(&self) -> Self {
        SharedRegistry(Arc::clone(&self.0))
    }
}

impl<T> std::ops::Deref for SharedRegistry<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedRegistry({:?})", &*self.0)
    }
}
