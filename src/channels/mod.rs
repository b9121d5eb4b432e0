//! Structurally-shared, clone-on-write slices of simulation state.
//!
//! Each field of [`crate::state::SimulationState`] is a [`Slice<T>`]: an
//! `Arc`-backed value that is cheap to clone and whose identity survives a
//! state update unless the update actually changed its payload. This is the
//! mechanism behind the state store's structural-sharing guarantee: two
//! checkpoints that did not touch a given slice share the same `Arc` pointer
//! for it.

use std::sync::Arc;

/// A single structurally-shared slice of state.
#[derive(Debug)]
pub struct Slice<T> {
    inner: Arc<T>,
}

impl<T> Clone for Slice<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: PartialEq> PartialEq for Slice<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || *self.inner == *other.inner
    }
}
impl<T: Eq> Eq for Slice<T> {}

impl<T> Slice<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Borrow the payload.
    pub fn get(&self) -> &T {
        &self.inner
    }

    /// True if `self` and `other` point at the same allocation. Two slices
    /// that were never touched between two checkpoints must compare true
    /// here.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone> Slice<T> {
    /// Apply `updater` to a clone of the payload. If `updater` returns a value
    /// that round-trips back to something behaviorally identical, callers
    /// should prefer [`Self::replace_if_changed`] so the `Arc` pointer is
    /// preserved; this method always allocates a new `Arc`.
    pub fn map(&self, updater: impl FnOnce(&T) -> T) -> Self {
        Self::new(updater(&self.inner))
    }
}

impl<T: Clone + PartialEq> Slice<T> {
    /// Apply `updater`; if the resulting value equals the current payload by
    /// value, keep the existing `Arc` (preserving pointer identity) instead
    /// of allocating a new one that just happens to compare equal.
    pub fn replace_if_changed(&self, updater: impl FnOnce(&T) -> T) -> Self {
        let next = updater(&self.inner);
        if next == *self.inner {
            self.clone()
        } else {
            Self::new(next)
        }
    }
}

impl<T: Default> Default for Slice<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
