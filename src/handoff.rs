//! Lock-free handoff of the device table to the interrupt plane.
//!
//! The control plane edits the table in place; the zero-cross interrupt copies
//! it only when it is dirty and no edit is in progress. The interrupt never
//! waits: a refresh that meets an edit is skipped and retried on the next
//! half-cycle.

use core::cell::UnsafeCell;

use critical_section::CriticalSection;
use portable_atomic::{AtomicBool, Ordering};

pub(crate) struct Handoff<T> {
    value: UnsafeCell<T>,
    editing: AtomicBool,
    dirty: AtomicBool,
}

// SAFETY: `edit` is only reachable through `Control`, which is handed out once
// and requires `&mut self`, so there is a single writer. The writer raises
// `editing` inside a critical section, and readers check it inside a critical
// section before touching the value, so no reader overlaps an edit.
unsafe impl<T: Send> Sync for Handoff<T> {}

impl<T> Handoff<T> {
    pub(crate) const fn new(value: T) -> Self {
        Self {
            value: UnsafeCell::new(value),
            editing: AtomicBool::new(false),
            dirty: AtomicBool::new(true),
        }
    }

    /// Mutate the value and mark it dirty. Single writer only.
    pub(crate) fn edit<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section::with(|_| self.editing.store(true, Ordering::Relaxed));
        // SAFETY: `editing` is set, so interrupt-side readers back off, and the
        // single writer holds no other reference.
        let result = f(unsafe { &mut *self.value.get() });
        self.dirty.store(true, Ordering::Relaxed);
        self.editing.store(false, Ordering::Release);
        result
    }

    /// Read the value from the writer's side.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        // SAFETY: called by the single writer, which is not editing now;
        // concurrent interrupt-side access is read-only.
        f(unsafe { &*self.value.get() })
    }

    /// Read the value from the interrupt plane if it changed since the last
    /// copy and no edit is in progress.
    pub(crate) fn copy_if_dirty<R>(
        &self,
        _cs: CriticalSection<'_>,
        f: impl FnOnce(&T) -> R,
    ) -> Option<R> {
        if self.editing.load(Ordering::Acquire) || !self.dirty.load(Ordering::Acquire) {
            return None;
        }
        self.dirty.store(false, Ordering::Relaxed);
        // SAFETY: inside a critical section with `editing` clear, the writer
        // cannot start or be in the middle of an edit.
        Some(f(unsafe { &*self.value.get() }))
    }
}
