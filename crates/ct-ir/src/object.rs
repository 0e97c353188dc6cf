//! Tombstone-aware shared ownership for song entities.
//!
//! Every sample, track and section lives behind a [`Handle`]. The song holds
//! one strong handle per member; undo history may hold more. Deleting an
//! entity sets its tombstone and drops the song's membership entry, but the
//! allocation survives as long as any holder does, so a deleted section can be
//! put back exactly as it was.
//!
//! Cross-entity references (a section's `next`, an event's sample, a voice's
//! sample) are [`ObjRef`]s. A normal [`ObjRef::resolve`] treats a tombstoned
//! object as gone.

use core::fmt;
use core::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A lockable song entity carrying a logical-deletion flag.
pub struct SongObject<T> {
    deleted: AtomicBool,
    state: RwLock<T>,
}

/// Strong, owning reference to a song entity.
pub type Handle<T> = Arc<SongObject<T>>;

impl<T> SongObject<T> {
    /// Wrap entity state in a fresh, live object.
    pub fn new(state: T) -> Self {
        Self {
            deleted: AtomicBool::new(false),
            state: RwLock::new(state),
        }
    }

    /// Wrap entity state and return an owning handle to it.
    pub fn new_handle(state: T) -> Handle<T> {
        Arc::new(Self::new(state))
    }

    /// Has this object been logically deleted?
    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    /// Tombstone the object. Normal resolves stop finding it.
    pub fn mark_deleted(&self) {
        self.deleted.store(true, Ordering::Release);
    }

    /// Clear the tombstone. Only undo brings objects back.
    pub fn restore(&self) {
        self.deleted.store(false, Ordering::Release);
    }

    /// Take the shared lock on the entity state.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.state.read()
    }

    /// Take the exclusive lock on the entity state.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.state.write()
    }
}

impl<T> fmt::Debug for SongObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SongObject")
            .field("addr", &(self as *const Self))
            .field("deleted", &self.is_deleted())
            .finish_non_exhaustive()
    }
}

/// Non-owning reference to a song entity.
pub struct ObjRef<T> {
    ptr: Weak<SongObject<T>>,
}

impl<T> ObjRef<T> {
    /// Reference the object behind `handle`.
    pub fn new(handle: &Handle<T>) -> Self {
        Self {
            ptr: Arc::downgrade(handle),
        }
    }

    /// A reference that never resolves.
    pub fn dangling() -> Self {
        Self { ptr: Weak::new() }
    }

    /// The object, unless it was freed or tombstoned.
    pub fn resolve(&self) -> Option<Handle<T>> {
        let handle = self.ptr.upgrade()?;
        if handle.is_deleted() {
            None
        } else {
            Some(handle)
        }
    }

    /// The object even if tombstoned; `None` only once it has been freed.
    pub fn resolve_even_if_deleted(&self) -> Option<Handle<T>> {
        self.ptr.upgrade()
    }

    /// Does this reference point at the object behind `handle`?
    pub fn points_to(&self, handle: &Handle<T>) -> bool {
        ptr::eq(self.ptr.as_ptr(), Arc::as_ptr(handle))
    }

    /// Do both references point at the same allocation?
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.ptr.ptr_eq(&other.ptr)
    }

    /// Address of the referenced object, for identity comparisons only.
    pub fn as_ptr(&self) -> *const SongObject<T> {
        self.ptr.as_ptr()
    }
}

impl<T> Clone for ObjRef<T> {
    fn clone(&self) -> Self {
        Self {
            ptr: self.ptr.clone(),
        }
    }
}

impl<T> Default for ObjRef<T> {
    fn default() -> Self {
        Self::dangling()
    }
}

impl<T> PartialEq for ObjRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> From<&Handle<T>> for ObjRef<T> {
    fn from(handle: &Handle<T>) -> Self {
        Self::new(handle)
    }
}

impl<T> fmt::Debug for ObjRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjRef({:p})", self.ptr.as_ptr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_live_object() {
        let handle = SongObject::new_handle(7u32);
        let weak = ObjRef::new(&handle);
        assert_eq!(*weak.resolve().unwrap().read(), 7);
    }

    #[test]
    fn tombstone_hides_object_but_keeps_allocation() {
        let handle = SongObject::new_handle(7u32);
        let weak = ObjRef::new(&handle);
        handle.mark_deleted();
        assert!(weak.resolve().is_none());
        assert!(weak.resolve_even_if_deleted().is_some());
    }

    #[test]
    fn restore_makes_object_resolvable_again() {
        let handle = SongObject::new_handle(1u8);
        let weak = ObjRef::new(&handle);
        handle.mark_deleted();
        handle.restore();
        assert!(weak.resolve().is_some());
    }

    #[test]
    fn freed_object_never_resolves() {
        let handle = SongObject::new_handle(1u8);
        let weak = ObjRef::new(&handle);
        drop(handle);
        assert!(weak.resolve().is_none());
        assert!(weak.resolve_even_if_deleted().is_none());
    }

    #[test]
    fn points_to_compares_identity() {
        let a = SongObject::new_handle(1u8);
        let b = SongObject::new_handle(1u8);
        let weak = ObjRef::new(&a);
        assert!(weak.points_to(&a));
        assert!(!weak.points_to(&b));
        assert_eq!(weak, ObjRef::new(&a));
        assert_ne!(weak, ObjRef::new(&b));
    }

    #[test]
    fn dangling_resolves_to_none() {
        let weak: ObjRef<u8> = ObjRef::dangling();
        assert!(weak.resolve().is_none());
    }
}
