//! Value setters.
//!
//! A setter holds the value to write. Applying it swaps that value with the
//! one in the target, so the same call both does and undoes it.

use core::fmt;
use core::mem;
use std::sync::Arc;

use ct_ir::{Handle, Song};

use crate::operation::{OpTarget, Operation};

/// Swap one field of a song entity.
pub struct SetField<T, V> {
    target: Handle<T>,
    field: fn(&mut T) -> &mut V,
    value: V,
    accepts: fn(&Song, &V) -> bool,
}

impl<T, V: PartialEq> SetField<T, V> {
    pub fn new(target: &Handle<T>, field: fn(&mut T) -> &mut V, value: V) -> Self {
        Self {
            target: target.clone(),
            field,
            value,
            accepts: |_, _| true,
        }
    }

    /// Refuse values that `accepts` rejects when applied.
    pub fn accepting(mut self, accepts: fn(&Song, &V) -> bool) -> Self {
        self.accepts = accepts;
        self
    }

    pub fn target(&self) -> &Handle<T> {
        &self.target
    }

    fn swap(&mut self) {
        let mut state = self.target.write();
        mem::swap((self.field)(&mut state), &mut self.value);
    }

    pub(crate) fn op_target(&self) -> OpTarget {
        OpTarget::object(&self.target)
    }
}

impl<T, V: PartialEq> Operation for SetField<T, V> {
    /// Returns false if the field already holds the value, the value is
    /// not accepted, or the target was deleted.
    fn do_it(&mut self, song: &Song) -> bool {
        if self.target.is_deleted() || !(self.accepts)(song, &self.value) {
            return false;
        }
        {
            let mut state = self.target.write();
            if *(self.field)(&mut state) == self.value {
                return false;
            }
        }
        self.swap();
        true
    }

    fn undo_it(&mut self, _song: &Song) {
        self.swap();
    }
}

impl<T, V: fmt::Debug> fmt::Debug for SetField<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetField")
            .field("target", &Arc::as_ptr(&self.target))
            .field("value", &self.value)
            .finish()
    }
}

/// Swap the song's master volume.
#[derive(Clone, Debug)]
pub struct SetSongVolume {
    volume: f32,
}

impl SetSongVolume {
    pub fn new(volume: f32) -> Self {
        Self { volume }
    }

    pub(crate) fn op_target(&self) -> OpTarget {
        OpTarget::Song
    }
}

impl Operation for SetSongVolume {
    fn do_it(&mut self, song: &Song) -> bool {
        let mut members = song.write();
        if members.volume == self.volume {
            return false;
        }
        mem::swap(&mut members.volume, &mut self.volume);
        true
    }

    fn undo_it(&mut self, song: &Song) {
        mem::swap(&mut song.write().volume, &mut self.volume);
    }
}
