//! Undo/redo history of song operations.

use std::sync::Arc;

use ct_ir::Song;
use log::{debug, info};

use crate::operation::{Operation, SongOp};

/// Linear undo/redo history bound to one song.
///
/// Entries below `position` are applied; entries above it can be redone.
/// Applying a new operation drops the redo part.
pub struct Undoer {
    song: Arc<Song>,
    entries: Vec<SongOp>,
    position: usize,
    /// The top applied entry absorbs further continuous edits of its kind
    continuous: bool,
}

impl Undoer {
    pub fn new(song: Arc<Song>) -> Self {
        Self {
            song,
            entries: Vec::new(),
            position: 0,
            continuous: false,
        }
    }

    pub fn song(&self) -> &Arc<Song> {
        &self.song
    }

    /// Forget all history and target `song`.
    pub fn reset(&mut self, song: Arc<Song>) {
        self.song = song;
        self.entries.clear();
        self.position = 0;
        self.continuous = false;
    }

    /// Apply `op` and record it. Returns false (and records nothing) if it
    /// had no effect.
    pub fn apply(&mut self, op: SongOp) -> bool {
        self.apply_continuous(op, false)
    }

    /// Apply `op`. With `continuous`, an op of the same kind and target as
    /// the previous continuous one replaces it in place: the previous value
    /// is undone and the new one applied, so the whole gesture is one step.
    pub fn apply_continuous(&mut self, mut op: SongOp, continuous: bool) -> bool {
        if continuous && self.continuous && self.position > 0 {
            let top = self.position - 1;
            if self.entries[top].coalesces_with(&op) {
                self.entries[top].undo_it(&self.song);
                if op.do_it(&self.song) {
                    self.entries[top] = op;
                    return true;
                }
                // the gesture came back to where it started
                self.entries.truncate(top);
                self.position = top;
                self.continuous = false;
                return false;
            }
        }

        self.continuous = false;
        if !op.do_it(&self.song) {
            debug!("operation had no effect, not recorded");
            return false;
        }
        self.entries.truncate(self.position);
        self.entries.push(op);
        self.position = self.entries.len();
        self.continuous = continuous;
        true
    }

    /// Stop merging continuous edits into the top entry.
    pub fn end_continuous(&mut self) {
        self.continuous = false;
    }

    /// Undo the last applied operation. Returns false if there was none.
    pub fn undo(&mut self) -> bool {
        self.continuous = false;
        if self.position == 0 {
            info!("Nothing to undo");
            return false;
        }
        self.position -= 1;
        self.entries[self.position].undo_it(&self.song);
        true
    }

    /// Redo the last undone operation. Returns false if there was none.
    pub fn redo(&mut self) -> bool {
        self.continuous = false;
        if self.position >= self.entries.len() {
            info!("Nothing to redo");
            return false;
        }
        self.entries[self.position].do_it(&self.song);
        self.position += 1;
        true
    }

    pub fn can_undo(&self) -> bool {
        self.position > 0
    }

    pub fn can_redo(&self) -> bool {
        self.position < self.entries.len()
    }
}
