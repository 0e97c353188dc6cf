//! Section membership and the `next` graph.
//!
//! These operations hold the song lock for membership and then lock each
//! section in turn, never two at once.

use std::sync::Arc;

use ct_ir::{find_event, Event, Handle, ObjRef, Section, Song, SongObject, Ticks};
use log::debug;

use crate::operation::{OpTarget, Operation};

/// Insert a section at `index` in song order.
#[derive(Clone, Debug)]
pub struct AddSection {
    index: usize,
    section: Handle<Section>,
}

impl AddSection {
    pub fn new(index: usize, section: Handle<Section>) -> Self {
        Self { index, section }
    }

    pub fn section(&self) -> &Handle<Section> {
        &self.section
    }

    pub(crate) fn op_target(&self) -> OpTarget {
        OpTarget::object(&self.section)
    }
}

impl Operation for AddSection {
    fn do_it(&mut self, song: &Song) -> bool {
        let mut members = song.write();
        if members.section_index(&self.section).is_some() {
            return false;
        }
        self.index = self.index.min(members.sections.len());
        self.section.write().ensure_tracks(members.tracks.len());
        self.section.restore();
        members.sections.insert(self.index, self.section.clone());
        true
    }

    fn undo_it(&mut self, song: &Song) {
        let mut members = song.write();
        if let Some(index) = members.section_index(&self.section) {
            members.sections.remove(index);
        }
        self.section.mark_deleted();
    }
}

/// Remove a section, pointing every link to it at its own `next`.
///
/// The last section of a song cannot be deleted.
#[derive(Clone, Debug)]
pub struct DeleteSection {
    section: Handle<Section>,
    index: usize,
    /// Sections whose `next` was rewritten, with the old value
    prev_links: Vec<(Handle<Section>, Option<ObjRef<Section>>)>,
}

impl DeleteSection {
    pub fn new(section: Handle<Section>) -> Self {
        Self {
            section,
            index: 0,
            prev_links: Vec::new(),
        }
    }

    pub(crate) fn op_target(&self) -> OpTarget {
        OpTarget::object(&self.section)
    }
}

impl Operation for DeleteSection {
    fn do_it(&mut self, song: &Song) -> bool {
        let mut members = song.write();
        if members.sections.len() <= 1 {
            debug!("refusing to delete the last section");
            return false;
        }
        let Some(index) = members.section_index(&self.section) else {
            debug!("delete section: not in song");
            return false;
        };
        self.index = index;
        members.sections.remove(index);

        // a self-link has nowhere to go once the section is gone
        let replacement = self
            .section
            .read()
            .next
            .clone()
            .filter(|next| !next.points_to(&self.section));
        self.section.mark_deleted();

        self.prev_links.clear();
        for other in &members.sections {
            let mut state = other.write();
            if state.next.as_ref().is_some_and(|n| n.points_to(&self.section)) {
                let old = std::mem::replace(&mut state.next, replacement.clone());
                self.prev_links.push((other.clone(), old));
            }
        }
        true
    }

    fn undo_it(&mut self, song: &Song) {
        let mut members = song.write();
        self.section.restore();
        let index = self.index.min(members.sections.len());
        members.sections.insert(index, self.section.clone());
        for (other, old) in self.prev_links.drain(..) {
            other.write().next = old;
        }
    }
}

/// Split a section in two at `pos` ticks.
///
/// The first half keeps the original section's identity, tempo and meter
/// and ends at `pos`. The second half is a new section inserted right after
/// it in song order, holding the later events shifted back by `pos`; it
/// inherits tempo and meter and takes over the original `next`. The first
/// half then links to the second.
#[derive(Clone, Debug)]
pub struct SliceSection {
    section: Handle<Section>,
    pos: Ticks,
    /// Second half; kept so redo restores the same object
    tail: Option<Handle<Section>>,
}

impl SliceSection {
    pub fn new(section: Handle<Section>, pos: Ticks) -> Self {
        Self {
            section,
            pos,
            tail: None,
        }
    }

    /// The section created by the last `do_it`.
    pub fn tail(&self) -> Option<&Handle<Section>> {
        self.tail.as_ref()
    }

    pub(crate) fn op_target(&self) -> OpTarget {
        OpTarget::object(&self.section)
    }
}

impl Operation for SliceSection {
    /// Returns false unless `pos` lies strictly inside the section.
    fn do_it(&mut self, song: &Song) -> bool {
        let mut members = song.write();
        let Some(index) = members.section_index(&self.section) else {
            return false;
        };

        let tail_state = {
            let head = self.section.read();
            if self.pos <= 0 || self.pos >= head.length {
                debug!("slice position {} outside section of {} ticks", self.pos, head.length);
                return false;
            }
            let mut tail = Section::new(head.length - self.pos, 0);
            tail.name = head.name;
            tail.next = head.next.clone();
            tail.track_events = head
                .track_events
                .iter()
                .map(|events| {
                    let split = find_event(events, self.pos);
                    events[split..]
                        .iter()
                        .map(|e| Event {
                            time: e.time - self.pos,
                            ..e.clone()
                        })
                        .collect()
                })
                .collect();
            tail
        };

        let tail = match &self.tail {
            Some(tail) => {
                *tail.write() = tail_state;
                tail.restore();
                tail.clone()
            }
            None => {
                let tail = SongObject::new_handle(tail_state);
                self.tail = Some(tail.clone());
                tail
            }
        };

        {
            let mut head = self.section.write();
            head.length = self.pos;
            for events in &mut head.track_events {
                let split = find_event(events, self.pos);
                events.truncate(split);
            }
            head.link(Some(&tail));
        }
        members.sections.insert(index + 1, tail);
        true
    }

    fn undo_it(&mut self, song: &Song) {
        let Some(tail) = self.tail.clone() else {
            return;
        };
        let mut members = song.write();
        if let Some(index) = members.sections.iter().position(|s| Arc::ptr_eq(s, &tail)) {
            members.sections.remove(index);
        }
        tail.mark_deleted();

        let (length, next, track_events) = {
            let mut state = tail.write();
            (state.length, state.next.take(), std::mem::take(&mut state.track_events))
        };
        let mut head = self.section.write();
        head.length += length;
        head.next = next;
        for (track, events) in track_events.into_iter().enumerate() {
            head.events_mut(track).extend(events.into_iter().map(|mut e| {
                e.time += self.pos;
                e
            }));
        }
    }
}
