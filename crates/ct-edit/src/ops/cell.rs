//! Event-list edits on one track of one section.
//!
//! Every index is found again with a binary search at apply time, so an
//! operation stays valid even if other edits moved events around since it
//! was recorded.

use ct_ir::{find_event, Event, EventMask, Handle, Section, Song, Ticks, TrackCursor};

use crate::operation::{OpTarget, Operation};

/// Edits never add event lists for tracks the song does not have.
fn has_track(section: &Section, track: usize) -> bool {
    track < section.track_events.len()
}

/// Remove every event in `[time, time + size)` on one track.
#[derive(Clone, Debug)]
pub struct ClearCell {
    cursor: TrackCursor,
    size: Ticks,
    section: Option<Handle<Section>>,
    cleared: Vec<Event>,
}

impl ClearCell {
    pub fn new(cursor: TrackCursor, size: Ticks) -> Self {
        Self {
            cursor,
            size,
            section: None,
            cleared: Vec::new(),
        }
    }

    /// Events removed by the last `do_it`.
    pub fn cleared(&self) -> &[Event] {
        &self.cleared
    }

    pub(crate) fn op_target(&self) -> OpTarget {
        OpTarget::cell(&self.cursor)
    }

    /// Resolve the section once; later calls reuse it even if it is deleted
    /// again, since undo order guarantees it is alive when needed.
    fn section(&mut self) -> Option<Handle<Section>> {
        if self.section.is_none() {
            self.section = self.cursor.cursor.section();
        }
        self.section.clone()
    }

    fn clear(&mut self, section: &mut Section) -> bool {
        let time = self.cursor.cursor.time;
        let events = section.events_mut(self.cursor.track);
        let start = find_event(events, time);
        let end = find_event(events, time + self.size.max(0));
        self.cleared = events.drain(start..end).collect();
        !self.cleared.is_empty()
    }

    fn restore(&mut self, section: &mut Section) {
        let Some(first) = self.cleared.first() else {
            return;
        };
        let events = section.events_mut(self.cursor.track);
        let index = find_event(events, first.time);
        events.splice(index..index, self.cleared.drain(..));
    }
}

impl Operation for ClearCell {
    /// Returns false if there was nothing to clear.
    fn do_it(&mut self, _song: &Song) -> bool {
        let Some(handle) = self.section() else {
            return false;
        };
        let mut section = handle.write();
        if !has_track(&section, self.cursor.track) {
            return false;
        }
        self.clear(&mut section)
    }

    fn undo_it(&mut self, _song: &Song) {
        if let Some(handle) = self.section.clone() {
            self.restore(&mut handle.write());
        }
    }
}

/// Clear a cell, then put one event at its start.
#[derive(Clone, Debug)]
pub struct WriteCell {
    clear: ClearCell,
    event: Event,
}

impl WriteCell {
    /// `size` is at least one tick, so the write replaces any event already
    /// at the cursor.
    pub fn new(cursor: TrackCursor, size: Ticks, event: Event) -> Self {
        Self {
            clear: ClearCell::new(cursor, size.max(1)),
            event,
        }
    }

    pub(crate) fn op_target(&self) -> OpTarget {
        self.clear.op_target()
    }
}

impl Operation for WriteCell {
    fn do_it(&mut self, _song: &Song) -> bool {
        let time = self.clear.cursor.cursor.time;
        if time < 0 {
            return false;
        }
        let Some(handle) = self.clear.section() else {
            return false;
        };
        let mut section = handle.write();
        if !has_track(&section, self.clear.cursor.track) {
            return false;
        }
        self.clear.clear(&mut section);
        let mut event = self.event.clone();
        event.time = time;
        let events = section.events_mut(self.clear.cursor.track);
        let index = find_event(events, time);
        events.insert(index, event);
        true
    }

    fn undo_it(&mut self, _song: &Song) {
        let Some(handle) = self.clear.section.clone() else {
            return;
        };
        let mut section = handle.write();
        let time = self.clear.cursor.cursor.time;
        let events = section.events_mut(self.clear.cursor.track);
        let index = find_event(events, time);
        if events.get(index).is_some_and(|e| e.time == time) {
            events.remove(index);
        }
        self.clear.restore(&mut section);
    }
}

/// Overwrite selected fields of the event at the cursor, inserting an empty
/// event first if there is none.
#[derive(Clone, Debug)]
pub struct MergeEvent {
    cursor: TrackCursor,
    event: Event,
    mask: EventMask,
    section: Option<Handle<Section>>,
    /// Event before the merge; `None` if the merge inserted it
    prev: Option<Event>,
}

impl MergeEvent {
    pub fn new(cursor: TrackCursor, event: Event, mask: EventMask) -> Self {
        Self {
            cursor,
            event,
            mask,
            section: None,
            prev: None,
        }
    }

    pub(crate) fn op_target(&self) -> OpTarget {
        OpTarget::cell(&self.cursor)
    }
}

impl Operation for MergeEvent {
    fn do_it(&mut self, _song: &Song) -> bool {
        let time = self.cursor.cursor.time;
        if time < 0 {
            return false;
        }
        if self.section.is_none() {
            self.section = self.cursor.cursor.section();
        }
        let Some(handle) = self.section.clone() else {
            return false;
        };
        let mut section = handle.write();
        if !has_track(&section, self.cursor.track) {
            return false;
        }
        let events = section.events_mut(self.cursor.track);
        let index = find_event(events, time);
        match events.get_mut(index).filter(|e| e.time == time) {
            Some(existing) => {
                self.prev = Some(existing.clone());
                existing.merge_masked(&self.event, self.mask);
            }
            None => {
                self.prev = None;
                let mut event = Event::at(time);
                event.merge_masked(&self.event, self.mask);
                events.insert(index, event);
            }
        }
        true
    }

    fn undo_it(&mut self, _song: &Song) {
        let Some(handle) = self.section.clone() else {
            return;
        };
        let mut section = handle.write();
        let time = self.cursor.cursor.time;
        let events = section.events_mut(self.cursor.track);
        let index = find_event(events, time);
        if !events.get(index).is_some_and(|e| e.time == time) {
            return;
        }
        match self.prev.take() {
            Some(prev) => events[index] = prev,
            None => {
                events.remove(index);
            }
        }
    }
}
