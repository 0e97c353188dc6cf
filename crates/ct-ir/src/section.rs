//! Sections: timeline segments chained into a playback order.

use arrayvec::ArrayString;

use crate::event::{find_event, Event};
use crate::object::{Handle, ObjRef};
use crate::units::{Ticks, TICKS_PER_BEAT};

/// A timeline segment with per-track event lists.
///
/// `next` does not own its target and may point anywhere, including back to
/// an earlier section or to this one, to form loops.
#[derive(Clone, Debug)]
pub struct Section {
    /// Section name
    pub name: ArrayString<32>,
    /// Length in ticks
    pub length: Ticks,
    /// Tempo override in BPM (`None` = inherit)
    pub tempo: Option<u16>,
    /// Beats per bar override (`None` = inherit)
    pub meter: Option<u16>,
    /// Section played after this one (`None` = stop)
    pub next: Option<ObjRef<Section>>,
    /// Events per track, each list strictly ascending by time
    pub track_events: Vec<Vec<Event>>,
}

impl Default for Section {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            length: TICKS_PER_BEAT * 4,
            tempo: None,
            meter: None,
            next: None,
            track_events: Vec::new(),
        }
    }
}

impl Section {
    /// Create an empty section of `length` ticks with `num_tracks` event lists.
    pub fn new(length: Ticks, num_tracks: usize) -> Self {
        Self {
            length,
            track_events: vec![Vec::new(); num_tracks],
            ..Default::default()
        }
    }

    /// Events on `track`, empty if the track has no list here.
    pub fn events(&self, track: usize) -> &[Event] {
        self.track_events.get(track).map_or(&[][..], Vec::as_slice)
    }

    /// Mutable event list for `track`, growing the per-track lists if needed.
    pub fn events_mut(&mut self, track: usize) -> &mut Vec<Event> {
        if self.track_events.len() <= track {
            self.track_events.resize_with(track + 1, Vec::new);
        }
        &mut self.track_events[track]
    }

    /// Make sure there are at least `num_tracks` event lists.
    pub fn ensure_tracks(&mut self, num_tracks: usize) {
        if self.track_events.len() < num_tracks {
            self.track_events.resize_with(num_tracks, Vec::new);
        }
    }

    /// The event on `track` exactly at `time`.
    pub fn event_at(&self, track: usize, time: Ticks) -> Option<&Event> {
        let events = self.events(track);
        events.get(find_event(events, time)).filter(|e| e.time == time)
    }

    /// Resolve `next`, skipping deleted sections.
    pub fn next_section(&self) -> Option<Handle<Section>> {
        self.next.as_ref()?.resolve()
    }

    /// Point `next` at `section` (or clear it).
    pub fn link(&mut self, section: Option<&Handle<Section>>) {
        self.next = section.map(ObjRef::new);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::SongObject;

    #[test]
    fn events_out_of_range_track_is_empty() {
        let s = Section::new(192, 2);
        assert!(s.events(5).is_empty());
    }

    #[test]
    fn events_mut_grows_lists() {
        let mut s = Section::new(192, 1);
        s.events_mut(3).push(Event::at(0));
        assert_eq!(s.track_events.len(), 4);
    }

    #[test]
    fn event_at_requires_exact_tick() {
        let mut s = Section::new(192, 1);
        s.events_mut(0).push(Event::at(10).with_pitch(1));
        assert!(s.event_at(0, 10).is_some());
        assert!(s.event_at(0, 11).is_none());
        assert!(s.event_at(0, 9).is_none());
    }

    #[test]
    fn self_link_resolves_to_self() {
        let h = SongObject::new_handle(Section::new(4, 0));
        h.write().link(Some(&h));
        let next = h.read().next_section().unwrap();
        assert!(std::sync::Arc::ptr_eq(&next, &h));
    }

    #[test]
    fn next_to_deleted_section_resolves_none() {
        let a = SongObject::new_handle(Section::new(4, 0));
        let b = SongObject::new_handle(Section::new(4, 0));
        a.write().link(Some(&b));
        b.mark_deleted();
        assert!(a.read().next_section().is_none());
    }
}
