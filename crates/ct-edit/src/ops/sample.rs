//! Sample membership.

use ct_ir::{find_event, Handle, ObjRef, Sample, Section, Song, Ticks};
use log::debug;

use crate::operation::{OpTarget, Operation};

/// Insert a sample at `index`.
#[derive(Clone, Debug)]
pub struct AddSample {
    index: usize,
    sample: Handle<Sample>,
}

impl AddSample {
    pub fn new(index: usize, sample: Handle<Sample>) -> Self {
        Self { index, sample }
    }

    pub(crate) fn op_target(&self) -> OpTarget {
        OpTarget::object(&self.sample)
    }
}

impl Operation for AddSample {
    fn do_it(&mut self, song: &Song) -> bool {
        let mut members = song.write();
        if members.sample_index(&self.sample).is_some() {
            return false;
        }
        self.index = self.index.min(members.samples.len());
        self.sample.restore();
        members.samples.insert(self.index, self.sample.clone());
        true
    }

    fn undo_it(&mut self, song: &Song) {
        let mut members = song.write();
        if let Some(index) = members.sample_index(&self.sample) {
            members.samples.remove(index);
        }
        self.sample.mark_deleted();
    }
}

/// An event that referenced a deleted sample.
#[derive(Clone, Debug)]
struct EventRef {
    section: Handle<Section>,
    track: usize,
    time: Ticks,
}

/// Remove a sample and clear every event's reference to it.
#[derive(Clone, Debug)]
pub struct DeleteSample {
    sample: Handle<Sample>,
    index: usize,
    events: Vec<EventRef>,
}

impl DeleteSample {
    pub fn new(sample: Handle<Sample>) -> Self {
        Self {
            sample,
            index: 0,
            events: Vec::new(),
        }
    }

    pub(crate) fn op_target(&self) -> OpTarget {
        OpTarget::object(&self.sample)
    }
}

impl Operation for DeleteSample {
    fn do_it(&mut self, song: &Song) -> bool {
        let mut members = song.write();
        let Some(index) = members.sample_index(&self.sample) else {
            debug!("delete sample: not in song");
            return false;
        };
        self.index = index;
        members.samples.remove(index);
        self.sample.mark_deleted();

        self.events.clear();
        for handle in &members.sections {
            let mut section = handle.write();
            for (track, events) in section.track_events.iter_mut().enumerate() {
                for event in events.iter_mut() {
                    if event.sample.as_ref().is_some_and(|s| s.points_to(&self.sample)) {
                        event.sample = None;
                        self.events.push(EventRef {
                            section: handle.clone(),
                            track,
                            time: event.time,
                        });
                    }
                }
            }
        }
        true
    }

    fn undo_it(&mut self, song: &Song) {
        let mut members = song.write();
        self.sample.restore();
        let index = self.index.min(members.samples.len());
        members.samples.insert(index, self.sample.clone());
        drop(members);

        for event_ref in self.events.drain(..) {
            let mut section = event_ref.section.write();
            let events = section.events_mut(event_ref.track);
            let i = find_event(events, event_ref.time);
            if let Some(event) = events.get_mut(i).filter(|e| e.time == event_ref.time) {
                event.sample = Some(ObjRef::new(&self.sample));
            }
        }
    }
}
