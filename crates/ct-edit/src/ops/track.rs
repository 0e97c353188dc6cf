//! Track membership and solo.

use std::sync::Arc;

use ct_ir::{Event, Handle, Section, Song, Track};
use log::debug;

use crate::operation::{OpTarget, Operation};

/// Insert a track at `index`, with an empty event column in every section.
#[derive(Clone, Debug)]
pub struct AddTrack {
    index: usize,
    track: Handle<Track>,
}

impl AddTrack {
    pub fn new(index: usize, track: Handle<Track>) -> Self {
        Self { index, track }
    }

    pub fn track(&self) -> &Handle<Track> {
        &self.track
    }

    pub(crate) fn op_target(&self) -> OpTarget {
        OpTarget::object(&self.track)
    }
}

impl Operation for AddTrack {
    fn do_it(&mut self, song: &Song) -> bool {
        let mut members = song.write();
        if members.track_index(&self.track).is_some() {
            return false;
        }
        let old_len = members.tracks.len();
        self.index = self.index.min(old_len);
        self.track.restore();
        members.tracks.insert(self.index, self.track.clone());
        for section in &members.sections {
            let mut section = section.write();
            section.ensure_tracks(old_len);
            section.track_events.insert(self.index, Vec::new());
        }
        true
    }

    fn undo_it(&mut self, song: &Song) {
        let mut members = song.write();
        if let Some(index) = members.track_index(&self.track) {
            members.tracks.remove(index);
            for section in &members.sections {
                let mut section = section.write();
                if index < section.track_events.len() {
                    section.track_events.remove(index);
                }
            }
        }
        self.track.mark_deleted();
    }
}

/// Remove a track and its event column from every section.
#[derive(Clone, Debug)]
pub struct DeleteTrack {
    track: Handle<Track>,
    index: usize,
    /// Removed columns, one per section
    cleared: Vec<(Handle<Section>, Vec<Event>)>,
}

impl DeleteTrack {
    pub fn new(track: Handle<Track>) -> Self {
        Self {
            track,
            index: 0,
            cleared: Vec::new(),
        }
    }

    pub(crate) fn op_target(&self) -> OpTarget {
        OpTarget::object(&self.track)
    }
}

impl Operation for DeleteTrack {
    fn do_it(&mut self, song: &Song) -> bool {
        let mut members = song.write();
        let Some(index) = members.track_index(&self.track) else {
            debug!("delete track: not in song");
            return false;
        };
        self.index = index;
        members.tracks.remove(index);
        self.track.mark_deleted();
        self.cleared.clear();
        for handle in &members.sections {
            let mut section = handle.write();
            if index < section.track_events.len() {
                let events = section.track_events.remove(index);
                self.cleared.push((handle.clone(), events));
            }
        }
        true
    }

    fn undo_it(&mut self, song: &Song) {
        let mut members = song.write();
        self.track.restore();
        let index = self.index.min(members.tracks.len());
        members.tracks.insert(index, self.track.clone());
        for (handle, events) in self.cleared.drain(..) {
            let mut section = handle.write();
            section.ensure_tracks(index);
            section.track_events.insert(index, events);
        }
    }
}

/// Mute every track but one (or unmute everything).
#[derive(Clone, Debug)]
pub struct SetTrackSolo {
    track: Handle<Track>,
    solo: bool,
    prev_mutes: Vec<(Handle<Track>, bool)>,
}

impl SetTrackSolo {
    pub fn new(track: Handle<Track>, solo: bool) -> Self {
        Self {
            track,
            solo,
            prev_mutes: Vec::new(),
        }
    }

    pub(crate) fn op_target(&self) -> OpTarget {
        OpTarget::object(&self.track)
    }
}

impl Operation for SetTrackSolo {
    /// Returns false if no mute flag changed.
    fn do_it(&mut self, song: &Song) -> bool {
        let members = song.read();
        self.prev_mutes.clear();
        let mut changed = false;
        for track in &members.tracks {
            let mute = self.solo && !Arc::ptr_eq(track, &self.track);
            let mut state = track.write();
            changed |= state.mute != mute;
            self.prev_mutes.push((track.clone(), state.mute));
            state.mute = mute;
        }
        changed
    }

    fn undo_it(&mut self, _song: &Song) {
        for (track, mute) in self.prev_mutes.drain(..) {
            track.write().mute = mute;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_ir::SongObject;

    fn song_with_tracks(n: usize) -> (Song, Vec<Handle<Track>>, Handle<Section>) {
        let song = Song::new();
        let tracks = (0..n).map(|i| song.push_track(Track::new(&i.to_string()))).collect();
        let section = song.push_section(Section::new(192, n));
        for i in 0..n {
            section.write().events_mut(i).push(Event::at(0).with_pitch(i as i32));
        }
        (song, tracks, section)
    }

    #[test]
    fn add_track_inserts_column() {
        let (song, _, section) = song_with_tracks(2);
        let mut op = AddTrack::new(1, SongObject::new_handle(Track::new("new")));
        assert!(op.do_it(&song));
        assert_eq!(song.read().tracks.len(), 3);
        assert!(section.read().events(1).is_empty());
        assert_eq!(section.read().events(2)[0].pitch, Some(1));
        op.undo_it(&song);
        assert_eq!(song.read().tracks.len(), 2);
        assert_eq!(section.read().events(1)[0].pitch, Some(1));
        assert!(op.track().is_deleted());
    }

    #[test]
    fn delete_track_round_trip() {
        let (song, tracks, section) = song_with_tracks(3);
        let mut op = DeleteTrack::new(tracks[1].clone());
        assert!(op.do_it(&song));
        assert!(tracks[1].is_deleted());
        assert_eq!(section.read().track_events.len(), 2);
        assert_eq!(section.read().events(1)[0].pitch, Some(2));
        op.undo_it(&song);
        assert!(!tracks[1].is_deleted());
        assert_eq!(song.read().track_index(&tracks[1]), Some(1));
        assert_eq!(section.read().events(1)[0].pitch, Some(1));
    }

    #[test]
    fn solo_mutes_others_and_undoes() {
        let (song, tracks, _) = song_with_tracks(3);
        tracks[2].write().mute = true;
        let mut op = SetTrackSolo::new(tracks[0].clone(), true);
        assert!(op.do_it(&song));
        let mutes: Vec<bool> = tracks.iter().map(|t| t.read().mute).collect();
        assert_eq!(mutes, vec![false, true, true]);
        op.undo_it(&song);
        let mutes: Vec<bool> = tracks.iter().map(|t| t.read().mute).collect();
        assert_eq!(mutes, vec![false, false, true]);
    }

    #[test]
    fn unsolo_when_nothing_muted_is_refused() {
        let (song, tracks, _) = song_with_tracks(2);
        let mut op = SetTrackSolo::new(tracks[0].clone(), false);
        assert!(!op.do_it(&song));
    }
}
