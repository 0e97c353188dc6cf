//! Song: membership lists for samples, tracks and sections.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::object::{Handle, SongObject};
use crate::sample::Sample;
use crate::section::Section;
use crate::track::Track;

/// Master gain of a new or cleared song.
pub const DEFAULT_SONG_VOLUME: f32 = 0.5;

/// Membership of a song. Guarded by the song lock.
///
/// The song lock only covers which objects belong to the song (and the
/// master volume). Each object's own state is behind its own lock.
#[derive(Debug)]
pub struct SongMembers {
    /// Samples, in display order
    pub samples: Vec<Handle<Sample>>,
    /// Tracks; index `i` owns `track_events[i]` in every section
    pub tracks: Vec<Handle<Track>>,
    /// Sections in song (display) order; playback order follows `next`
    pub sections: Vec<Handle<Section>>,
    /// Master gain
    pub volume: f32,
}

impl Default for SongMembers {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
            tracks: Vec::new(),
            sections: Vec::new(),
            volume: DEFAULT_SONG_VOLUME,
        }
    }
}

impl SongMembers {
    pub fn sample_index(&self, sample: &Handle<Sample>) -> Option<usize> {
        self.samples.iter().position(|s| Arc::ptr_eq(s, sample))
    }

    pub fn track_index(&self, track: &Handle<Track>) -> Option<usize> {
        self.tracks.iter().position(|t| Arc::ptr_eq(t, track))
    }

    pub fn section_index(&self, section: &Handle<Section>) -> Option<usize> {
        self.sections.iter().position(|s| Arc::ptr_eq(s, section))
    }

    /// Tempo in effect at `index`: its own override or the nearest one before it.
    ///
    /// Locks the sections one at a time.
    pub fn effective_tempo(&self, index: usize) -> Option<u16> {
        self.sections
            .get(..=index)?
            .iter()
            .rev()
            .find_map(|s| s.read().tempo)
    }

    /// Meter in effect at `index`, resolved like [`Self::effective_tempo`].
    pub fn effective_meter(&self, index: usize) -> Option<u16> {
        self.sections
            .get(..=index)?
            .iter()
            .rev()
            .find_map(|s| s.read().meter)
    }
}

/// A complete song.
#[derive(Debug, Default)]
pub struct Song {
    members: RwLock<SongMembers>,
}

impl Song {
    /// Create an empty song.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the shared membership lock.
    pub fn read(&self) -> RwLockReadGuard<'_, SongMembers> {
        self.members.read()
    }

    /// Take the exclusive membership lock.
    pub fn write(&self) -> RwLockWriteGuard<'_, SongMembers> {
        self.members.write()
    }

    /// Tombstone every member and empty the song.
    pub fn clear(&self) {
        let mut members = self.write();
        for sample in members.samples.drain(..) {
            sample.mark_deleted();
        }
        for track in members.tracks.drain(..) {
            track.mark_deleted();
        }
        for section in members.sections.drain(..) {
            section.mark_deleted();
        }
        members.volume = DEFAULT_SONG_VOLUME;
    }

    /// Append a sample (loader use; not undoable).
    pub fn push_sample(&self, sample: Sample) -> Handle<Sample> {
        let handle = SongObject::new_handle(sample);
        self.write().samples.push(handle.clone());
        handle
    }

    /// Append a track and give every section an event list for it (loader use).
    pub fn push_track(&self, track: Track) -> Handle<Track> {
        let handle = SongObject::new_handle(track);
        let mut members = self.write();
        members.tracks.push(handle.clone());
        let num_tracks = members.tracks.len();
        for section in &members.sections {
            section.write().ensure_tracks(num_tracks);
        }
        handle
    }

    /// Append a section sized for the current tracks (loader use).
    pub fn push_section(&self, mut section: Section) -> Handle<Section> {
        let mut members = self.write();
        section.ensure_tracks(members.tracks.len());
        let handle = SongObject::new_handle(section);
        members.sections.push(handle.clone());
        handle
    }
}

/// A collaborator that fills a freshly constructed song (file formats, demos).
pub trait SongLoader {
    type Error;

    /// Populate `song`. Called once; the song is empty beforehand.
    fn load_song(&mut self, song: &Song) -> Result<(), Self::Error>;
}
