//! Core song model for chromatracker.
//!
//! This crate defines the song (samples, tracks, sections, sparse events),
//! the tombstone-aware ownership primitive every entity lives behind, and
//! the cursors used to walk the section graph. The playback engine and the
//! edit layer both work directly on these types.
//!
//! Every entity is independently locked. Lock order is always song before
//! section/track/sample; sibling locks are taken one after another, never
//! nested.

mod cursor;
mod event;
mod object;
mod sample;
mod section;
mod song;
mod track;
pub mod units;

pub use cursor::{Cursor, Space, TrackCursor, MAX_SECTION_HOPS};
pub use event::{events_are_sorted, find_event, Event, EventMask, Special};
pub use object::{Handle, ObjRef, SongObject};
pub use sample::{LoopMode, NewNoteAction, Sample};
pub use section::Section;
pub use song::{Song, SongLoader, SongMembers, DEFAULT_SONG_VOLUME};
pub use track::Track;
pub use units::{Frames, Ticks, MIDDLE_C, OCTAVE, TICKS_PER_BEAT};
