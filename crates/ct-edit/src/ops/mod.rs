//! Concrete song operations.

mod cell;
mod sample;
mod section;
mod setters;
mod track;

pub use cell::{ClearCell, MergeEvent, WriteCell};
pub use sample::{AddSample, DeleteSample};
pub use section::{AddSection, DeleteSection, SliceSection};
pub use setters::{SetField, SetSongVolume};
pub use track::{AddTrack, DeleteTrack, SetTrackSolo};
