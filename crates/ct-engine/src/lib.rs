//! Playback engine for chromatracker.
//!
//! Reads the song through cursors one tick at a time and mixes sample
//! voices into interleaved stereo `f32` buffers. Output is unclipped;
//! clipping belongs to the audio sink.

pub mod fixed;
mod jam;
mod song_player;
mod track;
mod voice;

pub use fixed::{FramesFine, FINE_ONE};
pub use jam::{Jam, JamEvent, TouchId, JAM_QUEUE_LEN, NUM_JAM_LANES};
pub use song_player::{Sequencer, SongPlayer, DEFAULT_TEMPO};
pub use track::{TrackPlayer, SLIDE_PER_TICK, TRACK_POLYPHONY};
pub use voice::Voice;
