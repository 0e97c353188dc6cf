//! Time, pitch and loudness units.

use arrayvec::ArrayString;

/// Song time. A fixed number of ticks make one beat.
pub type Ticks = i32;

/// Sample frames (one value in every channel of a waveform).
pub type Frames = u32;

/// Sequencer resolution.
pub const TICKS_PER_BEAT: Ticks = 192;

/// Semitones per octave.
pub const OCTAVE: i32 = 12;
/// Lowest pitch (C-0).
pub const MIN_PITCH: i32 = 0;
/// Highest pitch (B-9).
pub const MAX_PITCH: i32 = OCTAVE * 10 - 1;
/// Octave of the reference pitch.
pub const MIDDLE_OCTAVE: i32 = 5;
/// Reference pitch: a sample plays at its own frame rate here (C-5).
pub const MIDDLE_C: i32 = OCTAVE * MIDDLE_OCTAVE;

const NOTE_NAMES: &[u8; 24] = b"C-C#D-D#E-F-F#G-G#A-A#B-";

/// Tracker-style pitch name, e.g. `C-5` or `F#3`.
pub fn pitch_to_string(pitch: i32) -> ArrayString<4> {
    let pitch = pitch.clamp(MIN_PITCH, MAX_PITCH);
    let note = (pitch % OCTAVE) as usize;
    let mut name = ArrayString::new();
    name.push(NOTE_NAMES[note * 2] as char);
    name.push(NOTE_NAMES[note * 2 + 1] as char);
    name.push((b'0' + (pitch / OCTAVE) as u8) as char);
    name
}

/// Velocity (0-1) to linear amplitude (0-1). Quadratic.
pub fn velocity_to_amplitude(velocity: f32) -> f32 {
    velocity * velocity
}

/// Inverse of [`velocity_to_amplitude`].
pub fn amplitude_to_velocity(amplitude: f32) -> f32 {
    libm::sqrtf(amplitude.max(0.0))
}

/// Left gain for a pan in -1 (left) to 1 (right). Linear law, -6dB center.
pub fn panning_to_left_amplitude(pan: f32) -> f32 {
    (1.0 - pan) / 2.0
}

/// Right gain for a pan in -1 (left) to 1 (right).
pub fn panning_to_right_amplitude(pan: f32) -> f32 {
    (pan + 1.0) / 2.0
}
