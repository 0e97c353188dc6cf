//! 32.16 fixed-point frame positions and rates.
//!
//! Playback positions and per-frame increments are kept as `i64` with 16
//! fractional bits, so a voice can step through a long waveform at an
//! arbitrary ratio without accumulating float error.

use ct_ir::{Frames, MIDDLE_C, OCTAVE, TICKS_PER_BEAT};

/// Frames with 16 fractional bits.
pub type FramesFine = i64;

/// Fractional bits in [`FramesFine`].
pub const FINE_SHIFT: u32 = 16;

/// One whole frame.
pub const FINE_ONE: FramesFine = 1 << FINE_SHIFT;

/// Mask for the fractional part.
pub const FINE_MASK: FramesFine = FINE_ONE - 1;

/// Fastest step through a sample, per output frame.
pub const MAX_RATE: FramesFine = FINE_ONE << 24;

/// Largest distance from the reference pitch, in semitones, either way.
pub const MAX_PITCH_OFFSET: f32 = (OCTAVE * 10) as f32;

#[inline]
pub const fn to_fine(frames: Frames) -> FramesFine {
    (frames as FramesFine) << FINE_SHIFT
}

/// Whole frames, rounding toward negative infinity.
#[inline]
pub const fn fine_to_frames(fine: FramesFine) -> FramesFine {
    fine >> FINE_SHIFT
}

/// Per-output-frame increment for a sample at `pitch`.
///
/// A sample played at `MIDDLE_C` with zero tune advances at its own frame
/// rate. Pitch plus tune is held within [`MAX_PITCH_OFFSET`] of the
/// reference, and the result always lies in `1..=MAX_RATE`.
pub fn playback_rate(pitch: f32, tune: f32, frame_rate: u32, out_rate: u32) -> FramesFine {
    if out_rate == 0 {
        return 0;
    }
    let offset = pitch - MIDDLE_C as f32 + tune;
    if offset.is_nan() {
        return 1;
    }
    let offset = offset.clamp(-MAX_PITCH_OFFSET, MAX_PITCH_OFFSET);
    let note_rate = libm::exp2f(offset / OCTAVE as f32);
    let rate = libm::roundf(note_rate * frame_rate as f32 / out_rate as f32 * FINE_ONE as f32);
    (rate as FramesFine).clamp(1, MAX_RATE)
}

/// Exact length of one tick in fine frames at `tempo` BPM.
pub fn tick_length(out_rate: u32, tempo: u16) -> FramesFine {
    let tempo = FramesFine::from(tempo.max(1));
    to_fine(out_rate) * 60 / tempo / FramesFine::from(TICKS_PER_BEAT)
}
