//! Voice: one sounding instance of a sample.

use ct_ir::units::velocity_to_amplitude;
use ct_ir::{Handle, LoopMode, ObjRef, Sample, MIDDLE_C};
use log::warn;

use crate::fixed::{fine_to_frames, playback_rate, to_fine, FramesFine};

/// A sample player with its own position, pitch and direction.
#[derive(Clone, Debug)]
pub struct Voice {
    /// Sample being played (`None` = silent)
    sample: Option<ObjRef<Sample>>,
    /// Semitones; `MIDDLE_C` plays at the sample's own rate
    pitch: f32,
    /// 0-1, squared for amplitude
    velocity: f32,
    /// Playback position (32.16 fixed-point)
    position: FramesFine,
    /// Ping-pong direction
    backwards: bool,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            sample: None,
            pitch: MIDDLE_C as f32,
            velocity: 1.0,
            position: 0,
            backwards: false,
        }
    }
}

impl Voice {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sample being played, if it is still alive.
    pub fn sample(&self) -> Option<Handle<Sample>> {
        self.sample.as_ref()?.resolve()
    }

    /// Start `sample` from the beginning (or silence the voice with `None`).
    pub fn set_sample(&mut self, sample: Option<&Handle<Sample>>) {
        self.sample = sample.map(ObjRef::new);
        self.position = 0;
        self.backwards = false;
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch;
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: f32) {
        self.velocity = velocity;
    }

    /// Position in 32.16 fixed-point frames.
    pub fn position(&self) -> FramesFine {
        self.position
    }

    /// Jump to `position` (32.16 fixed-point) in the forward direction.
    pub fn seek(&mut self, position: FramesFine) {
        self.position = position;
        self.backwards = false;
    }

    pub fn is_backwards(&self) -> bool {
        self.backwards
    }

    /// Is the voice producing (possibly silent) audio?
    pub fn is_playing(&self) -> bool {
        self.sample().is_some()
    }

    /// Cut the voice immediately.
    pub fn stop(&mut self) {
        self.sample = None;
    }

    /// Lower velocity by the sample's fade rate, floored at zero.
    pub fn fade_out(&mut self) {
        if let Some(sample) = self.sample() {
            let fade = sample.read().fade_out;
            self.velocity = (self.velocity - fade).max(0.0);
        }
    }

    /// Mix up to `frames` stereo frames into interleaved `buffer`.
    ///
    /// Adds to whatever the buffer already holds. Stops early (and goes
    /// silent) when a one-shot sample ends.
    pub fn mix_tick(&mut self, buffer: &mut [f32], frames: usize, out_rate: u32, left_amp: f32, right_amp: f32) {
        let Some(handle) = self.sample() else {
            self.sample = None;
            return;
        };
        let sample = handle.read();
        if sample.is_empty() {
            self.sample = None;
            return;
        }

        let mut rate = playback_rate(self.pitch, sample.tune, sample.frame_rate, out_rate);
        if self.backwards {
            rate = -rate;
        }

        let mono_amp = velocity_to_amplitude(self.velocity) * sample.volume;
        let left_amp = left_amp * mono_amp;
        let right_amp = right_amp * mono_amp;

        let (window_start, window_end) = sample.play_window();
        let start_fine = to_fine(window_start);
        let end_fine = to_fine(window_end);

        let frames = frames.min(buffer.len() / 2);
        let mut write_frame = 0;
        while write_frame < frames {
            let remaining = (frames - write_frame) as FramesFine;
            let mut collision = false;
            let (min_pos, max_pos) = if self.backwards {
                let mut min_pos = self.position.saturating_add(remaining.saturating_mul(rate));
                if min_pos <= start_fine {
                    min_pos = start_fine;
                    collision = true;
                }
                (min_pos, FramesFine::MAX)
            } else {
                let mut max_pos = self.position.saturating_add(remaining.saturating_mul(rate));
                if max_pos >= end_fine {
                    max_pos = end_fine;
                    collision = true;
                }
                (FramesFine::MIN, max_pos)
            };

            if self.position >= max_pos
                || self.position <= min_pos
                || self.position < 0
                || self.position >= end_fine
            {
                warn!(
                    "voice position {} escaped sample '{}' window {}..{}, silencing",
                    self.position, sample.name, start_fine, end_fine
                );
                self.sample = None;
                return;
            }

            while self.position < max_pos && self.position > min_pos && write_frame < frames {
                let (left, right) = sample.frame(fine_to_frames(self.position) as usize);
                buffer[write_frame * 2] += left * left_amp;
                buffer[write_frame * 2 + 1] += right * right_amp;
                self.position = self.position.saturating_add(rate);
                write_frame += 1;
            }

            if collision {
                let length_fine = end_fine - start_fine;
                match sample.loop_mode {
                    LoopMode::Forward if sample.has_loop() => {
                        if self.position >= end_fine {
                            self.position = start_fine + (self.position - start_fine) % length_fine;
                        }
                    }
                    LoopMode::PingPong if sample.has_loop() => {
                        let lower = start_fine;
                        let upper = end_fine - 1;
                        // a bounce off both ends leaves direction unchanged
                        let round_trip = 2 * (upper - lower);
                        if !self.backwards && self.position > upper {
                            self.position -= (self.position - upper - 1) / round_trip * round_trip;
                        } else if self.backwards && self.position <= lower {
                            self.position += (lower - self.position) / round_trip * round_trip;
                        }
                        loop {
                            if !self.backwards && self.position >= end_fine {
                                self.position = upper * 2 - self.position;
                            } else if self.backwards && self.position <= lower {
                                self.position = lower * 2 - self.position;
                            } else {
                                break;
                            }
                            self.backwards = !self.backwards;
                            rate = -rate;
                        }
                    }
                    _ => {
                        self.sample = None;
                        return;
                    }
                }
            }
        }
    }
}
