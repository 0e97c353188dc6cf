//! Sample (waveform + playback settings).

use arrayvec::ArrayString;

use crate::units::Frames;

/// How playback behaves at the end of the loop window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopMode {
    /// Play to the end once, then go silent
    #[default]
    Once,
    /// Jump from loop end back to loop start
    Forward,
    /// Bounce between loop start and loop end
    PingPong,
}

/// What happens to a sounding voice when a new sample is triggered on its track.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NewNoteAction {
    /// Cut the old voice
    #[default]
    Stop,
    /// Let the old voice fade out in the background
    Fade,
    /// Let the old voice keep playing in the background
    Continue,
}

/// A multichannel waveform with loop and tuning settings.
#[derive(Clone, Debug)]
pub struct Sample {
    /// Sample name
    pub name: ArrayString<32>,
    /// Waveform, one plane per channel (mono or stereo)
    pub channels: Vec<Vec<f32>>,
    /// Frames per second at the reference pitch
    pub frame_rate: u32,
    /// Loop behavior
    pub loop_mode: LoopMode,
    /// Loop start (inclusive, frames)
    pub loop_start: Frames,
    /// Loop end (exclusive, frames)
    pub loop_end: Frames,
    /// Linear amplitude (0-1)
    pub volume: f32,
    /// Transpose + finetune in semitones
    pub tune: f32,
    /// Velocity units lost per tick while fading out (0-1)
    pub fade_out: f32,
    /// Action on the previous voice when this sample is retriggered
    pub new_note_action: NewNoteAction,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            channels: Vec::new(),
            frame_rate: 48000,
            loop_mode: LoopMode::Once,
            loop_start: 0,
            loop_end: 0,
            volume: 1.0,
            tune: 0.0,
            fade_out: 1.0,
            new_note_action: NewNoteAction::Stop,
        }
    }
}

impl Sample {
    /// Create a new empty sample.
    pub fn new(name: &str) -> Self {
        let mut sample = Self::default();
        let _ = sample.name.try_push_str(name);
        sample
    }

    /// Create a mono sample from raw frames. The loop window covers the whole waveform.
    pub fn from_mono(name: &str, data: Vec<f32>, frame_rate: u32) -> Self {
        let mut sample = Self::new(name);
        sample.loop_end = data.len() as Frames;
        sample.channels.push(data);
        sample.frame_rate = frame_rate;
        sample
    }

    /// Number of playable frames (the shortest channel).
    pub fn frame_count(&self) -> Frames {
        self.channels
            .iter()
            .map(|c| c.len() as Frames)
            .min()
            .unwrap_or(0)
    }

    /// Returns true if the sample has no audio.
    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// Returns true if the sample has a usable loop window.
    pub fn has_loop(&self) -> bool {
        self.loop_mode != LoopMode::Once
            && self.loop_start < self.loop_end
            && self.loop_end <= self.frame_count()
    }

    /// Window a voice may play in: `[start, end)`.
    ///
    /// Looping samples play up to the loop end. Anything else plays the
    /// whole waveform.
    pub fn play_window(&self) -> (Frames, Frames) {
        if self.has_loop() {
            (self.loop_start, self.loop_end)
        } else {
            (0, self.frame_count())
        }
    }

    /// Read one stereo frame. Mono samples feed both sides.
    pub fn frame(&self, index: usize) -> (f32, f32) {
        let left = self.channels.first().and_then(|c| c.get(index)).copied().unwrap_or(0.0);
        let right = match self.channels.get(1) {
            Some(c) => c.get(index).copied().unwrap_or(0.0),
            None => left,
        };
        (left, right)
    }
}
