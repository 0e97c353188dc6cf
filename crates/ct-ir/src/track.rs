//! Track mix settings.

use arrayvec::ArrayString;

use crate::units::{panning_to_left_amplitude, panning_to_right_amplitude};

/// A mixer lane. Events for it live in each section's per-track lists.
#[derive(Clone, Debug)]
pub struct Track {
    /// Track name
    pub name: ArrayString<32>,
    /// Muted tracks keep playing silently
    pub mute: bool,
    /// Linear amplitude (0-1)
    pub volume: f32,
    /// -1 (left) to 1 (right)
    pub pan: f32,
}

impl Default for Track {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            mute: false,
            volume: 1.0,
            pan: 0.0,
        }
    }
}

impl Track {
    /// Create a new track with unity gain, centered.
    pub fn new(name: &str) -> Self {
        let mut track = Self::default();
        let _ = track.name.try_push_str(name);
        track
    }

    /// Left/right gains for this track given the song's master gain.
    pub fn amplitudes(&self, master: f32) -> (f32, f32) {
        if self.mute {
            return (0.0, 0.0);
        }
        let amp = master * self.volume;
        (
            amp * panning_to_left_amplitude(self.pan),
            amp * panning_to_right_amplitude(self.pan),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn muted_track_is_silent() {
        let mut t = Track::new("t");
        t.mute = true;
        assert_eq!(t.amplitudes(1.0), (0.0, 0.0));
    }

    #[test]
    fn hard_left() {
        let mut t = Track::new("t");
        t.pan = -1.0;
        t.volume = 0.5;
        assert_eq!(t.amplitudes(1.0), (0.5, 0.0));
    }
}
