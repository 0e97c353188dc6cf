//! Per-track note state.

use arrayvec::ArrayVec;
use ct_ir::{Event, Handle, NewNoteAction, ObjRef, Sample, Special, Track};

use crate::voice::Voice;

/// Background voices a track keeps sounding after new notes.
pub const TRACK_POLYPHONY: usize = 8;

/// Semitones a sliding voice moves per tick.
pub const SLIDE_PER_TICK: f32 = 1.0 / 16.0;

/// A voice released by a new note.
#[derive(Clone, Debug)]
struct BackgroundVoice {
    voice: Voice,
    fading: bool,
}

/// Plays one track (or one jam lane).
///
/// Holds the foreground voice that events act on, plus voices left behind
/// by new-note actions.
#[derive(Clone, Debug, Default)]
pub struct TrackPlayer {
    /// Owning track; `None` for jam lanes, which play at the song gain
    track: Option<ObjRef<Track>>,
    voice: Voice,
    background: ArrayVec<BackgroundVoice, TRACK_POLYPHONY>,
    special: Special,
    slide_target: Option<f32>,
}

impl TrackPlayer {
    /// A player for a lane not tied to any track.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_track(track: &Handle<Track>) -> Self {
        Self {
            track: Some(ObjRef::new(track)),
            ..Self::default()
        }
    }

    /// Is this player bound to `track`?
    pub fn is_bound_to(&self, track: &Handle<Track>) -> bool {
        self.track.as_ref().is_some_and(|t| t.points_to(track))
    }

    /// Rebind to another track, cutting everything that was sounding.
    pub fn set_track(&mut self, track: &Handle<Track>) {
        self.track = Some(ObjRef::new(track));
        self.stop();
    }

    pub fn voice(&self) -> &Voice {
        &self.voice
    }

    /// Sample the foreground voice is playing.
    pub fn current_sample(&self) -> Option<Handle<Sample>> {
        self.voice.sample()
    }

    pub fn current_special(&self) -> Special {
        self.special
    }

    /// Number of voices still sounding in the background.
    pub fn background_voices(&self) -> usize {
        self.background.len()
    }

    /// Is anything audible (or able to become audible)?
    pub fn is_active(&self) -> bool {
        self.voice.is_playing() || !self.background.is_empty()
    }

    /// Cut every voice.
    pub fn stop(&mut self) {
        self.voice.stop();
        self.background.clear();
        self.special = Special::None;
        self.slide_target = None;
    }

    /// Merge the present fields of `event` onto the foreground voice.
    ///
    /// Absent fields keep the voice as it was. The special action is
    /// replaced every time. With `Slide`, the pitch becomes a glide target
    /// instead of being set directly.
    pub fn apply_event(&mut self, event: &Event) {
        if let Some(sample) = event.sample.as_ref().and_then(ObjRef::resolve) {
            self.trigger(&sample);
        }
        match (event.special, event.pitch) {
            (Special::Slide, Some(pitch)) => self.slide_target = Some(pitch as f32),
            (_, Some(pitch)) => {
                self.voice.set_pitch(pitch as f32);
                self.slide_target = None;
            }
            (Special::Slide, None) => {}
            (_, None) => self.slide_target = None,
        }
        if let Some(velocity) = event.velocity {
            self.voice.set_velocity(velocity);
        }
        self.special = event.special;
    }

    /// Retrigger with `sample`, releasing the old voice per its new-note action.
    fn trigger(&mut self, sample: &Handle<Sample>) {
        if let Some(old) = self.voice.sample() {
            let action = old.read().new_note_action;
            if action != NewNoteAction::Stop {
                if self.background.is_full() {
                    self.background.remove(0);
                }
                self.background.push(BackgroundVoice {
                    voice: self.voice.clone(),
                    fading: action == NewNoteAction::Fade,
                });
            }
        }
        self.voice.set_sample(Some(sample));
    }

    /// Gains for this tick given the song's master gain.
    fn amplitudes(&self, master: f32) -> (f32, f32) {
        match &self.track {
            Some(track) => track
                .resolve()
                .map_or((0.0, 0.0), |t| t.read().amplitudes(master)),
            None => (master, master),
        }
    }

    /// Mix one tick's worth of audio, then run per-tick post-processing.
    ///
    /// Muted tracks still advance their voices.
    pub fn mix_tick(&mut self, buffer: &mut [f32], frames: usize, out_rate: u32, master: f32) {
        let (left, right) = self.amplitudes(master);
        self.voice.mix_tick(buffer, frames, out_rate, left, right);
        for bg in self.background.iter_mut() {
            bg.voice.mix_tick(buffer, frames, out_rate, left, right);
            if bg.fading {
                bg.voice.fade_out();
            }
        }
        self.background
            .retain(|bg| bg.voice.is_playing() && !(bg.fading && bg.voice.velocity() <= 0.0));

        match self.special {
            Special::FadeOut => self.voice.fade_out(),
            Special::Slide => self.step_slide(),
            Special::None => {}
        }
    }

    fn step_slide(&mut self) {
        let Some(target) = self.slide_target else {
            return;
        };
        let pitch = self.voice.pitch();
        let next = if pitch < target {
            (pitch + SLIDE_PER_TICK).min(target)
        } else {
            (pitch - SLIDE_PER_TICK).max(target)
        };
        self.voice.set_pitch(next);
        if next == target {
            self.slide_target = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_ir::{SongObject, MIDDLE_C};

    fn sample_with_nna(action: NewNoteAction) -> Handle<Sample> {
        let mut s = Sample::from_mono("s", vec![1.0; 4096], 48000);
        s.new_note_action = action;
        s.fade_out = 0.5;
        SongObject::new_handle(s)
    }

    fn tick(player: &mut TrackPlayer) -> Vec<f32> {
        let mut buf = vec![0.0; 64];
        player.mix_tick(&mut buf, 32, 48000, 1.0);
        buf
    }

    #[test]
    fn sparse_event_keeps_sample() {
        let sample = sample_with_nna(NewNoteAction::Stop);
        let mut p = TrackPlayer::new();
        p.apply_event(&Event::at(0).with_sample(&sample).with_pitch(MIDDLE_C));
        tick(&mut p);
        let pos = p.voice().position();
        p.apply_event(&Event::at(0).with_velocity(0.5));
        assert!(p.current_sample().is_some());
        assert_eq!(p.voice().position(), pos);
        assert_eq!(p.voice().velocity(), 0.5);
    }

    #[test]
    fn muted_track_keeps_advancing() {
        let track = SongObject::new_handle(Track::new("t"));
        track.write().mute = true;
        let sample = sample_with_nna(NewNoteAction::Stop);
        let mut p = TrackPlayer::for_track(&track);
        p.apply_event(&Event::at(0).with_sample(&sample));
        let out = tick(&mut p);
        assert!(out.iter().all(|&x| x == 0.0));
        assert!(p.voice().position() > 0);
    }

    #[test]
    fn stop_action_cuts_old_voice() {
        let sample = sample_with_nna(NewNoteAction::Stop);
        let mut p = TrackPlayer::new();
        p.apply_event(&Event::at(0).with_sample(&sample));
        p.apply_event(&Event::at(0).with_sample(&sample));
        assert_eq!(p.background_voices(), 0);
    }

    #[test]
    fn continue_action_keeps_old_voice() {
        let sample = sample_with_nna(NewNoteAction::Continue);
        let mut p = TrackPlayer::new();
        p.apply_event(&Event::at(0).with_sample(&sample));
        p.apply_event(&Event::at(0).with_sample(&sample));
        assert_eq!(p.background_voices(), 1);
        tick(&mut p);
        assert_eq!(p.background_voices(), 1);
    }

    #[test]
    fn fade_action_drops_voice_once_silent() {
        let sample = sample_with_nna(NewNoteAction::Fade);
        let mut p = TrackPlayer::new();
        p.apply_event(&Event::at(0).with_sample(&sample));
        p.apply_event(&Event::at(0).with_sample(&sample));
        tick(&mut p);
        assert_eq!(p.background_voices(), 1);
        tick(&mut p);
        assert_eq!(p.background_voices(), 0);
    }

    #[test]
    fn background_voices_are_bounded() {
        let sample = sample_with_nna(NewNoteAction::Continue);
        let mut p = TrackPlayer::new();
        for _ in 0..TRACK_POLYPHONY + 4 {
            p.apply_event(&Event::at(0).with_sample(&sample));
        }
        assert_eq!(p.background_voices(), TRACK_POLYPHONY);
    }

    #[test]
    fn fade_out_special_decays_each_tick() {
        let sample = sample_with_nna(NewNoteAction::Stop);
        let mut p = TrackPlayer::new();
        p.apply_event(&Event::at(0).with_sample(&sample).with_special(Special::FadeOut));
        tick(&mut p);
        assert_eq!(p.voice().velocity(), 0.5);
        tick(&mut p);
        assert_eq!(p.voice().velocity(), 0.0);
    }

    #[test]
    fn slide_glides_toward_pitch() {
        let sample = sample_with_nna(NewNoteAction::Stop);
        let mut p = TrackPlayer::new();
        p.apply_event(&Event::at(0).with_sample(&sample).with_pitch(MIDDLE_C));
        p.apply_event(&Event::at(0).with_pitch(MIDDLE_C + 1).with_special(Special::Slide));
        assert_eq!(p.voice().pitch(), MIDDLE_C as f32);
        tick(&mut p);
        assert_eq!(p.voice().pitch(), MIDDLE_C as f32 + SLIDE_PER_TICK);
        for _ in 0..32 {
            tick(&mut p);
        }
        assert_eq!(p.voice().pitch(), (MIDDLE_C + 1) as f32);
    }

    #[test]
    fn set_track_rebinds_and_stops() {
        let a = SongObject::new_handle(Track::new("a"));
        let b = SongObject::new_handle(Track::new("b"));
        let sample = sample_with_nna(NewNoteAction::Stop);
        let mut p = TrackPlayer::for_track(&a);
        p.apply_event(&Event::at(0).with_sample(&sample));
        p.set_track(&b);
        assert!(p.is_bound_to(&b));
        assert!(!p.is_active());
    }
}
