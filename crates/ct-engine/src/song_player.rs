//! Tick sequencer.
//!
//! [`SongPlayer`] walks the section graph one tick per call, dispatching
//! events to per-track players and mixing the result. [`Sequencer`] wraps
//! it in a mutex so the audio thread and the UI thread can share it.

use std::sync::Arc;

use ct_ir::{Cursor, Event, Handle, Sample, Song, Special};
use log::debug;
use parking_lot::{Mutex, MutexGuard};

use crate::fixed::{fine_to_frames, tick_length, FramesFine, FINE_MASK, FINE_ONE};
use crate::jam::{Jam, JamEvent};
use crate::track::TrackPlayer;

/// Tempo before any section sets one.
pub const DEFAULT_TEMPO: u16 = 125;

/// Plays a song from a cursor.
///
/// Stopped when the cursor is unpositioned. Jam lanes and fading voices
/// keep sounding while stopped.
#[derive(Debug)]
pub struct SongPlayer {
    song: Arc<Song>,
    cursor: Cursor,
    tempo: u16,
    tracks: Vec<TrackPlayer>,
    jam: Jam,
    /// Accumulated fractional frames (Bresenham carry)
    tick_error: FramesFine,
    /// Frames of the current tick not yet handed out
    pending_frames: usize,
    /// Master gain read at the start of the current tick
    amplitude: f32,
}

impl SongPlayer {
    pub fn new(song: Arc<Song>) -> Self {
        Self {
            song,
            cursor: Cursor::stopped(),
            tempo: DEFAULT_TEMPO,
            tracks: Vec::new(),
            jam: Jam::new(),
            tick_error: 0,
            pending_frames: 0,
            amplitude: 0.0,
        }
    }

    pub fn song(&self) -> &Arc<Song> {
        &self.song
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn current_tempo(&self) -> u16 {
        self.tempo
    }

    pub fn is_playing(&self) -> bool {
        self.cursor.is_positioned()
    }

    /// Sample the player for track `index` is sounding.
    pub fn track_sample(&self, index: usize) -> Option<Handle<Sample>> {
        self.tracks.get(index)?.current_sample()
    }

    pub fn jam(&self) -> &Jam {
        &self.jam
    }

    /// (Re)start playback from `cursor`.
    ///
    /// Picks up the tempo in effect at the cursor's section.
    pub fn set_cursor(&mut self, cursor: Cursor) {
        if let Some(section) = cursor.section() {
            let members = self.song.read();
            if let Some(tempo) = members
                .section_index(&section)
                .and_then(|i| members.effective_tempo(i))
                .filter(|&t| t > 0)
            {
                self.tempo = tempo;
            }
        }
        debug!("sequencer cursor set, tempo {}", self.tempo);
        self.cursor = cursor;
    }

    /// Stop and cut every voice, including jam lanes.
    pub fn stop(&mut self) {
        self.cursor.clear();
        for track in &mut self.tracks {
            track.stop();
        }
        self.jam.stop();
    }

    /// Stop sequencing and let every track fade out.
    pub fn fade_all(&mut self) {
        self.cursor.clear();
        let fade = Event::at(0).with_special(Special::FadeOut);
        for track in &mut self.tracks {
            track.apply_event(&fade);
        }
    }

    /// Queue a live event for the jam lanes.
    pub fn queue_jam_event(&mut self, jam: JamEvent) {
        self.jam.queue_event(jam);
    }

    /// Run one tick (or the rest of one) and mix it into `buffer`.
    ///
    /// `buffer` is interleaved stereo; at most `max_frames` frames are
    /// written. Returns the number of frames produced. A tick longer than
    /// `max_frames` is finished by the following calls before the next tick
    /// starts.
    pub fn process_tick(&mut self, buffer: &mut [f32], max_frames: usize, out_rate: u32) -> usize {
        if self.pending_frames == 0 {
            self.start_tick(out_rate);
        }

        let frames = self.pending_frames.min(max_frames).min(buffer.len() / 2);
        self.pending_frames -= frames;

        let out = &mut buffer[..frames * 2];
        out.fill(0.0);
        for track in &mut self.tracks {
            track.mix_tick(out, frames, out_rate, self.amplitude);
        }
        self.jam.mix_tick(out, frames, out_rate, self.amplitude);
        frames
    }

    fn start_tick(&mut self, out_rate: u32) {
        self.read_song();

        if self.cursor.section.is_some() && !self.cursor.advance_one_tick() {
            debug!("playback reached the end of the section chain");
            self.fade_all();
        }

        self.jam.process_events();

        let length = tick_length(out_rate, self.tempo);
        let mut frames = fine_to_frames(length);
        self.tick_error += length & FINE_MASK;
        while self.tick_error >= FINE_ONE {
            self.tick_error -= FINE_ONE;
            frames += 1;
        }
        self.pending_frames = frames as usize;
    }

    /// Rebind track players and dispatch the events at the cursor.
    ///
    /// The song lock is held only for this step; the section lock only for
    /// the event lookup.
    fn read_song(&mut self) {
        let song = Arc::clone(&self.song);
        let members = song.read();
        self.amplitude = members.volume;

        if self.tracks.len() != members.tracks.len() {
            debug!(
                "rebuilding track players: {} -> {}",
                self.tracks.len(),
                members.tracks.len()
            );
            self.tracks.clear();
            self.tracks
                .extend(members.tracks.iter().map(TrackPlayer::for_track));
        } else {
            for (player, track) in self.tracks.iter_mut().zip(&members.tracks) {
                if !player.is_bound_to(track) {
                    player.set_track(track);
                }
            }
        }

        let Some(section) = self.cursor.section() else {
            return;
        };
        let section = section.read();
        for (index, player) in self.tracks.iter_mut().enumerate() {
            if let Some(event) = section.event_at(index, self.cursor.time) {
                player.apply_event(event);
            }
        }
        if let Some(tempo) = section.tempo.filter(|&t| t > 0) {
            self.tempo = tempo;
        }
    }
}

/// A [`SongPlayer`] shared between the audio thread and everyone else.
///
/// The lock is held for a whole `process_tick`.
#[derive(Debug)]
pub struct Sequencer {
    player: Mutex<SongPlayer>,
}

impl Sequencer {
    pub fn new(song: Arc<Song>) -> Self {
        Self {
            player: Mutex::new(SongPlayer::new(song)),
        }
    }

    /// Lock the player for several calls in a row.
    pub fn lock(&self) -> MutexGuard<'_, SongPlayer> {
        self.player.lock()
    }

    pub fn process_tick(&self, buffer: &mut [f32], max_frames: usize, out_rate: u32) -> usize {
        #[cfg(feature = "alloc_check")]
        {
            assert_no_alloc::assert_no_alloc(|| self.player.lock().process_tick(buffer, max_frames, out_rate))
        }
        #[cfg(not(feature = "alloc_check"))]
        {
            self.player.lock().process_tick(buffer, max_frames, out_rate)
        }
    }

    pub fn set_cursor(&self, cursor: Cursor) {
        self.player.lock().set_cursor(cursor);
    }

    pub fn stop(&self) {
        self.player.lock().stop();
    }

    pub fn fade_all(&self) {
        self.player.lock().fade_all();
    }

    pub fn queue_jam_event(&self, jam: JamEvent) {
        self.player.lock().queue_jam_event(jam);
    }

    pub fn cursor(&self) -> Cursor {
        self.player.lock().cursor().clone()
    }

    pub fn current_tempo(&self) -> u16 {
        self.player.lock().current_tempo()
    }

    pub fn is_playing(&self) -> bool {
        self.player.lock().is_playing()
    }

    pub fn track_sample(&self, index: usize) -> Option<Handle<Sample>> {
        self.player.lock().track_sample(index)
    }
}
