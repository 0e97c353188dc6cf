//! Headless controller for chromatracker.
//!
//! Owns a song together with its sequencer and editor, and provides
//! loading, transport, live input, offline rendering and a realtime render
//! thread that any audio sink can drain.

mod config;
mod error;
mod stream;
mod wav;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use ct_edit::Editor;
use ct_engine::{JamEvent, Sequencer, SongPlayer, TouchId};
use ct_ir::{Cursor, Event, Handle, Section, Song, SongLoader};
use log::{debug, info};
use ringbuf::HeapCons;

pub use config::Config;
pub use error::MasterError;
pub use stream::{ticks_in, CallbackClock, StreamHandle};
pub use wav::{to_pcm16, write_wav};

/// One stereo output frame, unclipped.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Frame {
    pub left: f32,
    pub right: f32,
}

impl Frame {
    pub const fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    pub const fn silence() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Headless tracker controller: owns a song and manages playback.
pub struct Controller {
    config: Config,
    song: Arc<Song>,
    sequencer: Arc<Sequencer>,
    editor: Editor,
    clock: Arc<CallbackClock>,
}

impl Controller {
    pub fn new(config: Config) -> Result<Self, MasterError> {
        config.validate()?;
        let song = Arc::new(Song::new());
        Ok(Self {
            config,
            sequencer: Arc::new(Sequencer::new(Arc::clone(&song))),
            editor: Editor::new(Arc::clone(&song)),
            clock: Arc::new(CallbackClock::new()),
            song,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // --- Song management ---

    pub fn song(&self) -> &Arc<Song> {
        &self.song
    }

    pub fn sequencer(&self) -> &Arc<Sequencer> {
        &self.sequencer
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    /// Replace the song contents with whatever `loader` produces.
    ///
    /// Playback stops and edit history is dropped. On failure the song is
    /// left with whatever the loader managed to add.
    pub fn load<L>(&mut self, loader: &mut L) -> Result<(), MasterError>
    where
        L: SongLoader,
        L::Error: std::error::Error + Send + Sync + 'static,
    {
        self.sequencer.stop();
        self.song.clear();
        let result = loader
            .load_song(&self.song)
            .map_err(|e| MasterError::Load(Box::new(e)));
        self.editor.reset();
        result?;

        let members = self.song.read();
        info!(
            "loaded song: {} samples, {} tracks, {} sections",
            members.samples.len(),
            members.tracks.len(),
            members.sections.len()
        );
        Ok(())
    }

    fn first_section(&self) -> Result<Handle<Section>, MasterError> {
        self.song.read().sections.first().cloned().ok_or(MasterError::NoSections)
    }

    // --- Transport ---

    pub fn play_from_start(&self) -> Result<(), MasterError> {
        let first = self.first_section()?;
        self.sequencer.set_cursor(Cursor::new(&first));
        Ok(())
    }

    /// Play from the edit cursor.
    pub fn play_from_cursor(&self) -> Result<(), MasterError> {
        let cursor = self.editor.cursor.cursor.clone();
        if !cursor.is_positioned() {
            return Err(MasterError::NoSections);
        }
        self.sequencer.set_cursor(cursor);
        Ok(())
    }

    /// Cut all sound.
    pub fn stop(&self) {
        self.sequencer.stop();
    }

    /// Stop sequencing and let voices fade.
    pub fn fade(&self) {
        self.sequencer.fade_all();
    }

    pub fn is_playing(&self) -> bool {
        self.sequencer.is_playing()
    }

    /// Keep the edit cursor and the play position together while the
    /// editor follows playback. Call once per UI frame.
    pub fn follow_playback(&mut self) {
        let mut player = self.sequencer.lock();
        if let Some(seek) = self.editor.follow(player.cursor()) {
            debug!("player follows edit cursor to tick {}", seek.time);
            player.set_cursor(seek);
        }
    }

    /// Queue a live event.
    ///
    /// The render path runs ahead of what is heard by however long ago the
    /// last tick ran, so the event is delayed by that many ticks to land
    /// where the player heard it.
    pub fn jam(&self, event: Event, touch: TouchId, now: Instant) {
        let delay = self
            .clock
            .since_last(now)
            .map_or(0, |elapsed| ticks_in(elapsed, self.config.sample_rate, self.sequencer.current_tempo()));
        debug!("jam touch {touch} delay {delay}");
        self.sequencer.queue_jam_event(JamEvent::new(event, touch, delay));
    }

    // --- Realtime ---

    /// Start a render thread on the shared sequencer. The caller's sink
    /// drains the returned consumer.
    pub fn spawn_stream(&self) -> Result<(StreamHandle, HeapCons<Frame>), MasterError> {
        stream::spawn(Arc::clone(&self.sequencer), Arc::clone(&self.clock), &self.config)
    }

    // --- Offline rendering ---

    /// Render the song from the start until playback stops or `max_frames`
    /// frames are produced. Uses a private player, so live playback is
    /// unaffected.
    pub fn render_frames(&self, max_frames: usize) -> Result<Vec<Frame>, MasterError> {
        let first = self.first_section()?;
        let mut player = SongPlayer::new(Arc::clone(&self.song));
        player.set_cursor(Cursor::new(&first));

        let block = self.config.max_frames_per_call;
        let mut buffer = vec![0.0f32; block * 2];
        let mut frames = Vec::new();
        while player.is_playing() && frames.len() < max_frames {
            let want = block.min(max_frames - frames.len());
            let n = player.process_tick(&mut buffer, want, self.config.sample_rate);
            frames.extend(buffer[..n * 2].chunks_exact(2).map(|p| Frame::new(p[0], p[1])));
        }
        Ok(frames)
    }

    /// Render to a 16-bit WAV file. Returns the number of frames written.
    pub fn render_to_wav(&self, path: &Path) -> Result<usize, MasterError> {
        let frames = self.render_frames(self.config.max_render_frames())?;
        let mut w = BufWriter::new(File::create(path)?);
        write_wav(&mut w, &frames, self.config.sample_rate)?;
        w.flush()?;
        info!("wrote {} frames to {}", frames.len(), path.display());
        Ok(frames.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_ir::{Sample, Track, MIDDLE_C};
    use ringbuf::traits::Consumer;
    use std::fmt;

    struct OneBar {
        linked: bool,
    }

    impl SongLoader for OneBar {
        type Error = std::convert::Infallible;

        fn load_song(&mut self, song: &Song) -> Result<(), Self::Error> {
            let mut square = Sample::from_mono("square", [0.5, -0.5].repeat(100), 48000);
            square.loop_mode = ct_ir::LoopMode::Forward;
            let sample = song.push_sample(square);
            song.push_track(Track::new("lead"));
            let mut section = Section::new(192, 1);
            section.tempo = Some(120);
            section
                .events_mut(0)
                .push(Event::at(0).with_sample(&sample).with_pitch(MIDDLE_C).with_velocity(1.0));
            let section = song.push_section(section);
            if self.linked {
                section.write().link(Some(&section));
            }
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl fmt::Display for Broken {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("broken file")
        }
    }

    impl std::error::Error for Broken {}

    struct Failing;

    impl SongLoader for Failing {
        type Error = Broken;

        fn load_song(&mut self, _song: &Song) -> Result<(), Broken> {
            Err(Broken)
        }
    }

    fn controller(linked: bool) -> Controller {
        let mut controller = Controller::new(Config::default()).unwrap();
        controller.load(&mut OneBar { linked }).unwrap();
        controller
    }

    #[test]
    fn render_one_bar() {
        let controller = controller(false);
        let frames = controller.render_frames(usize::MAX).unwrap();
        assert_eq!(frames.len(), 24000);
        assert!(frames.iter().any(|f| f.left != 0.0));
    }

    #[test]
    fn render_stops_at_limit_for_looping_song() {
        let controller = controller(true);
        let frames = controller.render_frames(50_000).unwrap();
        assert_eq!(frames.len(), 50_000);
    }

    #[test]
    fn empty_song_has_nothing_to_play() {
        let controller = Controller::new(Config::default()).unwrap();
        assert!(matches!(controller.play_from_start(), Err(MasterError::NoSections)));
        assert!(matches!(controller.render_frames(10), Err(MasterError::NoSections)));
    }

    #[test]
    fn failed_load_reports_error() {
        let mut controller = controller(false);
        let err = controller.load(&mut Failing).unwrap_err();
        assert!(matches!(err, MasterError::Load(_)));
        assert!(err.to_string().contains("broken file"));
        assert!(controller.song().read().sections.is_empty());
    }

    #[test]
    fn invalid_config_rejected() {
        let config = Config {
            sample_rate: 0,
            ..Config::default()
        };
        assert!(Controller::new(config).is_err());
    }

    #[test]
    fn transport() {
        let controller = controller(true);
        controller.play_from_start().unwrap();
        assert!(controller.is_playing());
        controller.fade();
        assert!(!controller.is_playing());
        controller.play_from_cursor().unwrap();
        assert!(controller.is_playing());
        controller.stop();
        assert!(!controller.is_playing());
    }

    #[test]
    fn editor_follows_playback() {
        let mut controller = controller(true);
        controller.play_from_start().unwrap();
        let mut buffer = vec![0.0; 2048];
        for _ in 0..30 {
            controller.sequencer().process_tick(&mut buffer, 1024, 48000);
        }
        controller.follow_playback();
        assert_eq!(controller.editor().cursor.cursor, controller.sequencer().cursor());
        assert_eq!(controller.editor().cursor.cursor.time, 30);

        controller.editor_mut().next_cell();
        controller.follow_playback();
        assert_eq!(controller.sequencer().cursor().time, 48);

        controller.editor_mut().set_follow_playback(false);
        controller.sequencer().process_tick(&mut buffer, 1024, 48000);
        controller.follow_playback();
        assert_eq!(controller.editor().cursor.cursor.time, 48);
        assert_eq!(controller.sequencer().cursor().time, 49);
    }

    #[test]
    fn jam_before_any_tick_is_immediate() {
        let controller = controller(false);
        controller.jam(Event::at(0).with_pitch(MIDDLE_C), 1, Instant::now());
        assert_eq!(controller.sequencer().lock().jam().pending(), 1);
    }

    #[test]
    fn stream_produces_frames() {
        let controller = controller(true);
        controller.play_from_start().unwrap();
        let (handle, mut consumer) = controller.spawn_stream().unwrap();

        let mut got = 0;
        let mut loud = false;
        let deadline = Instant::now() + std::time::Duration::from_secs(10);
        while got < 2000 && Instant::now() < deadline {
            match consumer.try_pop() {
                Some(frame) => {
                    got += 1;
                    loud |= frame.left != 0.0;
                }
                None => std::thread::yield_now(),
            }
        }
        assert!(handle.is_running());
        handle.stop();
        assert_eq!(got, 2000);
        assert!(loud);
    }

    #[test]
    fn wav_file_written() {
        let controller = controller(false);
        let path = std::env::temp_dir().join(format!("ct-master-test-{}.wav", std::process::id()));
        let frames = controller.render_to_wav(&path).unwrap();
        assert_eq!(frames, 24000);
        let len = std::fs::metadata(&path).unwrap().len();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(len, 44 + 24000 * 4);
    }
}
