//! chromatracker CLI: builds a demo song, prints it and renders it.
//!
//! Usage:
//!   ct-cli
//!   ct-cli --wav output.wav --tempo 140
//!   ct-cli --play 5

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use ct_ir::units::pitch_to_string;
use ct_ir::{
    Event, LoopMode, Sample, Section, Song, SongLoader, Special, Ticks, Track, MIDDLE_C,
    TICKS_PER_BEAT,
};
use ct_master::{Config, Controller};
use log::info;
use ringbuf::traits::Consumer;

#[derive(Parser, Debug)]
#[command(name = "ct-cli", about = "Headless chromatracker demo renderer")]
struct Args {
    /// Render the demo song to this WAV file
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Run the realtime render thread for this many seconds
    #[arg(long)]
    play: Option<u64>,

    /// Demo tempo in BPM
    #[arg(long, default_value_t = 125)]
    tempo: u16,

    /// Loop the demo song forever (renders stop at --max-seconds)
    #[arg(long = "loop")]
    looped: bool,

    /// Output sample rate in Hz
    #[arg(long, default_value_t = 48000)]
    sample_rate: u32,

    /// Frames per process call
    #[arg(long, default_value_t = 1024)]
    block: usize,

    /// Longest offline render in seconds
    #[arg(long, default_value_t = 300)]
    max_seconds: u32,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            sample_rate: self.sample_rate,
            max_frames_per_call: self.block,
            stream_capacity: self.sample_rate as usize / 10,
            render_seconds: self.max_seconds,
        }
    }
}

/// Two short sections of bass and arpeggio on a synthesized saw wave.
struct DemoSong {
    tempo: u16,
    looped: bool,
}

const SAW_CYCLE: usize = 110;

impl SongLoader for DemoSong {
    type Error = std::convert::Infallible;

    fn load_song(&mut self, song: &Song) -> Result<(), Self::Error> {
        let wave = (0..SAW_CYCLE)
            .map(|i| 2.0 * i as f32 / SAW_CYCLE as f32 - 1.0)
            .collect();
        let mut saw = Sample::from_mono("saw", wave, 48000);
        saw.loop_mode = LoopMode::Forward;
        saw.volume = 0.5;
        saw.fade_out = 0.05;
        let saw = song.push_sample(saw);

        song.push_track(Track::new("bass"));
        let mut lead = Track::new("lead");
        lead.pan = 0.3;
        song.push_track(lead);

        let bar = TICKS_PER_BEAT * 4;
        let step = TICKS_PER_BEAT / 4;
        let mut sections = Vec::new();
        for (root, arp) in [(MIDDLE_C - 12, [0, 4, 7, 12]), (MIDDLE_C - 7, [0, 3, 7, 10])] {
            let mut section = Section::new(bar, 2);
            if sections.is_empty() {
                section.tempo = Some(self.tempo);
            }
            for beat in 0..4 {
                section
                    .events_mut(0)
                    .push(Event::at(beat * TICKS_PER_BEAT).with_sample(&saw).with_pitch(root));
            }
            section
                .events_mut(0)
                .push(Event::at(bar - step).with_special(Special::FadeOut));
            let lead = section.events_mut(1);
            for i in 0..(bar / step) {
                lead.push(
                    Event::at(i * step)
                        .with_sample(&saw)
                        .with_pitch(root + 12 + arp[i as usize % arp.len()])
                        .with_velocity(if i % 4 == 0 { 1.0 } else { 0.6 }),
                );
            }
            sections.push(song.push_section(section));
        }
        sections[0].write().link(Some(&sections[1]));
        if self.looped {
            sections[1].write().link(Some(&sections[0]));
        }
        Ok(())
    }
}

fn print_song(song: &Song) {
    let members = song.read();
    println!("Samples:  {}", members.samples.len());
    println!("Tracks:   {}", members.tracks.len());
    for (i, section) in members.sections.iter().enumerate() {
        let section = section.read();
        let tempo = members.effective_tempo(i).unwrap_or(ct_engine::DEFAULT_TEMPO);
        let events: usize = section.track_events.iter().map(Vec::len).sum();
        println!(
            "Section {i}: {} ticks, {tempo} BPM, {events} events",
            section.length
        );
        if let Some(first) = section.events(1).first().and_then(|e| e.pitch) {
            println!("  lead starts on {}", pitch_to_string(first));
        }
    }
    println!();
}

fn play(ctrl: &mut Controller, seconds: u64, sample_rate: u32) -> Result<()> {
    ctrl.play_from_start()?;
    let (stream, mut consumer) = ctrl.spawn_stream()?;
    println!("Playing for {seconds} s (no audio device, draining the stream)...");

    // Drain at the output rate, as a sound card would.
    let start = Instant::now();
    let mut consumed: u64 = 0;
    let mut peak = 0.0f32;
    while start.elapsed() < Duration::from_secs(seconds) {
        let due = (start.elapsed().as_secs_f64() * f64::from(sample_rate)) as u64;
        while consumed < due {
            let Some(frame) = consumer.try_pop() else {
                break;
            };
            peak = peak.max(frame.left.abs()).max(frame.right.abs());
            consumed += 1;
        }
        ctrl.follow_playback();
        let tick = ctrl.editor().cursor.cursor.time;
        print!("\rTick: {:5} | Tempo: {:3} | Peak: {:.3}", tick, ctrl.sequencer().current_tempo(), peak);
        std::io::Write::flush(&mut std::io::stdout())?;
        if !ctrl.is_playing() {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    stream.stop();
    println!("\rDone, {consumed} frames.                         ");
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut ctrl = Controller::new(args.config()).context("bad configuration")?;
    ctrl.load(&mut DemoSong {
        tempo: args.tempo,
        looped: args.looped,
    })?;
    info!("demo song ready");
    print_song(ctrl.song());

    if let Some(path) = &args.wav {
        println!("Rendering to {} at {} Hz...", path.display(), args.sample_rate);
        let frames = ctrl
            .render_to_wav(path)
            .with_context(|| format!("failed to render {}", path.display()))?;
        let ticks: Ticks = ctrl.song().read().sections.iter().map(|s| s.read().length).sum();
        println!("Rendered {frames} frames ({ticks} ticks in song order).");
    }

    if let Some(seconds) = args.play {
        play(&mut ctrl, seconds, args.sample_rate)?;
    }

    Ok(())
}
