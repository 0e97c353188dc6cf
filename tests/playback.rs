//! Sequencer and voice behavior driven through the public engine API.

mod common;

use common::{one_note_song, square, OUT_RATE};
use ct_engine::fixed::FINE_ONE;
use ct_engine::{JamEvent, SongPlayer, Voice};
use ct_ir::{Cursor, Event, LoopMode, Sample, SongObject, Special, MIDDLE_C, TICKS_PER_BEAT};

fn is_silent(buffer: &[f32]) -> bool {
    buffer.iter().all(|&s| s == 0.0)
}

#[test]
fn one_section_plays_exactly_one_bar() {
    let (song, section) = one_note_song(192, 120);
    let mut player = SongPlayer::new(song);
    player.set_cursor(Cursor::new(&section));

    let mut buffer = vec![0.0; 2048];
    let first = player.process_tick(&mut buffer, 1024, OUT_RATE);
    assert_eq!(first, 125);
    assert!(!is_silent(&buffer[..first * 2]));

    let mut total = first;
    let mut calls = 1;
    while player.is_playing() {
        total += player.process_tick(&mut buffer, 1024, OUT_RATE);
        calls += 1;
    }
    assert_eq!(calls, 192);
    assert_eq!(total, 24000);
}

#[test]
fn tick_lengths_carry_fractions() {
    for (rate, tempo) in [(44100, 125), (48000, 97), (22050, 133), (96000, 60)] {
        let (song, section) = one_note_song(TICKS_PER_BEAT, tempo);
        section.write().link(Some(&section));
        let mut player = SongPlayer::new(song);
        player.set_cursor(Cursor::new(&section));

        let ticks = 2000u64;
        let mut buffer = vec![0.0; 8192];
        let total: u64 = (0..ticks)
            .map(|_| player.process_tick(&mut buffer, 4096, rate) as u64)
            .sum();
        let expected = ticks as f64 * f64::from(rate) * 60.0 / (f64::from(tempo) * TICKS_PER_BEAT as f64);
        assert!(
            (total as f64 - expected).abs() <= 1.0,
            "{rate} Hz at {tempo} BPM: {total} frames, expected {expected}"
        );
    }
}

#[test]
fn jam_event_waits_for_its_delay() {
    let (song, _) = one_note_song(192, 120);
    let sample = song.read().samples[0].clone();
    let mut player = SongPlayer::new(song);

    let note = Event::at(0).with_sample(&sample).with_pitch(MIDDLE_C).with_velocity(1.0);
    player.queue_jam_event(JamEvent::new(note, 7, 3));

    let mut buffer = vec![0.0; 2048];
    for call in 1..=3 {
        let frames = player.process_tick(&mut buffer, 1024, OUT_RATE);
        assert!(frames > 0);
        assert!(is_silent(&buffer[..frames * 2]), "sounded early on call {call}");
        assert!(player.jam().lane_for(7).is_none());
    }
    let frames = player.process_tick(&mut buffer, 1024, OUT_RATE);
    assert!(player.jam().lane_for(7).is_some());
    assert!(!is_silent(&buffer[..frames * 2]));
}

#[test]
fn jam_fade_out_releases_lane() {
    let (song, _) = one_note_song(192, 120);
    let sample = song.read().samples[0].clone();
    let mut player = SongPlayer::new(song);
    let mut buffer = vec![0.0; 2048];

    player.queue_jam_event(JamEvent::new(Event::at(0).with_sample(&sample).with_pitch(MIDDLE_C), 1, 0));
    player.process_tick(&mut buffer, 1024, OUT_RATE);
    assert!(player.jam().lane_for(1).is_some());

    player.queue_jam_event(JamEvent::new(Event::at(0).with_special(Special::FadeOut), 1, 0));
    player.process_tick(&mut buffer, 1024, OUT_RATE);
    assert!(player.jam().lane_for(1).is_none());
}

fn ramp_sample(len: usize, mode: LoopMode, start: u32, end: u32) -> ct_ir::Handle<Sample> {
    let mut sample = Sample::from_mono("ramp", (0..len).map(|i| i as f32).collect(), OUT_RATE);
    sample.loop_mode = mode;
    sample.loop_start = start;
    sample.loop_end = end;
    SongObject::new_handle(sample)
}

/// Render in uneven chunks and return the left channel.
fn render_chunked(voice: &mut Voice, chunks: &[usize]) -> Vec<f32> {
    let mut out = Vec::new();
    for &frames in chunks {
        let mut buffer = vec![0.0; frames * 2];
        voice.mix_tick(&mut buffer, frames, OUT_RATE, 1.0, 1.0);
        out.extend(buffer.iter().step_by(2));
    }
    out
}

#[test]
fn forward_loop_matches_prewrapped_position() {
    let sample = ramp_sample(10, LoopMode::Forward, 3, 8);
    let mut voice = Voice::new();
    voice.set_sample(Some(&sample));

    let rendered = render_chunked(&mut voice, &[3, 5, 7, 1, 9, 4]);
    let expected: Vec<f32> = (0..rendered.len())
        .map(|pos| if pos < 8 { pos } else { 3 + (pos - 8) % 5 })
        .map(|frame| frame as f32)
        .collect();
    assert_eq!(rendered, expected);
    assert!(voice.is_playing());
}

#[test]
fn ping_pong_reflects_at_boundaries() {
    let sample = ramp_sample(6, LoopMode::PingPong, 2, 6);
    let mut voice = Voice::new();
    voice.set_sample(Some(&sample));

    let rendered = render_chunked(&mut voice, &[5, 5, 5]);
    assert_eq!(
        rendered,
        vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 5.0, 4.0, 3.0, 2.0, 2.0, 3.0, 4.0, 5.0, 5.0]
    );
    assert!(voice.is_backwards());
}

#[test]
fn seek_past_window_self_silences() {
    let mut voice = Voice::new();
    let sample = SongObject::new_handle(square("sq"));
    voice.set_sample(Some(&sample));
    voice.seek(1_000 * FINE_ONE);
    let mut buffer = vec![0.0; 64];
    voice.mix_tick(&mut buffer, 32, OUT_RATE, 1.0, 1.0);
    assert!(is_silent(&buffer));
    assert!(!voice.is_playing());
}

#[test]
fn extreme_pitch_plays_without_overflow() {
    let (song, section) = one_note_song(192, 120);
    let sample = song.read().samples[0].clone();
    section.write().events_mut(0)[0].pitch = Some(i32::MAX / 2);
    let mut player = SongPlayer::new(song);
    player.set_cursor(Cursor::new(&section));
    player.queue_jam_event(JamEvent::new(
        Event::at(0).with_sample(&sample).with_pitch(i32::MIN / 2),
        1,
        0,
    ));

    let mut buffer = vec![0.0; 2048];
    for _ in 0..50 {
        let frames = player.process_tick(&mut buffer, 1024, OUT_RATE);
        assert!(frames > 0);
        assert!(buffer[..frames * 2].iter().all(|s| s.is_finite()));
    }
    assert!(player.is_playing());
}

#[test]
fn fast_ping_pong_stays_in_loop() {
    let sample = ramp_sample(64, LoopMode::PingPong, 20, 23);
    let mut voice = Voice::new();
    voice.set_sample(Some(&sample));
    voice.seek(21 * FINE_ONE);
    // 8 frames per output frame against a 3 frame loop
    voice.set_pitch((MIDDLE_C + 36) as f32);

    let rendered = render_chunked(&mut voice, &[1, 7, 64, 3, 200]);
    assert!(rendered.iter().all(|&x| (20.0..23.0).contains(&x)), "{rendered:?}");
    assert!(voice.is_playing());
    assert!((20 * FINE_ONE..23 * FINE_ONE).contains(&voice.position()));
}
