//! Shared song builders and state snapshots for integration tests.

#![allow(dead_code)]

use std::fmt::Write;
use std::sync::Arc;

use ct_ir::{Event, Handle, LoopMode, Sample, Section, Song, Ticks, Track, MIDDLE_C};

pub const OUT_RATE: u32 = 48000;

/// A mono looping square wave at 48 kHz.
pub fn square(name: &str) -> Sample {
    let mut sample = Sample::from_mono(name, [0.5, -0.5].repeat(64), 48000);
    sample.loop_mode = LoopMode::Forward;
    sample
}

/// One track, one section of `length` ticks at `tempo`, with a note at tick 0.
pub fn one_note_song(length: Ticks, tempo: u16) -> (Arc<Song>, Handle<Section>) {
    let song = Arc::new(Song::new());
    let sample = song.push_sample(square("square"));
    song.push_track(Track::new("one"));
    let mut section = Section::new(length, 1);
    section.tempo = Some(tempo);
    section
        .events_mut(0)
        .push(Event::at(0).with_sample(&sample).with_pitch(MIDDLE_C).with_velocity(1.0));
    let section = song.push_section(section);
    (song, section)
}

/// Every observable piece of song state, as text.
pub fn snapshot(song: &Song) -> String {
    let members = song.read();
    let mut out = String::new();
    let _ = writeln!(out, "volume {:?}", members.volume);
    for sample in &members.samples {
        let _ = writeln!(out, "{:p} {} {:?}", Arc::as_ptr(sample), sample.is_deleted(), *sample.read());
    }
    for track in &members.tracks {
        let _ = writeln!(out, "{:p} {} {:?}", Arc::as_ptr(track), track.is_deleted(), *track.read());
    }
    for section in &members.sections {
        let _ = writeln!(out, "{:p} {} {:?}", Arc::as_ptr(section), section.is_deleted(), *section.read());
    }
    out
}

/// Every event list in the song is strictly ascending.
pub fn all_sorted(song: &Song) -> bool {
    song.read().sections.iter().all(|section| {
        section
            .read()
            .track_events
            .iter()
            .all(|events| ct_ir::events_are_sorted(events))
    })
}

/// No section's `next` points at a tombstoned section.
pub fn links_are_live(song: &Song) -> bool {
    song.read().sections.iter().all(|section| {
        section
            .read()
            .next
            .as_ref()
            .and_then(|next| next.resolve_even_if_deleted())
            .map_or(true, |next| !next.is_deleted())
    })
}
