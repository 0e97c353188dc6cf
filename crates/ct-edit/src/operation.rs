//! The reversible operation contract and the song operation set.

use core::mem;
use core::ptr;
use std::sync::Arc;

use ct_ir::{
    Event, EventMask, Handle, LoopMode, NewNoteAction, ObjRef, Sample, Section, Song, Ticks,
    Track, TrackCursor,
};

use crate::ops::{
    AddSample, AddSection, AddTrack, ClearCell, DeleteSample, DeleteSection, DeleteTrack,
    MergeEvent, SetField, SetSongVolume, SetTrackSolo, SliceSection, WriteCell,
};

/// A reversible edit.
///
/// `do_it` and `undo_it` must be called alternately, starting with
/// `do_it`. Each operation records at apply time whatever it needs to
/// invert itself exactly.
pub trait Operation {
    /// Apply the edit. Returns false if it had no effect.
    fn do_it(&mut self, song: &Song) -> bool;

    /// Reverse the last `do_it`.
    fn undo_it(&mut self, song: &Song);
}

/// What an operation edits. Two continuous edits only merge into one
/// history entry when they are the same kind and share a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpTarget {
    Song,
    Object(*const ()),
    Cell {
        section: *const (),
        track: usize,
        time: Ticks,
    },
}

impl OpTarget {
    pub fn object<T>(handle: &Handle<T>) -> Self {
        Self::Object(Arc::as_ptr(handle).cast())
    }

    pub fn cell(cursor: &TrackCursor) -> Self {
        Self::Cell {
            section: cursor
                .cursor
                .section
                .as_ref()
                .map_or(ptr::null(), |s| s.as_ptr().cast()),
            track: cursor.track,
            time: cursor.cursor.time,
        }
    }
}

fn track_mute(t: &mut Track) -> &mut bool {
    &mut t.mute
}
fn track_volume(t: &mut Track) -> &mut f32 {
    &mut t.volume
}
fn track_pan(t: &mut Track) -> &mut f32 {
    &mut t.pan
}
fn section_length(s: &mut Section) -> &mut Ticks {
    &mut s.length
}
fn section_tempo(s: &mut Section) -> &mut Option<u16> {
    &mut s.tempo
}
fn section_meter(s: &mut Section) -> &mut Option<u16> {
    &mut s.meter
}
fn section_next(s: &mut Section) -> &mut Option<ObjRef<Section>> {
    &mut s.next
}
/// `None`, or a live section of `song`.
fn is_live_link(song: &Song, next: &Option<ObjRef<Section>>) -> bool {
    let Some(next) = next else {
        return true;
    };
    next.resolve()
        .is_some_and(|next| song.read().section_index(&next).is_some())
}
fn sample_volume(s: &mut Sample) -> &mut f32 {
    &mut s.volume
}
fn sample_tune(s: &mut Sample) -> &mut f32 {
    &mut s.tune
}
fn sample_fade_out(s: &mut Sample) -> &mut f32 {
    &mut s.fade_out
}
fn sample_loop_mode(s: &mut Sample) -> &mut LoopMode {
    &mut s.loop_mode
}
fn sample_new_note_action(s: &mut Sample) -> &mut NewNoteAction {
    &mut s.new_note_action
}

/// Every operation the editor can record.
#[derive(Debug)]
pub enum SongOp {
    SetSongVolume(SetSongVolume),

    AddTrack(AddTrack),
    DeleteTrack(DeleteTrack),
    SetTrackSolo(SetTrackSolo),
    SetTrackMute(SetField<Track, bool>),
    SetTrackVolume(SetField<Track, f32>),
    SetTrackPan(SetField<Track, f32>),

    ClearCell(ClearCell),
    WriteCell(WriteCell),
    MergeEvent(MergeEvent),

    AddSection(AddSection),
    DeleteSection(DeleteSection),
    SliceSection(SliceSection),
    SetSectionLength(SetField<Section, Ticks>),
    SetSectionTempo(SetField<Section, Option<u16>>),
    SetSectionMeter(SetField<Section, Option<u16>>),
    SetSectionNext(SetField<Section, Option<ObjRef<Section>>>),

    AddSample(AddSample),
    DeleteSample(DeleteSample),
    SetSampleVolume(SetField<Sample, f32>),
    SetSampleTune(SetField<Sample, f32>),
    SetSampleFadeOut(SetField<Sample, f32>),
    SetSampleLoopMode(SetField<Sample, LoopMode>),
    SetSampleNewNoteAction(SetField<Sample, NewNoteAction>),
}

macro_rules! each_op {
    ($self:expr, $op:ident => $body:expr) => {
        match $self {
            SongOp::SetSongVolume($op) => $body,
            SongOp::AddTrack($op) => $body,
            SongOp::DeleteTrack($op) => $body,
            SongOp::SetTrackSolo($op) => $body,
            SongOp::SetTrackMute($op) => $body,
            SongOp::SetTrackVolume($op) => $body,
            SongOp::SetTrackPan($op) => $body,
            SongOp::ClearCell($op) => $body,
            SongOp::WriteCell($op) => $body,
            SongOp::MergeEvent($op) => $body,
            SongOp::AddSection($op) => $body,
            SongOp::DeleteSection($op) => $body,
            SongOp::SliceSection($op) => $body,
            SongOp::SetSectionLength($op) => $body,
            SongOp::SetSectionTempo($op) => $body,
            SongOp::SetSectionMeter($op) => $body,
            SongOp::SetSectionNext($op) => $body,
            SongOp::AddSample($op) => $body,
            SongOp::DeleteSample($op) => $body,
            SongOp::SetSampleVolume($op) => $body,
            SongOp::SetSampleTune($op) => $body,
            SongOp::SetSampleFadeOut($op) => $body,
            SongOp::SetSampleLoopMode($op) => $body,
            SongOp::SetSampleNewNoteAction($op) => $body,
        }
    };
}

impl SongOp {
    pub fn set_song_volume(volume: f32) -> Self {
        Self::SetSongVolume(SetSongVolume::new(volume))
    }

    pub fn add_track(index: usize, track: Handle<Track>) -> Self {
        Self::AddTrack(AddTrack::new(index, track))
    }

    pub fn delete_track(track: &Handle<Track>) -> Self {
        Self::DeleteTrack(DeleteTrack::new(track.clone()))
    }

    pub fn set_track_solo(track: &Handle<Track>, solo: bool) -> Self {
        Self::SetTrackSolo(SetTrackSolo::new(track.clone(), solo))
    }

    pub fn set_track_mute(track: &Handle<Track>, mute: bool) -> Self {
        Self::SetTrackMute(SetField::new(track, track_mute, mute))
    }

    pub fn set_track_volume(track: &Handle<Track>, volume: f32) -> Self {
        Self::SetTrackVolume(SetField::new(track, track_volume, volume))
    }

    pub fn set_track_pan(track: &Handle<Track>, pan: f32) -> Self {
        Self::SetTrackPan(SetField::new(track, track_pan, pan.clamp(-1.0, 1.0)))
    }

    pub fn clear_cell(cursor: TrackCursor, size: Ticks) -> Self {
        Self::ClearCell(ClearCell::new(cursor, size))
    }

    pub fn write_cell(cursor: TrackCursor, size: Ticks, event: Event) -> Self {
        Self::WriteCell(WriteCell::new(cursor, size, event))
    }

    pub fn merge_event(cursor: TrackCursor, event: Event, mask: EventMask) -> Self {
        Self::MergeEvent(MergeEvent::new(cursor, event, mask))
    }

    pub fn add_section(index: usize, section: Handle<Section>) -> Self {
        Self::AddSection(AddSection::new(index, section))
    }

    pub fn delete_section(section: &Handle<Section>) -> Self {
        Self::DeleteSection(DeleteSection::new(section.clone()))
    }

    pub fn slice_section(section: &Handle<Section>, pos: Ticks) -> Self {
        Self::SliceSection(SliceSection::new(section.clone(), pos))
    }

    pub fn set_section_length(section: &Handle<Section>, length: Ticks) -> Self {
        Self::SetSectionLength(SetField::new(section, section_length, length.max(0)))
    }

    pub fn set_section_tempo(section: &Handle<Section>, tempo: Option<u16>) -> Self {
        Self::SetSectionTempo(SetField::new(section, section_tempo, tempo.filter(|&t| t > 0)))
    }

    pub fn set_section_meter(section: &Handle<Section>, meter: Option<u16>) -> Self {
        Self::SetSectionMeter(SetField::new(section, section_meter, meter.filter(|&m| m > 0)))
    }

    pub fn set_section_next(section: &Handle<Section>, next: Option<&Handle<Section>>) -> Self {
        Self::SetSectionNext(
            SetField::new(section, section_next, next.map(ObjRef::new)).accepting(is_live_link),
        )
    }

    pub fn add_sample(index: usize, sample: Handle<Sample>) -> Self {
        Self::AddSample(AddSample::new(index, sample))
    }

    pub fn delete_sample(sample: &Handle<Sample>) -> Self {
        Self::DeleteSample(DeleteSample::new(sample.clone()))
    }

    pub fn set_sample_volume(sample: &Handle<Sample>, volume: f32) -> Self {
        Self::SetSampleVolume(SetField::new(sample, sample_volume, volume))
    }

    pub fn set_sample_tune(sample: &Handle<Sample>, tune: f32) -> Self {
        Self::SetSampleTune(SetField::new(sample, sample_tune, tune))
    }

    pub fn set_sample_fade_out(sample: &Handle<Sample>, fade_out: f32) -> Self {
        Self::SetSampleFadeOut(SetField::new(sample, sample_fade_out, fade_out.max(0.0)))
    }

    pub fn set_sample_loop_mode(sample: &Handle<Sample>, mode: LoopMode) -> Self {
        Self::SetSampleLoopMode(SetField::new(sample, sample_loop_mode, mode))
    }

    pub fn set_sample_new_note_action(sample: &Handle<Sample>, action: NewNoteAction) -> Self {
        Self::SetSampleNewNoteAction(SetField::new(sample, sample_new_note_action, action))
    }

    /// What this operation edits.
    pub fn target(&self) -> OpTarget {
        each_op!(self, op => op.op_target())
    }

    /// Can a continuous `other` replace this one in history?
    pub fn coalesces_with(&self, other: &SongOp) -> bool {
        mem::discriminant(self) == mem::discriminant(other) && self.target() == other.target()
    }
}

impl Operation for SongOp {
    fn do_it(&mut self, song: &Song) -> bool {
        each_op!(self, op => op.do_it(song))
    }

    fn undo_it(&mut self, song: &Song) {
        each_op!(self, op => op.undo_it(song))
    }
}
