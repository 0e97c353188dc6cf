//! Edit cursor, selection and write policy.

use std::mem;
use std::sync::Arc;

use ct_ir::{Cursor, Event, EventMask, Song, Special, Ticks, TrackCursor, MIDDLE_C, TICKS_PER_BEAT};

use crate::operation::SongOp;
use crate::undoer::Undoer;

/// Editing state for one song.
pub struct Editor {
    song: Arc<Song>,
    pub undoer: Undoer,
    /// Where writes land
    pub cursor: TrackCursor,
    /// Grid step for cursor movement and cell writes
    pub cell_size: Ticks,
    /// Template for new events (never carries a special action)
    pub selected: Event,
    /// Write cells at the cursor
    pub record: bool,
    /// Replace whole cells rather than merge fields
    pub overwrite: bool,
    follow_playback: bool,
    moved_cursor: bool,
}

impl Editor {
    pub fn new(song: Arc<Song>) -> Self {
        let mut editor = Self {
            undoer: Undoer::new(Arc::clone(&song)),
            song,
            cursor: TrackCursor::default(),
            cell_size: TICKS_PER_BEAT / 4,
            selected: Event::default(),
            record: true,
            overwrite: true,
            follow_playback: true,
            moved_cursor: false,
        };
        editor.reset();
        editor
    }

    pub fn song(&self) -> &Arc<Song> {
        &self.song
    }

    /// Start over after the song was replaced or reloaded.
    pub fn reset(&mut self) {
        self.undoer.reset(Arc::clone(&self.song));

        self.selected = Event::at(0).with_pitch(MIDDLE_C).with_velocity(1.0);
        if let Some(first) = self.song.read().samples.first() {
            self.selected = self.selected.clone().with_sample(first);
        }

        self.cursor.track = 0;
        self.reset_cursor();
    }

    /// Put the cursor at the start of the first section.
    pub fn reset_cursor(&mut self) {
        if let Some(first) = self.song.read().sections.first() {
            self.cursor.cursor = Cursor::new(first);
        }
    }

    /// Does the edit cursor move along with playback?
    pub fn follow_playback(&self) -> bool {
        self.follow_playback
    }

    /// Turning follow off leaves the cursor on the grid.
    pub fn set_follow_playback(&mut self, follow: bool) {
        self.follow_playback = follow;
        if !follow {
            self.snap_to_grid();
        }
    }

    /// Put the cursor at `cursor`. While following playback, the player
    /// jumps there on the next [`Editor::follow`].
    pub fn move_to(&mut self, cursor: Cursor) {
        self.cursor.cursor = cursor;
        self.moved_cursor = true;
    }

    /// Sync with the player's cursor `playing`.
    ///
    /// Normally the edit cursor takes the play position. If the edit cursor
    /// was moved since the last call, it wins instead, and the position the
    /// player should seek to is returned.
    pub fn follow(&mut self, playing: &Cursor) -> Option<Cursor> {
        if !self.follow_playback || !playing.is_positioned() {
            return None;
        }
        if mem::take(&mut self.moved_cursor) {
            Some(self.cursor.cursor.clone())
        } else {
            self.cursor.cursor = playing.clone();
            None
        }
    }

    /// Round the cursor down to the cell grid.
    pub fn snap_to_grid(&mut self) {
        let cell = self.cell_size.max(1);
        self.cursor.cursor.time = self.cursor.cursor.time.div_euclid(cell) * cell;
    }

    /// Move to the next cell, continuing into the next section in song order.
    pub fn next_cell(&mut self) {
        self.moved_cursor = true;
        self.snap_to_grid();
        self.cursor.cursor.time += self.cell_size.max(1);
        let Some(section) = self.cursor.cursor.section() else {
            return;
        };
        let length = section.read().length;
        if self.cursor.cursor.time >= length {
            match self.cursor.cursor.next_section(&self.song) {
                Some(next) => self.cursor.cursor = Cursor::new(&next),
                None => {
                    self.cursor.cursor.time = (length - 1).max(0);
                    self.snap_to_grid();
                }
            }
        }
    }

    /// Move to the previous cell, continuing into the previous section.
    pub fn prev_cell(&mut self) {
        self.moved_cursor = true;
        let cell = self.cell_size.max(1);
        let time = self.cursor.cursor.time;
        if time % cell != 0 {
            self.snap_to_grid();
        } else if time < cell {
            if let Some(prev) = self.cursor.cursor.prev_section(&self.song) {
                let length = prev.read().length;
                self.cursor.cursor = Cursor::at(&prev, (length - 1).max(0));
                self.snap_to_grid();
            }
        } else {
            self.cursor.cursor.time -= cell;
        }
    }

    /// Take the present fields of `event` into the selection.
    pub fn select(&mut self, event: &Event) {
        self.selected.merge(event);
        self.selected.special = Special::None;
        self.selected.time = 0;
    }

    /// Index of the selected sample in the song, if it is still there.
    pub fn selected_sample_index(&self) -> Option<usize> {
        let sample = self.selected.sample.as_ref()?.resolve()?;
        self.song.read().sample_index(&sample)
    }

    /// Write `event` at the cursor.
    ///
    /// Without overwrite, the masked fields merge into the event at the
    /// cursor. Otherwise, when recording, the cursor's cell is replaced
    /// (a single tick while playing, so live input lands on the tick it was
    /// played on). Returns whether anything changed.
    pub fn write_event(&mut self, playing: bool, event: &Event, mask: EventMask, continuous: bool) -> bool {
        let op = if !self.overwrite {
            SongOp::merge_event(self.cursor.clone(), event.clone(), mask)
        } else if self.record {
            let size = if playing { 1 } else { self.cell_size };
            SongOp::write_cell(self.cursor.clone(), size, event.clone())
        } else {
            return false;
        };
        self.undoer.apply_continuous(op, continuous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_ir::{Sample, Section, Track};

    fn editor_with_sections(lengths: &[Ticks]) -> Editor {
        let song = Arc::new(Song::new());
        song.push_track(Track::new("t"));
        song.push_sample(Sample::new("first"));
        for &l in lengths {
            song.push_section(Section::new(l, 1));
        }
        Editor::new(song)
    }

    #[test]
    fn reset_selects_first_sample_and_section() {
        let editor = editor_with_sections(&[192]);
        assert_eq!(editor.selected_sample_index(), Some(0));
        assert_eq!(editor.selected.pitch, Some(MIDDLE_C));
        assert!(editor.cursor.cursor.is_positioned());
        assert_eq!(editor.cursor.cursor.time, 0);
    }

    #[test]
    fn next_cell_crosses_sections_and_clamps() {
        let mut editor = editor_with_sections(&[96, 96]);
        editor.cell_size = 48;
        editor.next_cell();
        assert_eq!(editor.cursor.cursor.time, 48);
        editor.next_cell();
        assert_eq!(editor.cursor.cursor.time, 0);
        let second = editor.song().read().sections[1].clone();
        assert!(editor.cursor.cursor.is_in(&second));
        editor.next_cell();
        editor.next_cell();
        assert!(editor.cursor.cursor.is_in(&second));
        assert_eq!(editor.cursor.cursor.time, 48);
    }

    #[test]
    fn prev_cell_snaps_then_steps_back() {
        let mut editor = editor_with_sections(&[96, 96]);
        editor.cell_size = 48;
        let second = editor.song().read().sections[1].clone();
        editor.cursor.cursor = Cursor::at(&second, 10);
        editor.prev_cell();
        assert_eq!(editor.cursor.cursor.time, 0);
        editor.prev_cell();
        assert_eq!(editor.cursor.cursor.time, 48);
        assert!(!editor.cursor.cursor.is_in(&second));
    }

    #[test]
    fn select_drops_special() {
        let mut editor = editor_with_sections(&[96]);
        editor.select(&Event::at(40).with_pitch(50).with_special(Special::FadeOut));
        assert_eq!(editor.selected.pitch, Some(50));
        assert_eq!(editor.selected.special, Special::None);
        assert_eq!(editor.selected.time, 0);
    }

    #[test]
    fn write_event_records_cell_and_undoes() {
        let mut editor = editor_with_sections(&[96]);
        let event = editor.selected.clone();
        assert!(editor.write_event(false, &event, EventMask::ALL, false));
        let section = editor.song().read().sections[0].clone();
        assert!(section.read().event_at(0, 0).is_some());
        assert!(editor.undoer.undo());
        assert!(section.read().event_at(0, 0).is_none());
    }

    #[test]
    fn write_event_merges_without_overwrite() {
        let mut editor = editor_with_sections(&[96]);
        let section = editor.song().read().sections[0].clone();
        section.write().events_mut(0).push(Event::at(0).with_pitch(40));
        editor.overwrite = false;
        assert!(editor.write_event(false, &Event::at(0).with_velocity(0.25), EventMask::VELOCITY, false));
        let event = section.read().event_at(0, 0).cloned().unwrap();
        assert_eq!(event.pitch, Some(40));
        assert_eq!(event.velocity, Some(0.25));
    }

    #[test]
    fn follow_tracks_player_until_cursor_moves() {
        let mut editor = editor_with_sections(&[96, 96]);
        editor.cell_size = 48;
        let second = editor.song().read().sections[1].clone();

        assert_eq!(editor.follow(&Cursor::at(&second, 30)), None);
        assert!(editor.cursor.cursor.is_in(&second));
        assert_eq!(editor.cursor.cursor.time, 30);

        editor.prev_cell();
        let seek = editor.follow(&Cursor::at(&second, 31)).unwrap();
        assert!(seek.is_in(&second));
        assert_eq!(seek.time, 0);
        assert_eq!(editor.cursor.cursor.time, 0);

        assert_eq!(editor.follow(&Cursor::at(&second, 32)), None);
        assert_eq!(editor.cursor.cursor.time, 32);
    }

    #[test]
    fn follow_off_or_stopped_leaves_cursor() {
        let mut editor = editor_with_sections(&[96]);
        let first = editor.song().read().sections[0].clone();
        assert_eq!(editor.follow(&Cursor::stopped()), None);
        assert_eq!(editor.cursor.cursor.time, 0);

        editor.cursor.cursor.time = 13;
        editor.set_follow_playback(false);
        assert_eq!(editor.cursor.cursor.time, 0);
        assert_eq!(editor.follow(&Cursor::at(&first, 50)), None);
        assert_eq!(editor.cursor.cursor.time, 0);
    }

    #[test]
    fn no_record_no_write() {
        let mut editor = editor_with_sections(&[96]);
        editor.record = false;
        let event = editor.selected.clone();
        assert!(!editor.write_event(false, &event, EventMask::ALL, false));
    }
}
