//! Positions in the section graph.
//!
//! A [`Cursor`] is a weak section reference plus a tick offset. It holds no
//! locks between calls. Methods that need section state lock the section
//! themselves, one at a time; [`TrackCursor`] lookups instead take the
//! already-locked section so the caller decides how long the lock lives.

use std::sync::Arc;

use log::debug;

use crate::event::{find_event, Event};
use crate::object::{Handle, ObjRef};
use crate::section::Section;
use crate::song::Song;
use crate::units::Ticks;

/// Upper bound on `next` hops taken while resolving one move.
///
/// A cycle made only of zero-length sections would otherwise never land.
pub const MAX_SECTION_HOPS: usize = 64;

/// How a cursor crosses section boundaries when it moves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Space {
    /// Follow the song's section list; clamp at the first and last section
    #[default]
    Song,
    /// Follow `next` links, forward only; unpositioned when a chain ends
    Playback,
    /// Wrap around inside the current section
    SectionLoop,
}

/// A section and a tick inside it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cursor {
    /// `None` means unpositioned (stopped)
    pub section: Option<ObjRef<Section>>,
    /// Tick offset within the section
    pub time: Ticks,
}

impl Cursor {
    /// Cursor at the start of `section`.
    pub fn new(section: &Handle<Section>) -> Self {
        Self::at(section, 0)
    }

    pub fn at(section: &Handle<Section>, time: Ticks) -> Self {
        Self {
            section: Some(ObjRef::new(section)),
            time,
        }
    }

    /// An unpositioned cursor.
    pub fn stopped() -> Self {
        Self::default()
    }

    /// The section, if set and not deleted.
    pub fn section(&self) -> Option<Handle<Section>> {
        self.section.as_ref()?.resolve()
    }

    /// Is the cursor positioned in a live section?
    pub fn is_positioned(&self) -> bool {
        self.section().is_some()
    }

    /// Forget the position.
    pub fn clear(&mut self) {
        self.section = None;
        self.time = 0;
    }

    /// Step one tick in playback order.
    ///
    /// Reaching the end of a section follows `next`, possibly through
    /// several zero-length sections. If a chain ends, points at a deleted
    /// section or exceeds [`MAX_SECTION_HOPS`], the cursor becomes
    /// unpositioned. Returns whether the cursor is still positioned.
    pub fn advance_one_tick(&mut self) -> bool {
        self.move_playback(1)
    }

    /// Move by `amount` ticks (negative moves back) crossing boundaries
    /// according to `space`.
    pub fn move_by(&mut self, song: &Song, amount: Ticks, space: Space) {
        if !self.is_positioned() {
            return;
        }
        match space {
            Space::Song if amount >= 0 => self.move_song_forward(song, amount),
            Space::Song => self.move_song_backward(song, amount),
            Space::Playback => {
                if amount >= 0 {
                    self.move_playback(amount);
                } else {
                    // playback order cannot be walked backwards
                    self.time = (self.time + amount).max(0);
                }
            }
            Space::SectionLoop => {
                let Some(section) = self.section() else {
                    return;
                };
                let length = section.read().length;
                self.time = if length > 0 {
                    (self.time + amount).rem_euclid(length)
                } else {
                    0
                };
            }
        }
    }

    fn move_playback(&mut self, amount: Ticks) -> bool {
        let Some(mut section) = self.section() else {
            self.clear();
            return false;
        };
        self.time += amount;
        for _ in 0..MAX_SECTION_HOPS {
            let (length, next) = {
                let state = section.read();
                (state.length, state.next_section())
            };
            if self.time < length {
                self.section = Some(ObjRef::new(&section));
                return true;
            }
            self.time -= length;
            match next {
                Some(next) => section = next,
                None => {
                    self.clear();
                    return false;
                }
            }
        }
        debug!("cursor gave up after {MAX_SECTION_HOPS} section hops");
        self.clear();
        false
    }

    fn move_song_forward(&mut self, song: &Song, amount: Ticks) {
        self.time += amount;
        let members = song.read();
        while let Some(section) = self.section() {
            let length = section.read().length;
            if self.time < length {
                break;
            }
            let Some(index) = members.section_index(&section) else {
                self.clear();
                break;
            };
            match members.sections.get(index + 1) {
                Some(next) => {
                    self.time -= length;
                    self.section = Some(ObjRef::new(next));
                }
                None => {
                    self.time = length;
                    break;
                }
            }
        }
    }

    fn move_song_backward(&mut self, song: &Song, amount: Ticks) {
        self.time += amount;
        let members = song.read();
        while self.time < 0 {
            let Some(section) = self.section() else {
                break;
            };
            let Some(index) = members.section_index(&section) else {
                self.clear();
                break;
            };
            if index == 0 {
                self.time = 0;
                break;
            }
            let prev = &members.sections[index - 1];
            self.time += prev.read().length;
            self.section = Some(ObjRef::new(prev));
        }
    }

    /// The section after this one in song order.
    pub fn next_section(&self, song: &Song) -> Option<Handle<Section>> {
        let section = self.section()?;
        let members = song.read();
        let index = members.section_index(&section)?;
        members.sections.get(index + 1).cloned()
    }

    /// The section before this one in song order.
    pub fn prev_section(&self, song: &Song) -> Option<Handle<Section>> {
        let section = self.section()?;
        let members = song.read();
        let index = members.section_index(&section)?;
        members.sections.get(index.checked_sub(1)?).cloned()
    }

    /// Does the cursor point at `section`?
    pub fn is_in(&self, section: &Handle<Section>) -> bool {
        self.section().is_some_and(|s| Arc::ptr_eq(&s, section))
    }
}

/// A cursor pinned to one track.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackCursor {
    pub cursor: Cursor,
    pub track: usize,
}

impl TrackCursor {
    pub fn new(cursor: Cursor, track: usize) -> Self {
        Self { cursor, track }
    }

    /// Index of the first event on this track at or after the cursor.
    ///
    /// `section` must be the cursor's section, already locked by the caller.
    /// The search always runs fresh, so an index is never stale.
    pub fn find_event(&self, section: &Section) -> usize {
        find_event(section.events(self.track), self.cursor.time)
    }

    /// The event exactly at the cursor, if any.
    pub fn event_at<'a>(&self, section: &'a Section) -> Option<&'a Event> {
        section.event_at(self.track, self.cursor.time)
    }
}
