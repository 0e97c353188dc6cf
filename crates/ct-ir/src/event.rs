//! Sparse per-tick events.
//!
//! An event is a diff against a track's current voice: any field left as
//! `None` keeps whatever the voice was already doing.

use core::ops::BitOr;

use crate::object::{Handle, ObjRef};
use crate::sample::Sample;
use crate::units::Ticks;

/// Special per-tick behavior started by an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Special {
    #[default]
    None,
    /// Decay velocity every tick by the sample's fade rate
    FadeOut,
    /// Glide toward the event's pitch instead of jumping to it
    Slide,
}

/// Selects event fields for [`Event::merge_masked`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventMask(u8);

impl EventMask {
    pub const NONE: Self = Self(0);
    pub const SAMPLE: Self = Self(1 << 0);
    pub const PITCH: Self = Self(1 << 1);
    pub const VELOCITY: Self = Self(1 << 2);
    pub const SPECIAL: Self = Self(1 << 3);
    pub const ALL: Self = Self(0b1111);

    /// Are all fields of `other` selected by this mask?
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for EventMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A sparse instruction on one track at one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Event {
    /// Tick within the section
    pub time: Ticks,
    /// Change the sounding sample (retriggers)
    pub sample: Option<ObjRef<Sample>>,
    /// Change pitch (semitones, `MIDDLE_C` = sample's own rate)
    pub pitch: Option<i32>,
    /// Change velocity (0-1)
    pub velocity: Option<f32>,
    /// Start a special action
    pub special: Special,
}

impl Event {
    /// An empty event at `time`.
    pub fn at(time: Ticks) -> Self {
        Self {
            time,
            ..Default::default()
        }
    }

    pub fn with_sample(mut self, sample: &Handle<Sample>) -> Self {
        self.sample = Some(ObjRef::new(sample));
        self
    }

    pub fn with_pitch(mut self, pitch: i32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn with_velocity(mut self, velocity: f32) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn with_special(mut self, special: Special) -> Self {
        self.special = special;
        self
    }

    /// Returns true if the event would change nothing.
    ///
    /// A reference to a deleted sample counts as absent.
    pub fn is_empty(&self) -> bool {
        self.sample.as_ref().and_then(|s| s.resolve()).is_none()
            && self.pitch.is_none()
            && self.velocity.is_none()
            && self.special == Special::None
    }

    /// Overwrite fields with those present in `other`. Absent fields are kept.
    pub fn merge(&mut self, other: &Event) {
        if let Some(sample) = &other.sample {
            self.sample = Some(sample.clone());
        }
        if other.pitch.is_some() {
            self.pitch = other.pitch;
        }
        if other.velocity.is_some() {
            self.velocity = other.velocity;
        }
        if other.special != Special::None {
            self.special = other.special;
        }
    }

    /// Overwrite exactly the fields selected by `mask`, including absent ones.
    pub fn merge_masked(&mut self, other: &Event, mask: EventMask) {
        if mask.contains(EventMask::SAMPLE) {
            self.sample = other.sample.clone();
        }
        if mask.contains(EventMask::PITCH) {
            self.pitch = other.pitch;
        }
        if mask.contains(EventMask::VELOCITY) {
            self.velocity = other.velocity;
        }
        if mask.contains(EventMask::SPECIAL) {
            self.special = other.special;
        }
    }
}

/// Index of the first event at or after `time` (binary search).
///
/// An exact hit returns that event; otherwise the insertion point.
pub fn find_event(events: &[Event], time: Ticks) -> usize {
    events.partition_point(|e| e.time < time)
}

/// Strictly ascending by tick, no duplicate ticks.
pub fn events_are_sorted(events: &[Event]) -> bool {
    events.windows(2).all(|w| w[0].time < w[1].time)
}
