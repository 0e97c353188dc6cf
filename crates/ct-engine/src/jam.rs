//! Live input lanes.
//!
//! Jam events arrive from the input thread with a tick delay that makes up
//! for the time since the last audio callback. They wait in a fixed-size
//! queue and are dispatched to a fixed pool of lanes. Nothing here
//! allocates.

use ct_ir::{Event, Special, Ticks};
use heapless::{Deque, FnvIndexMap};
use log::debug;

use crate::track::TrackPlayer;

/// Lanes available for simultaneous touches.
pub const NUM_JAM_LANES: usize = 8;

/// Pending live events. The oldest is dropped when full.
pub const JAM_QUEUE_LEN: usize = 32;

/// Identifies one held key or touch for the life of a note.
pub type TouchId = u32;

/// A live event waiting to be played.
#[derive(Clone, Debug, Default)]
pub struct JamEvent {
    pub event: Event,
    pub touch: TouchId,
    /// Ticks to wait before dispatch
    pub delay: Ticks,
}

impl JamEvent {
    pub fn new(event: Event, touch: TouchId, delay: Ticks) -> Self {
        Self {
            event,
            touch,
            delay: delay.max(0),
        }
    }
}

/// The jam queue and its lane pool.
#[derive(Debug)]
pub struct Jam {
    queue: Deque<JamEvent, JAM_QUEUE_LEN>,
    lanes: [TrackPlayer; NUM_JAM_LANES],
    /// touch -> lane, while held
    touch_lanes: FnvIndexMap<TouchId, usize, NUM_JAM_LANES>,
    /// lane -> touch, `None` when free
    lane_touches: [Option<TouchId>; NUM_JAM_LANES],
}

impl Default for Jam {
    fn default() -> Self {
        Self::new()
    }
}

impl Jam {
    pub fn new() -> Self {
        Self {
            queue: Deque::new(),
            lanes: core::array::from_fn(|_| TrackPlayer::new()),
            touch_lanes: FnvIndexMap::new(),
            lane_touches: [None; NUM_JAM_LANES],
        }
    }

    /// Cut every lane and forget all touches. Queued events stay queued.
    pub fn stop(&mut self) {
        for lane in &mut self.lanes {
            lane.stop();
        }
        self.touch_lanes.clear();
        self.lane_touches = [None; NUM_JAM_LANES];
    }

    /// Queue a live event. When the queue is full the oldest entry is dropped.
    pub fn queue_event(&mut self, jam: JamEvent) {
        if self.queue.is_full() {
            self.queue.pop_front();
        }
        // cannot fail: a slot was just freed
        let _ = self.queue.push_back(jam);
    }

    /// Number of events waiting.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Lane currently held by `touch`.
    pub fn lane_for(&self, touch: TouchId) -> Option<usize> {
        self.touch_lanes.get(&touch).copied()
    }

    pub fn lane(&self, index: usize) -> Option<&TrackPlayer> {
        self.lanes.get(index)
    }

    /// Dispatch events whose delay has run out and count down the rest.
    ///
    /// An event queued with delay `n` is dispatched on the `n + 1`th call.
    pub fn process_events(&mut self) {
        for _ in 0..self.queue.len() {
            let Some(mut jam) = self.queue.pop_front() else {
                break;
            };
            if jam.delay <= 0 {
                self.dispatch(&jam);
            } else {
                jam.delay -= 1;
                let _ = self.queue.push_back(jam);
            }
        }
    }

    /// Play `jam` on its touch's lane, assigning a free lane if needed.
    pub fn dispatch(&mut self, jam: &JamEvent) {
        let lane = match self.lane_for(jam.touch) {
            Some(lane) => lane,
            None => {
                let Some(lane) = self.lane_touches.iter().position(Option::is_none) else {
                    debug!("no free jam lane for touch {}", jam.touch);
                    return;
                };
                if self.touch_lanes.insert(jam.touch, lane).is_err() {
                    return;
                }
                self.lane_touches[lane] = Some(jam.touch);
                lane
            }
        };
        self.lanes[lane].apply_event(&jam.event);
        if jam.event.special == Special::FadeOut {
            self.touch_lanes.remove(&jam.touch);
            self.lane_touches[lane] = None;
        }
    }

    /// Mix every lane at the song's master gain.
    pub fn mix_tick(&mut self, buffer: &mut [f32], frames: usize, out_rate: u32, master: f32) {
        for lane in &mut self.lanes {
            lane.mix_tick(buffer, frames, out_rate, master);
        }
    }
}
