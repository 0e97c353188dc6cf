//! Realtime render thread feeding a ring buffer.
//!
//! The platform sink owns the consumer end and pops one [`Frame`] per
//! output frame. The render thread keeps the buffer full by running
//! `process_tick` and spinning while it has no room.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use ct_engine::fixed::{self, FINE_ONE};
use ct_engine::Sequencer;
use ct_ir::Ticks;
use log::debug;
use parking_lot::Mutex;
use ringbuf::traits::{Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::{Config, Frame, MasterError};

/// Remembers when the audio path last ran a tick, for latency compensation
/// of live input.
#[derive(Debug, Default)]
pub struct CallbackClock {
    last: Mutex<Option<Instant>>,
}

impl CallbackClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self) {
        *self.last.lock() = Some(Instant::now());
    }

    /// Time from the last tick to `now`, if a tick has run.
    pub fn since_last(&self, now: Instant) -> Option<Duration> {
        self.last.lock().map(|last| now.saturating_duration_since(last))
    }
}

/// Whole ticks at `tempo` that fit in `elapsed`.
pub fn ticks_in(elapsed: Duration, sample_rate: u32, tempo: u16) -> Ticks {
    let tick = fixed::tick_length(sample_rate, tempo).max(1) as u128;
    let elapsed = elapsed.as_nanos() * u128::from(sample_rate) * FINE_ONE as u128 / 1_000_000_000;
    (elapsed / tick).min(Ticks::MAX as u128) as Ticks
}

/// A running render thread. Dropping it stops the thread too.
pub struct StreamHandle {
    stop_signal: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl StreamHandle {
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the thread and wait for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop_signal.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
            debug!("render thread joined");
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub(crate) fn spawn(
    sequencer: Arc<Sequencer>,
    clock: Arc<CallbackClock>,
    config: &Config,
) -> Result<(StreamHandle, HeapCons<Frame>), MasterError> {
    let rb = HeapRb::<Frame>::new(config.stream_capacity);
    let (producer, consumer) = rb.split();

    let stop_signal = Arc::new(AtomicBool::new(false));
    let stop = stop_signal.clone();
    let sample_rate = config.sample_rate;
    let max_frames = config.max_frames_per_call;

    let thread = std::thread::Builder::new()
        .name("ct-render".into())
        .spawn(move || render_thread(&sequencer, &clock, producer, &stop, sample_rate, max_frames))?;

    Ok((
        StreamHandle {
            stop_signal,
            thread: Some(thread),
        },
        consumer,
    ))
}

fn render_thread(
    sequencer: &Sequencer,
    clock: &CallbackClock,
    mut producer: HeapProd<Frame>,
    stop: &AtomicBool,
    sample_rate: u32,
    max_frames: usize,
) {
    let mut buffer = vec![0.0f32; max_frames * 2];
    while !stop.load(Ordering::Relaxed) {
        let frames = sequencer.process_tick(&mut buffer, max_frames, sample_rate);
        clock.mark();
        for pair in buffer[..frames * 2].chunks_exact(2) {
            if !write_spin(&mut producer, Frame::new(pair[0], pair[1]), stop) {
                return;
            }
        }
    }
}

/// Push one frame, spinning until the ring buffer has room. Gives up when
/// the stream is stopped.
fn write_spin(producer: &mut HeapProd<Frame>, frame: Frame, stop: &AtomicBool) -> bool {
    while producer.try_push(frame).is_err() {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        std::hint::spin_loop();
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_in_counts_whole_ticks() {
        // 48000 Hz at 125 BPM: 120 frames, 2.5 ms per tick
        assert_eq!(ticks_in(Duration::ZERO, 48000, 125), 0);
        assert_eq!(ticks_in(Duration::from_micros(2499), 48000, 125), 0);
        assert_eq!(ticks_in(Duration::from_micros(2500), 48000, 125), 1);
        assert_eq!(ticks_in(Duration::from_millis(26), 48000, 125), 10);
    }

    #[test]
    fn clock_is_empty_until_marked() {
        let clock = CallbackClock::new();
        assert!(clock.since_last(Instant::now()).is_none());
        clock.mark();
        assert!(clock.since_last(Instant::now()).is_some());
    }
}
