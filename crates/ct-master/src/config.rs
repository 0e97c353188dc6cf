//! Controller configuration.

use crate::MasterError;

/// Output and rendering settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Output frame rate in Hz
    pub sample_rate: u32,
    /// Largest block one `process_tick` call may produce
    pub max_frames_per_call: usize,
    /// Ring buffer size in frames between the render thread and the sink
    pub stream_capacity: usize,
    /// Upper bound on offline renders
    pub render_seconds: u32,
}

impl Default for Config {
    fn default() -> Self {
        let sample_rate = 48000;
        Self {
            sample_rate,
            max_frames_per_call: 1024,
            stream_capacity: sample_rate as usize / 10,
            render_seconds: 300,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), MasterError> {
        if self.sample_rate == 0 {
            return Err(MasterError::InvalidConfig("sample rate must be positive"));
        }
        if self.max_frames_per_call == 0 {
            return Err(MasterError::InvalidConfig("block size must be positive"));
        }
        if self.stream_capacity == 0 {
            return Err(MasterError::InvalidConfig("stream capacity must be positive"));
        }
        Ok(())
    }

    /// Frame limit for an offline render.
    pub fn max_render_frames(&self) -> usize {
        self.sample_rate as usize * self.render_seconds as usize
    }
}
