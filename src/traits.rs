//! Seams to the pieces the core drives but does not implement. The core
//! never renders or decodes audio itself.

use crate::error::{DeviceError, EncodeError, LoadError, SendError};
use crate::types::ExpressionPreset;

/// Starts audio playback.
pub trait Speaker {
    /// Begins playing a whole audio container and returns its estimated
    /// length in seconds. An estimate that is not a positive number is
    /// replaced by the configured fallback duration.
    fn play(&mut self, payload: &[u8]) -> Result<f32, LoadError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait Animator {
    fn play_animation(&mut self, name: &str);
}

/// Facial expression weights.
pub trait Expressions {
    /// Sets one preset to full weight.
    fn show(&mut self, preset: ExpressionPreset);
    /// Sets every preset back to zero.
    fn clear_all(&mut self);
}

/// What a stopped capture produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capture {
    /// Interleaved samples for the whole capture buffer.
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
    /// Final write position reported by the device, in frames.
    pub position: usize,
}

pub trait Microphone {
    fn is_present(&self) -> bool;
    fn start(&mut self, sample_rate: u32, max_secs: u32) -> Result<(), DeviceError>;
    fn stop(&mut self) -> Result<Capture, DeviceError>;
}

/// Packs captured samples into the outbound audio container.
pub trait Encoder {
    fn encode(&self, samples: &[f32], channels: u16, sample_rate: u32) -> Result<Vec<u8>, EncodeError>;
}

/// Where encoded captures go. Implemented by the connection handle.
pub trait Uplink {
    fn submit(&self, bytes: Vec<u8>) -> Result<(), SendError>;
}
