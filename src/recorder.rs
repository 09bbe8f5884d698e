use crate::error::DeviceError;
use crate::gate::CaptureGate;
use crate::traits::{Capture, Encoder, Microphone, Uplink};
use crate::types::GateState;

/// Outcome of pressing the record control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    Started,
    Sent { bytes: usize },
    Failed,
    Ignored(GateState),
}

/// Drives the record control: start capture, stop it, encode and submit.
pub struct MicUploader<M, C> {
    mic: M,
    encoder: C,
    sample_rate: u32,
    max_secs: u32,
}

impl<M: Microphone, C: Encoder> MicUploader<M, C> {
    pub fn new(mic: M, encoder: C, sample_rate: u32, max_secs: u32) -> Self {
        Self {
            mic,
            encoder,
            sample_rate,
            max_secs,
        }
    }

    pub fn mic_present(&self) -> bool {
        self.mic.is_present()
    }

    pub fn mic(&self) -> &M {
        &self.mic
    }

    pub fn toggle<U: Uplink + ?Sized>(&mut self, gate: &mut CaptureGate, uplink: &U) -> Toggle {
        match gate.state() {
            GateState::Ready => self.start(gate),
            GateState::Recording => self.stop_and_send(gate, uplink),
            other => {
                tracing::debug!("record toggle ignored in state {:?}", other);
                Toggle::Ignored(other)
            }
        }
    }

    fn start(&mut self, gate: &mut CaptureGate) -> Toggle {
        if !gate.begin_recording() {
            return Toggle::Ignored(gate.state());
        }
        match self.mic.start(self.sample_rate, self.max_secs) {
            Ok(()) => {
                tracing::info!("recording started");
                Toggle::Started
            }
            Err(e) => {
                tracing::warn!("failed to start recording: {}", e);
                self.fail(gate, &e);
                Toggle::Failed
            }
        }
    }

    fn stop_and_send<U: Uplink + ?Sized>(&mut self, gate: &mut CaptureGate, uplink: &U) -> Toggle {
        let capture = match self.mic.stop() {
            Ok(capture) => capture,
            Err(e) => {
                tracing::warn!("failed to stop recording: {}", e);
                self.fail(gate, &e);
                return Toggle::Failed;
            }
        };
        gate.begin_sending();

        let rate = if capture.sample_rate > 0 {
            capture.sample_rate
        } else {
            self.sample_rate
        };
        let samples = trim_capture(&capture);
        let bytes = match self.encoder.encode(samples, capture.channels, rate) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("{}", e);
                gate.abort();
                return Toggle::Failed;
            }
        };

        let len = bytes.len();
        match uplink.submit(bytes) {
            Ok(()) => {
                tracing::info!("submitted recording ({} bytes)", len);
                Toggle::Sent { bytes: len }
            }
            Err(e) => {
                tracing::warn!("recording dropped: {}", e);
                gate.abort();
                Toggle::Failed
            }
        }
    }

    fn fail(&self, gate: &mut CaptureGate, error: &DeviceError) {
        gate.abort();
        if *error == DeviceError::NoDevice {
            gate.set_mic_present(false);
        }
    }
}

/// Cuts the capture buffer down to what the device actually wrote.
pub fn trim_capture(capture: &Capture) -> &[f32] {
    let samples = &capture.samples;
    if capture.position > 0 && capture.position < samples.len() {
        let keep = (capture.position * capture.channels.max(1) as usize).min(samples.len());
        &samples[..keep]
    } else {
        samples
    }
}

/// Encodes captures as 16-bit PCM WAV.
#[cfg(feature = "utils")]
#[derive(Debug, Clone, Copy, Default)]
pub struct WavEncoder;

#[cfg(feature = "utils")]
impl Encoder for WavEncoder {
    fn encode(&self, samples: &[f32], channels: u16, sample_rate: u32) -> Result<Vec<u8>, crate::error::EncodeError> {
        avatar_realtime_utils::audio::encode_wav(samples, channels, sample_rate)
            .map_err(|e| crate::error::EncodeError(e.to_string()))
    }
}
