use std::io::Cursor;

use anyhow::Context;
use hound::{SampleFormat, WavSpec, WavReader, WavWriter};
use ringbuf::HeapRb;
use rubato::{FastFixedIn, PolynomialDegree};

/// Sample rate of microphone audio sent upstream.
pub const CAPTURE_SAMPLE_RATE: u32 = 16000;

/// Creates a resampler to convert between audio sample rates.
pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )?;
    Ok(resampler)
}

/// Splits samples into fixed-size chunks, zero-padding the last one.
pub fn split_for_chunks(samples: &[f32], chunk_size: usize) -> Vec<Vec<f32>> {
    samples
        .chunks(chunk_size)
        .map(|chunk| {
            let mut chunk = chunk.to_vec();
            chunk.resize(chunk_size, 0.0);
            chunk
        })
        .collect()
}

/// Creates a new ring buffer on the heap for shared audio data.
pub fn shared_buffer(size: usize) -> HeapRb<f32> {
    HeapRb::new(size)
}

/// Averages interleaved frames down to one channel.
pub fn to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|c| c.iter().sum::<f32>() / c.len() as f32)
        .collect()
}

/// Converts a slice of f32 samples to a vector of i16 samples.
pub fn convert_f32_to_i16(pcm32: &[f32]) -> Vec<i16> {
    pcm32
        .iter()
        .map(|&sample| (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

/// Encodes interleaved f32 samples as a 16-bit PCM WAV file.
pub fn encode_wav(samples: &[f32], channels: u16, sample_rate: u32) -> anyhow::Result<Vec<u8>> {
    let spec = WavSpec {
        channels: channels.max(1),
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, spec).context("failed to start wav")?;
        for sample in convert_f32_to_i16(samples) {
            writer.write_sample(sample)?;
        }
        writer.finalize().context("failed to finalize wav")?;
    }
    Ok(cursor.into_inner())
}

/// PCM decoded from a WAV container, interleaved and normalised to [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }
}

/// Decodes a whole WAV payload.
pub fn decode_wav(bytes: &[u8]) -> anyhow::Result<DecodedAudio> {
    let mut reader = WavReader::new(Cursor::new(bytes)).context("not a wav payload")?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v as f32 / scale).clamp(-1.0, 1.0)))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    tracing::debug!(
        "decoded wav: {} samples, {}ch, {}hz",
        samples.len(),
        spec.channels,
        spec.sample_rate
    );
    Ok(DecodedAudio {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}

/// Reads the playing time of a WAV payload from its header.
pub fn estimate_duration(bytes: &[u8]) -> anyhow::Result<f32> {
    let reader = WavReader::new(Cursor::new(bytes)).context("not a wav payload")?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(anyhow::anyhow!("wav header has zero sample rate"));
    }
    Ok(reader.duration() as f32 / spec.sample_rate as f32)
}
