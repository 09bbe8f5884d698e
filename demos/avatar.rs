use std::sync::{Arc, Mutex};

use anyhow::Context;
use avatar_realtime::error::{DeviceError, LoadError};
use avatar_realtime::recorder::WavEncoder;
use avatar_realtime::traits::{Animator, Capture, Expressions, Microphone, Speaker};
use avatar_realtime::types::ExpressionPreset;
use avatar_realtime::{Avatar, AvatarEvent, Config, Input, Parts, Tuning};
use avatar_realtime_utils as utils;
use clap::Parser;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::StreamConfig;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapProd;
use rubato::Resampler;
use tokio::io::AsyncBufReadExt;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

const RESAMPLE_CHUNK: usize = 1024;
const OUTPUT_BUFFER_SECS: usize = 60;
const INPUT_CAPACITY: usize = 1024;

#[derive(Parser, Debug)]
#[command(version, about = "Console avatar front-end")]
struct Args {
    /// Avatar server WebSocket URL.
    #[arg(long, env = "AVATAR_WS_URL", default_value = "ws://localhost:3000")]
    url: String,
    /// Input device name. Defaults to the host default.
    #[arg(long)]
    input: Option<String>,
    /// Output device name. Defaults to the host default.
    #[arg(long)]
    output: Option<String>,
}

fn resample(samples: &[f32], from: u32, to: u32) -> anyhow::Result<Vec<f32>> {
    if from == to || from == 0 || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    let mut resampler = utils::audio::create_resampler(from as f64, to as f64, RESAMPLE_CHUNK)?;
    let mut out = Vec::with_capacity(samples.len() * to as usize / from as usize + RESAMPLE_CHUNK);
    for chunk in utils::audio::split_for_chunks(samples, resampler.input_frames_next()) {
        let processed = resampler.process(&[chunk.as_slice()], None)?;
        if let Some(channel) = processed.first() {
            out.extend_from_slice(channel);
        }
    }
    Ok(out)
}

/// Decodes WAV replies and feeds them to the output stream's ring buffer.
struct CpalSpeaker {
    producer: HeapProd<f32>,
    output_rate: u32,
}

impl Speaker for CpalSpeaker {
    fn play(&mut self, payload: &[u8]) -> Result<f32, LoadError> {
        let decoded = utils::audio::decode_wav(payload).map_err(|e| LoadError::new(e.to_string()))?;
        let mono = utils::audio::to_mono(&decoded.samples, decoded.channels);
        let samples = resample(&mono, decoded.sample_rate, self.output_rate)
            .map_err(|e| LoadError::new(format!("resample failed: {}", e)))?;
        let pushed = self.producer.push_slice(&samples);
        if pushed < samples.len() {
            tracing::warn!("output buffer full, dropped {} samples", samples.len() - pushed);
        }
        Ok(decoded.duration_secs())
    }
}

struct CpalMic {
    device: Option<cpal::Device>,
    stream: Option<cpal::Stream>,
    buffer: Arc<Mutex<Vec<f32>>>,
    channels: u16,
    device_rate: u32,
    target_rate: u32,
}

impl CpalMic {
    fn new(device: Option<cpal::Device>) -> Self {
        Self {
            device,
            stream: None,
            buffer: Arc::new(Mutex::new(Vec::new())),
            channels: 1,
            device_rate: 0,
            target_rate: 0,
        }
    }
}

impl Microphone for CpalMic {
    fn is_present(&self) -> bool {
        self.device.is_some() && utils::device::has_input_device()
    }

    fn start(&mut self, sample_rate: u32, max_secs: u32) -> Result<(), DeviceError> {
        let device = self.device.as_ref().ok_or(DeviceError::NoDevice)?;
        let config: StreamConfig = device
            .default_input_config()
            .map_err(|e| DeviceError::Capture(e.to_string()))?
            .config();
        self.channels = config.channels;
        self.device_rate = config.sample_rate.0;
        self.target_rate = sample_rate;

        let limit = max_secs as usize * self.device_rate as usize * self.channels as usize;
        let buffer = self.buffer.clone();
        if let Ok(mut buf) = buffer.lock() {
            buf.clear();
        }
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        let room = limit.saturating_sub(buf.len());
                        buf.extend_from_slice(&data[..data.len().min(room)]);
                    }
                },
                |err| tracing::error!("an error occurred on input stream: {}", err),
                None,
            )
            .map_err(|e| DeviceError::Capture(e.to_string()))?;
        stream.play().map_err(|e| DeviceError::Capture(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) -> Result<Capture, DeviceError> {
        let stream = self
            .stream
            .take()
            .ok_or_else(|| DeviceError::Capture("not recording".to_string()))?;
        drop(stream);

        let raw = match self.buffer.lock() {
            Ok(mut buf) => std::mem::take(&mut *buf),
            Err(_) => return Err(DeviceError::Capture("capture buffer poisoned".to_string())),
        };
        let mono = utils::audio::to_mono(&raw, self.channels);
        let samples = resample(&mono, self.device_rate, self.target_rate)
            .map_err(|e| DeviceError::Capture(e.to_string()))?;
        tracing::info!("captured {:.2}s", samples.len() as f32 / self.target_rate.max(1) as f32);
        Ok(Capture {
            position: samples.len(),
            samples,
            channels: 1,
            sample_rate: self.target_rate,
        })
    }
}

struct ConsoleAnimator;

impl Animator for ConsoleAnimator {
    fn play_animation(&mut self, name: &str) {
        tracing::info!("animation: {}", name);
    }
}

struct ConsoleFace;

impl Expressions for ConsoleFace {
    fn show(&mut self, preset: ExpressionPreset) {
        tracing::info!("expression: {}", preset);
    }

    fn clear_all(&mut self) {
        tracing::info!("expression: neutral");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv_override().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    let args = Args::parse();

    let input = match utils::device::get_or_default_input(args.input.clone()) {
        Ok(device) => Some(device),
        Err(e) => {
            tracing::warn!("no input device: {}", e);
            None
        }
    };

    let output = utils::device::get_or_default_output(args.output.clone()).context("failed to get output device")?;
    let output_config: StreamConfig = output
        .default_output_config()
        .context("failed to get default output config")?
        .config();
    let output_channels = output_config.channels.max(1) as usize;
    let output_rate = output_config.sample_rate.0;
    tracing::info!("output: device={:?}, config={:?}", output.name().ok(), &output_config);

    let audio_out = utils::audio::shared_buffer(output_rate as usize * OUTPUT_BUFFER_SECS);
    let (producer, mut consumer) = audio_out.split();
    let output_stream = output
        .build_output_stream(
            &output_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(output_channels) {
                    let sample = consumer.try_pop().unwrap_or(0.0);
                    frame.fill(sample);
                }
            },
            |err| tracing::error!("an error occurred on output stream: {}", err),
            None,
        )
        .context("failed to build output stream")?;
    output_stream.play().context("failed to play output stream")?;

    let config = Config::builder().with_url(&args.url).build();
    let shutdown = CancellationToken::new();
    let (inputs_tx, inputs_rx) = tokio::sync::mpsc::channel(INPUT_CAPACITY);
    let (client, connection) = avatar_realtime::connect_with_config(config, inputs_tx.clone(), shutdown.clone());

    let parts = Parts {
        speaker: CpalSpeaker { producer, output_rate },
        animator: ConsoleAnimator,
        face: ConsoleFace,
        mic: CpalMic::new(input),
        encoder: WavEncoder,
        uplink: client,
    };
    let (avatar, handle) = Avatar::new(parts, Tuning::default(), shutdown.clone());
    println!("[{}]", handle.gate_state().label());

    let mut events = handle.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(AvatarEvent::Gate(state)) => println!("[{}]", state.label()),
                Ok(AvatarEvent::Connection(state)) => println!("connection: {}", state),
                Ok(AvatarEvent::PlaybackStarted { kind, estimated }) => {
                    println!("speaking ({:?}, ~{:.1}s)", kind, estimated)
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => tracing::debug!("missed {} events", n),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let controls = inputs_tx;
    let stdin_handle = handle.clone();
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let input = match line.trim() {
                "r" => Input::ToggleRecording,
                "d" => Input::RefreshDevice,
                "q" => {
                    stdin_handle.shutdown();
                    break;
                }
                _ => {
                    println!("r = record/stop, d = re-check mic, q = quit");
                    continue;
                }
            };
            if controls.send(input).await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = avatar.run(inputs_rx) => {},
        _ = tokio::signal::ctrl_c() => {
            println!("Received Ctrl-C, shutting down...");
        }
    }
    handle.shutdown();
    connection.await.context("connection task failed")?;
    drop(output_stream);
    println!("Shutting down...");
    Ok(())
}
