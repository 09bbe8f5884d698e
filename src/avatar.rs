use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::client::ClientHandle;
use crate::expression::ExpressionDirector;
use crate::gate::CaptureGate;
use crate::playback::{AudioQueue, Directives, Sequencer};
use crate::recorder::MicUploader;
use crate::traits::{Animator, Encoder, Expressions, Microphone, Speaker, Uplink};
use crate::tuning::Tuning;
use crate::types::{AudioKind, ControlCommand, ConnectionState, FrameKind, GateState};

const EVENT_CAPACITY: usize = 64;

/// Everything the scheduler reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// One inbound WebSocket message, text or binary.
    Frame(Vec<u8>),
    Connection(ConnectionState),
    /// The user pressed the record control.
    ToggleRecording,
    /// Re-check whether a capture device exists.
    RefreshDevice,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AvatarEvent {
    Connection(ConnectionState),
    Gate(GateState),
    PlaybackStarted { kind: AudioKind, estimated: f32 },
    PlaybackFinished,
    Drained,
}

/// Read side of a running [`Avatar`].
#[derive(Clone)]
pub struct AvatarHandle {
    gate: watch::Receiver<GateState>,
    events: broadcast::Sender<AvatarEvent>,
    queue: Arc<AudioQueue>,
    shutdown: CancellationToken,
}

impl AvatarHandle {
    pub fn gate_state(&self) -> GateState {
        *self.gate.borrow()
    }

    pub fn watch_gate(&self) -> watch::Receiver<GateState> {
        self.gate.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AvatarEvent> {
        self.events.subscribe()
    }

    /// Items waiting behind the one playing.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Stops the scheduler and, when they share the token, the connection.
    pub fn shutdown(&self) {
        tracing::info!("shutting down");
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// The collaborators an [`Avatar`] drives.
pub struct Parts<S, A, E, M, C, U = ClientHandle> {
    pub speaker: S,
    pub animator: A,
    pub face: E,
    pub mic: M,
    pub encoder: C,
    pub uplink: U,
}

/// Single-threaded scheduler for playback, expressions and the record
/// control. All state except the audio queue is owned here.
pub struct Avatar<S, A, E, M, C, U = ClientHandle> {
    speaker: S,
    animator: A,
    expressions: ExpressionDirector<E>,
    uploader: MicUploader<M, C>,
    uplink: U,
    sequencer: Sequencer,
    gate: CaptureGate,
    tuning: Tuning,
    gate_tx: watch::Sender<GateState>,
    events: broadcast::Sender<AvatarEvent>,
    shutdown: CancellationToken,
}

impl<S, A, E, M, C, U> Avatar<S, A, E, M, C, U>
where
    S: Speaker,
    A: Animator,
    E: Expressions,
    M: Microphone,
    C: Encoder,
    U: Uplink,
{
    pub fn new(parts: Parts<S, A, E, M, C, U>, tuning: Tuning, shutdown: CancellationToken) -> (Self, AvatarHandle) {
        let Parts {
            speaker,
            animator,
            face,
            mic,
            encoder,
            uplink,
        } = parts;

        let uploader = MicUploader::new(mic, encoder, tuning.sample_rate, tuning.max_record_secs);
        let gate = CaptureGate::new(uploader.mic_present());
        if !gate.mic_present() {
            tracing::warn!("no microphone found, recording disabled");
        }
        let (gate_tx, gate_rx) = watch::channel(gate.state());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let queue = Arc::new(AudioQueue::new());

        let handle = AvatarHandle {
            gate: gate_rx,
            events: events.clone(),
            queue: queue.clone(),
            shutdown: shutdown.clone(),
        };
        let avatar = Self {
            speaker,
            animator,
            expressions: ExpressionDirector::new(face),
            uploader,
            uplink,
            sequencer: Sequencer::new(queue, tuning.clone()),
            gate,
            tuning,
            gate_tx,
            events,
            shutdown,
        };
        (avatar, handle)
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn expressions(&self) -> &ExpressionDirector<E> {
        &self.expressions
    }

    pub fn uploader(&self) -> &MicUploader<M, C> {
        &self.uploader
    }

    pub fn speaker(&self) -> &S {
        &self.speaker
    }

    pub fn uplink(&self) -> &U {
        &self.uplink
    }

    /// Earliest pending timer, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.sequencer.deadline(), self.expressions.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Processes one input, then runs a tick.
    pub fn handle_input(&mut self, input: Input, now: Instant) {
        match input {
            Input::Frame(frame) => self.handle_frame(frame),
            Input::Connection(state) => {
                tracing::debug!("connection {}", state);
                self.gate.set_connection_open(state.is_open());
                self.emit(AvatarEvent::Connection(state));
            }
            Input::ToggleRecording => {
                let outcome = self.uploader.toggle(&mut self.gate, &self.uplink);
                tracing::debug!("record toggle: {:?}", outcome);
            }
            Input::RefreshDevice => {
                let present = self.uploader.mic_present();
                if present != self.gate.mic_present() {
                    tracing::info!("microphone present: {}", present);
                }
                self.gate.set_mic_present(present);
            }
        }
        self.tick(now);
    }

    /// Fires whatever timers are due and starts the next item if the speaker
    /// is free.
    pub fn tick(&mut self, now: Instant) {
        self.expressions.poll(now);

        let advance = self.sequencer.advance(now, &mut self.speaker);
        if advance.finished.is_some() {
            self.emit(AvatarEvent::PlaybackFinished);
        }
        if let Some(started) = advance.started {
            self.apply_directives(started.directives, now);
            self.emit(AvatarEvent::PlaybackStarted {
                kind: started.kind,
                estimated: started.estimated,
            });
        }
        if advance.drained {
            self.gate.on_drained();
            self.emit(AvatarEvent::Drained);
        }

        self.gate.set_playback_busy(self.sequencer.is_busy());
        self.publish_gate();
    }

    /// Runs until shutdown or until every input sender is gone.
    pub async fn run(mut self, mut inputs: mpsc::Receiver<Input>) {
        let shutdown = self.shutdown.clone();
        tracing::info!("avatar scheduler started");

        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                input = inputs.recv() => match input {
                    Some(input) => self.handle_input(input, Instant::now()),
                    None => {
                        tracing::debug!("all input senders dropped");
                        break;
                    }
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.tick(Instant::now());
                }
            }
        }

        self.expressions.cancel();
        tracing::info!("avatar scheduler stopped");
    }

    fn handle_frame(&mut self, frame: Vec<u8>) {
        match FrameKind::classify(&frame) {
            FrameKind::Empty => tracing::debug!("ignoring empty frame"),
            FrameKind::Audio => {
                tracing::debug!("received audio data ({} bytes)", frame.len());
                self.sequencer.queue().enqueue(frame);
            }
            FrameKind::Control => {
                let text = match std::str::from_utf8(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!("dropping control frame: {}", e);
                        return;
                    }
                };
                match ControlCommand::parse(text) {
                    Ok(command) => self.stage(command),
                    Err(e) => tracing::warn!("dropping command: {}", e),
                }
            }
        }
    }

    fn stage(&mut self, command: ControlCommand) {
        tracing::debug!("received command: {:?}", command);
        match command {
            ControlCommand::Expression { name, duration } => {
                self.sequencer.pending_mut().stage_expression(name, duration)
            }
            ControlCommand::Animation { name } => self.sequencer.pending_mut().stage_animation(name),
            ControlCommand::AudioKindTag { kind } => self.sequencer.queue().set_tag(kind),
        }
    }

    fn apply_directives(&mut self, directives: Directives, now: Instant) {
        if let Some(name) = directives.animation {
            tracing::debug!("play animation {}", name);
            self.animator.play_animation(&name);
        }
        if let Some((name, secs)) = directives.expression {
            let hold = self.tuning.expression_hold(secs);
            self.expressions.apply(&name, hold, now);
        }
    }

    fn publish_gate(&mut self) {
        let state = self.gate.state();
        let changed = self.gate_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
        if changed {
            tracing::debug!("gate {:?}", state);
            self.emit(AvatarEvent::Gate(state));
        }
    }

    fn emit(&self, event: AvatarEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}
