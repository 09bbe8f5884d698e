use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::avatar::Input;
use crate::error::{ConnectError, SendError};
use crate::traits::Uplink;
use crate::types::ConnectionState;

pub use config::{Config, ConfigBuilder};
pub use stats::Stats;

mod config;
mod consts;
mod stats;
mod utils;

pub type InputTx = mpsc::Sender<Input>;
type OutboundTx = mpsc::UnboundedSender<Vec<u8>>;
type OutboundRx = mpsc::UnboundedReceiver<Vec<u8>>;

/// Opens one WebSocket connection per call.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    type Io: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    async fn dial(&mut self) -> Result<WebSocketStream<Self::Io>, ConnectError>;
}

/// Dials the configured URL over TCP (or TLS for `wss://`).
pub struct WsDialer {
    config: Config,
}

impl WsDialer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Dialer for WsDialer {
    type Io = MaybeTlsStream<TcpStream>;

    async fn dial(&mut self) -> Result<WebSocketStream<Self::Io>, ConnectError> {
        let request = utils::build_request(&self.config)
            .map_err(|e| ConnectError::Request(e.to_string()))?;
        let (ws_stream, _) = tokio_tungstenite::connect_async(request).await?;
        Ok(ws_stream)
    }
}

/// Cheap, cloneable view of the connection used to query state and submit
/// outbound audio.
#[derive(Clone)]
pub struct ClientHandle {
    state: watch::Receiver<ConnectionState>,
    outbound: OutboundTx,
    stats: Arc<Mutex<Stats>>,
}

impl ClientHandle {
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Hands a binary frame to the socket. Fails instead of queueing when the
    /// connection is not open.
    pub fn send(&self, bytes: Vec<u8>) -> Result<(), SendError> {
        if !self.is_open() {
            tracing::warn!("not connected, can't send audio ({} bytes)", bytes.len());
            return Err(SendError::NotConnected);
        }
        self.outbound.send(bytes).map_err(|_| {
            tracing::error!("connection task has stopped, dropping audio");
            SendError::ChannelClosed
        })
    }

    pub fn stats(&self) -> Stats {
        match self.stats.lock() {
            Ok(stats) => stats.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Uplink for ClientHandle {
    fn submit(&self, bytes: Vec<u8>) -> Result<(), SendError> {
        self.send(bytes)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Lost,
    Shutdown,
}

/// Owns the socket. Keeps exactly one attempt in flight and retries forever
/// with a fixed delay until shut down.
pub struct Client<D: Dialer> {
    dialer: D,
    retry_delay: Duration,
    state_tx: watch::Sender<ConnectionState>,
    inputs: InputTx,
    outbound_rx: OutboundRx,
    stats: Arc<Mutex<Stats>>,
    shutdown: CancellationToken,
}

impl<D: Dialer> Client<D> {
    pub fn new(
        dialer: D,
        retry_delay: Duration,
        inputs: InputTx,
        shutdown: CancellationToken,
    ) -> (Self, ClientHandle) {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let stats = Arc::new(Mutex::new(Stats::new()));

        let handle = ClientHandle {
            state: state_rx,
            outbound: outbound_tx,
            stats: stats.clone(),
        };
        let client = Self {
            dialer,
            retry_delay,
            state_tx,
            inputs,
            outbound_rx,
            stats,
            shutdown,
        };
        (client, handle)
    }

    /// Runs the connect/serve/retry loop until shutdown or until nobody is
    /// listening for inputs any more.
    pub async fn run(mut self) {
        let shutdown = self.shutdown.clone();
        let mut attempt: u64 = 0;

        loop {
            if shutdown.is_cancelled() || self.inputs.is_closed() {
                break;
            }

            attempt += 1;
            self.with_stats(|s| s.record_attempt());
            self.set_state(ConnectionState::Connecting).await;
            tracing::debug!("connection attempt {}", attempt);

            let dialed = tokio::select! {
                dialed = self.dialer.dial() => dialed,
                _ = shutdown.cancelled() => break,
            };

            match dialed {
                Ok(ws_stream) => {
                    tracing::info!("connection open");
                    self.with_stats(|s| s.record_connect());
                    self.discard_stale_outbound();
                    self.set_state(ConnectionState::Open).await;

                    let end = self.serve(ws_stream, &shutdown).await;
                    self.set_state(ConnectionState::Closed).await;
                    if end == SessionEnd::Shutdown {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("connection attempt {} failed: {}", attempt, e);
                    self.set_state(ConnectionState::Disconnected).await;
                }
            }

            tracing::debug!("retrying connection in {:?}", self.retry_delay);
            tokio::select! {
                _ = tokio::time::sleep(self.retry_delay) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        if self.state_tx.borrow().is_open() {
            self.set_state(ConnectionState::Closed).await;
        }
        tracing::info!("connection manager stopped");
    }

    async fn serve(
        &mut self,
        ws_stream: WebSocketStream<D::Io>,
        shutdown: &CancellationToken,
    ) -> SessionEnd {
        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                message = read.next() => {
                    let message = match message {
                        Some(Ok(message)) => message,
                        Some(Err(e)) => {
                            tracing::error!("failed to read message: {}", e);
                            return SessionEnd::Lost;
                        }
                        None => {
                            tracing::info!("connection stream ended");
                            return SessionEnd::Lost;
                        }
                    };
                    let frame = match message {
                        Message::Text(text) => text.into_bytes(),
                        Message::Binary(bin) => bin,
                        Message::Close(reason) => {
                            tracing::info!("connection closed: {:?}", reason);
                            return SessionEnd::Lost;
                        }
                        _ => continue,
                    };
                    self.with_stats(|s| s.record_frame());
                    if self.inputs.send(Input::Frame(frame)).await.is_err() {
                        tracing::debug!("input receiver dropped, stopping connection");
                        return SessionEnd::Shutdown;
                    }
                }
                Some(bytes) = self.outbound_rx.recv() => {
                    let len = bytes.len();
                    if let Err(e) = write.send(Message::Binary(bytes)).await {
                        tracing::error!("failed to send message: {}", e);
                        return SessionEnd::Lost;
                    }
                    self.with_stats(|s| s.record_sent(len));
                    tracing::debug!("sent audio bytes ({} bytes)", len);
                }
                _ = shutdown.cancelled() => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        tracing::debug!("failed to send close frame: {}", e);
                    }
                    return SessionEnd::Shutdown;
                }
            }
        }
    }

    async fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
        tokio::select! {
            sent = self.inputs.send(Input::Connection(state)) => {
                if sent.is_err() {
                    tracing::debug!("input receiver dropped, state {} not delivered", state);
                }
            }
            _ = self.shutdown.cancelled() => {}
        }
    }

    // Anything submitted while the previous connection was dying is dropped,
    // never replayed onto the new one.
    fn discard_stale_outbound(&mut self) {
        while let Ok(stale) = self.outbound_rx.try_recv() {
            tracing::warn!("dropping stale outbound audio ({} bytes)", stale.len());
        }
    }

    fn with_stats(&self, f: impl FnOnce(&mut Stats)) {
        if let Ok(mut stats_guard) = self.stats.lock() {
            f(&mut stats_guard);
        } else {
            tracing::error!("failed to update stats");
        }
    }
}

/// Spawns the connection manager for any dialer.
pub fn spawn<D: Dialer>(
    dialer: D,
    retry_delay: Duration,
    inputs: InputTx,
    shutdown: CancellationToken,
) -> (ClientHandle, tokio::task::JoinHandle<()>) {
    let (client, handle) = Client::new(dialer, retry_delay, inputs, shutdown);
    let join = tokio::spawn(client.run());
    (handle, join)
}

/// Spawns the connection manager against `config.url()`.
pub fn connect_with_config(
    config: Config,
    inputs: InputTx,
    shutdown: CancellationToken,
) -> (ClientHandle, tokio::task::JoinHandle<()>) {
    let retry_delay = config.retry_delay();
    spawn(WsDialer::new(config), retry_delay, inputs, shutdown)
}

/// Spawns the connection manager with the environment-derived config.
pub fn connect(inputs: InputTx, shutdown: CancellationToken) -> (ClientHandle, tokio::task::JoinHandle<()>) {
    connect_with_config(Config::new(), inputs, shutdown)
}
