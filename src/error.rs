use tokio_tungstenite::tungstenite;

/// A single connection attempt failed. Always retried.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("invalid connection request: {0}")]
    Request(String),
    #[error("handshake failed: {0}")]
    Handshake(#[from] tungstenite::Error),
}

/// Outbound audio could not be handed to the socket. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("not connected")]
    NotConnected,
    #[error("connection task has stopped")]
    ChannelClosed,
}

/// An audio payload could not be decoded for playback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to load audio: {0}")]
pub struct LoadError(pub String);

impl LoadError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("no capture device")]
    NoDevice,
    #[error("capture failed: {0}")]
    Capture(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to encode capture: {0}")]
pub struct EncodeError(pub String);
