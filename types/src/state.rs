use std::fmt;

/// Lifecycle of the one logical socket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No attempt in flight; the last handshake failed or none was made yet.
    #[default]
    Disconnected,
    Connecting,
    Open,
    /// An established connection was lost or closed by the remote.
    Closed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Whether the record control may be used, and why not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    /// No capture device for this session.
    NoMic,
    /// Mic present but the connection is not open, playback is busy, or an
    /// upload is in progress.
    Disabled,
    /// Recording may start.
    Ready,
    Recording,
    /// Capture stopped and submitted; held until the reply finishes playing.
    Sending,
}

impl GateState {
    /// True when the record control should accept a press.
    pub fn is_interactive(&self) -> bool {
        matches!(self, GateState::Ready | GateState::Recording)
    }

    /// Label shown on the record control.
    pub fn label(&self) -> &'static str {
        match self {
            GateState::NoMic => "No Mic",
            GateState::Disabled | GateState::Ready => "Record",
            GateState::Recording => "Stop",
            GateState::Sending => "Sending...",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize() {
        assert_eq!(serde_json::to_string(&GateState::NoMic).unwrap(), r#""no_mic""#);
        assert_eq!(serde_json::to_string(&ConnectionState::Open).unwrap(), r#""open""#);
        let state: ConnectionState = serde_json::from_str(r#""closed""#).unwrap();
        assert_eq!(state, ConnectionState::Closed);
    }

    #[test]
    fn test_interactive() {
        assert!(GateState::Ready.is_interactive());
        assert!(GateState::Recording.is_interactive());
        assert!(!GateState::Sending.is_interactive());
        assert!(!GateState::NoMic.is_interactive());
        assert_eq!(GateState::Recording.label(), "Stop");
    }
}
