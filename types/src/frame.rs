/// Number of leading bytes inspected when classifying a frame.
pub const PROBE_LEN: usize = 8;

/// What an inbound frame carries, decided once from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    /// Zero-length frame; carries nothing and is ignored.
    Empty,
    /// Text directive (`expression:`, `animation:`, `audio:`).
    Control,
    /// Raw audio container bytes.
    Audio,
}

impl FrameKind {
    /// Classifies a frame by its first [`PROBE_LEN`] bytes.
    ///
    /// A frame is `Control` when every probed byte is printable ASCII or one of
    /// tab, newline and carriage return. There is no framing byte, so an audio
    /// payload whose first bytes happen to be printable is classified as
    /// `Control` and will fail to parse as a command.
    pub fn classify(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return FrameKind::Empty;
        }
        let probe = &bytes[..bytes.len().min(PROBE_LEN)];
        if probe.iter().all(|&b| is_text_byte(b)) {
            FrameKind::Control
        } else {
            FrameKind::Audio
        }
    }
}

fn is_text_byte(b: u8) -> bool {
    matches!(b, 0x20..=0x7e | b'\t' | b'\n' | b'\r')
}
