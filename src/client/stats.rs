#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    connect_attempts: u64,
    connects: u64,
    frames_received: u64,
    bytes_sent: u64,
}

impl Stats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_attempt(&mut self) {
        self.connect_attempts += 1;
    }

    pub(crate) fn record_connect(&mut self) {
        self.connects += 1;
    }

    pub(crate) fn record_frame(&mut self) {
        self.frames_received += 1;
    }

    pub(crate) fn record_sent(&mut self, bytes: usize) {
        self.bytes_sent += bytes as u64;
    }

    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts
    }

    pub fn connects(&self) -> u64 {
        self.connects
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }
}
