use crate::types::GateState;

/// Where the user is in a record/send cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Recording,
    /// Capture submitted, waiting for its reply to finish playing.
    Sending,
}

/// Derives the record control's state from its inputs. Every read
/// recomputes it; no `GateState` is stored.
#[derive(Debug, Clone, Default)]
pub struct CaptureGate {
    mic_present: bool,
    connection_open: bool,
    playback_busy: bool,
    phase: Phase,
}

impl CaptureGate {
    pub fn new(mic_present: bool) -> Self {
        Self {
            mic_present,
            ..Self::default()
        }
    }

    pub fn state(&self) -> GateState {
        if !self.mic_present {
            return GateState::NoMic;
        }
        match self.phase {
            Phase::Recording => GateState::Recording,
            Phase::Sending => GateState::Sending,
            Phase::Idle if !self.connection_open || self.playback_busy => GateState::Disabled,
            Phase::Idle => GateState::Ready,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mic_present(&self) -> bool {
        self.mic_present
    }

    /// Result of a device presence check. Losing the mic abandons any cycle.
    pub fn set_mic_present(&mut self, present: bool) {
        if !present {
            self.phase = Phase::Idle;
        }
        self.mic_present = present;
    }

    /// A reply can no longer arrive once the connection drops, so a pending
    /// send is released. An active recording is left alone.
    pub fn set_connection_open(&mut self, open: bool) {
        if !open && self.phase == Phase::Sending {
            tracing::debug!("connection lost while sending, releasing gate");
            self.phase = Phase::Idle;
        }
        self.connection_open = open;
    }

    pub fn set_playback_busy(&mut self, busy: bool) {
        self.playback_busy = busy;
    }

    /// Moves to `Recording`. Only valid from `Ready`.
    pub fn begin_recording(&mut self) -> bool {
        if self.state() != GateState::Ready {
            return false;
        }
        self.phase = Phase::Recording;
        true
    }

    pub fn begin_sending(&mut self) -> bool {
        if self.phase != Phase::Recording {
            return false;
        }
        self.phase = Phase::Sending;
        true
    }

    /// Returns to idle after a failed start or a failed submit.
    pub fn abort(&mut self) {
        self.phase = Phase::Idle;
    }

    /// The queue emptied with no session playing.
    pub fn on_drained(&mut self) {
        self.playback_busy = false;
        if self.phase == Phase::Sending {
            self.phase = Phase::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_gate() -> CaptureGate {
        let mut gate = CaptureGate::new(true);
        gate.set_connection_open(true);
        gate
    }

    #[test]
    fn test_no_mic_wins() {
        let mut gate = CaptureGate::new(false);
        gate.set_connection_open(true);
        assert_eq!(gate.state(), GateState::NoMic);
        assert!(!gate.begin_recording());
        assert_eq!(gate.state(), GateState::NoMic);
    }

    #[test]
    fn test_disabled_until_open_and_idle() {
        let mut gate = CaptureGate::new(true);
        assert_eq!(gate.state(), GateState::Disabled);
        gate.set_connection_open(true);
        assert_eq!(gate.state(), GateState::Ready);
        gate.set_playback_busy(true);
        assert_eq!(gate.state(), GateState::Disabled);
        assert!(!gate.begin_recording());
    }

    #[test]
    fn test_full_cycle_recovers_on_drain() {
        let mut gate = ready_gate();
        assert!(gate.begin_recording());
        assert_eq!(gate.state(), GateState::Recording);
        // playback starting mid-recording does not interrupt it
        gate.set_playback_busy(true);
        assert_eq!(gate.state(), GateState::Recording);

        assert!(gate.begin_sending());
        assert_eq!(gate.state(), GateState::Sending);
        gate.set_playback_busy(false);
        assert_eq!(gate.state(), GateState::Sending);

        gate.set_playback_busy(true);
        gate.on_drained();
        assert_eq!(gate.state(), GateState::Ready);
    }

    #[test]
    fn test_drain_while_disconnected_is_disabled() {
        let mut gate = ready_gate();
        gate.begin_recording();
        gate.begin_sending();
        gate.set_connection_open(false);
        assert_eq!(gate.state(), GateState::Disabled);
        gate.on_drained();
        assert_eq!(gate.state(), GateState::Disabled);
        gate.set_connection_open(true);
        assert_eq!(gate.state(), GateState::Ready);
    }

    #[test]
    fn test_abort_after_failed_send() {
        let mut gate = ready_gate();
        gate.begin_recording();
        gate.begin_sending();
        gate.abort();
        assert_eq!(gate.state(), GateState::Ready);
        assert!(!gate.begin_sending());
    }

    #[test]
    fn test_recording_survives_connection_loss() {
        let mut gate = ready_gate();
        gate.begin_recording();
        gate.set_connection_open(false);
        assert_eq!(gate.state(), GateState::Recording);
        assert!(gate.begin_sending());
    }
}
