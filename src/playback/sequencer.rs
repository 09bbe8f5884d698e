use std::sync::Arc;

use tokio::time::Instant;

use super::pending::{Directives, PendingCommands};
use super::queue::AudioQueue;
use crate::traits::Speaker;
use crate::tuning::{deadline_after, Tuning};
use crate::types::AudioKind;

/// The item currently occupying the speaker.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub kind: AudioKind,
    pub started_at: Instant,
    /// Estimated play time in seconds as reported by the speaker.
    pub estimated: f32,
    /// Earliest instant the next item may start.
    pub not_before: Instant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Started {
    pub kind: AudioKind,
    pub estimated: f32,
    pub directives: Directives,
    pub not_before: Instant,
}

/// What one call to [`Sequencer::advance`] did.
#[derive(Debug, Default, PartialEq)]
pub struct Advance {
    pub finished: Option<PlaybackSession>,
    pub started: Option<Started>,
    pub skipped: usize,
    /// The sequencer went idle with nothing left queued during this call.
    pub drained: bool,
}

/// Plays queued items strictly one after another.
pub struct Sequencer {
    queue: Arc<AudioQueue>,
    pending: PendingCommands,
    session: Option<PlaybackSession>,
    tuning: Tuning,
}

impl Sequencer {
    pub fn new(queue: Arc<AudioQueue>, tuning: Tuning) -> Self {
        Self {
            queue,
            pending: PendingCommands::new(),
            session: None,
            tuning,
        }
    }

    pub fn queue(&self) -> &Arc<AudioQueue> {
        &self.queue
    }

    pub fn pending_mut(&mut self) -> &mut PendingCommands {
        &mut self.pending
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// Playing, or holding items that will play.
    pub fn is_busy(&self) -> bool {
        self.session.is_some() || !self.queue.is_empty()
    }

    /// When the current session's wait ends.
    pub fn deadline(&self) -> Option<Instant> {
        self.session.as_ref().map(|s| s.not_before)
    }

    /// Ends an elapsed session and starts the next playable item.
    ///
    /// Items the speaker cannot load are dropped without waiting and without
    /// touching the staged commands.
    pub fn advance<S: Speaker + ?Sized>(&mut self, now: Instant, speaker: &mut S) -> Advance {
        let mut advance = Advance::default();

        if let Some(session) = &self.session {
            if now < session.not_before {
                return advance;
            }
            advance.finished = self.session.take();
            tracing::debug!("playback finished");
        }

        while let Some(item) = self.queue.pop() {
            let estimated = match speaker.play(&item.payload) {
                Ok(estimated) => estimated,
                Err(e) => {
                    tracing::warn!("skipping {:?} audio ({} bytes): {}", item.kind, item.payload.len(), e);
                    advance.skipped += 1;
                    continue;
                }
            };

            let wait = self.tuning.playback_wait(estimated);
            if !(estimated.is_finite() && estimated > 0.0) {
                tracing::debug!("unusable duration estimate {}, waiting {:?}", estimated, wait);
            }
            let directives = self.pending.consume_for_playback(item.kind, &self.tuning);
            let not_before = deadline_after(now, wait);
            tracing::info!(
                "playing {:?} audio ({} bytes, ~{:.2}s)",
                item.kind,
                item.payload.len(),
                estimated
            );

            self.session = Some(PlaybackSession {
                kind: item.kind,
                started_at: now,
                estimated,
                not_before,
            });
            advance.started = Some(Started {
                kind: item.kind,
                estimated,
                directives,
                not_before,
            });
            return advance;
        }

        advance.drained = advance.finished.is_some() || advance.skipped > 0;
        if advance.drained {
            tracing::debug!("playback queue drained");
        }
        advance
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::LoadError;
    use crate::tuning::MAX_CUE_DURATION;

    /// Plays payloads whose first byte is the estimate in tenths of a
    /// second, unless `estimate` overrides it. An empty payload or one
    /// starting with 0xff fails to load.
    #[derive(Default)]
    pub(crate) struct FakeSpeaker {
        pub(crate) played: Vec<(Vec<u8>, Instant)>,
        pub(crate) clock: Option<Instant>,
        pub(crate) estimate: Option<f32>,
    }

    impl Speaker for FakeSpeaker {
        fn play(&mut self, payload: &[u8]) -> Result<f32, LoadError> {
            let first = *payload.first().ok_or_else(|| LoadError::new("empty payload"))?;
            if first == 0xff {
                return Err(LoadError::new("corrupt header"));
            }
            let at = self.clock.unwrap_or_else(Instant::now);
            self.played.push((payload.to_vec(), at));
            Ok(self.estimate.unwrap_or(first as f32 / 10.0))
        }
    }

    fn sequencer() -> Sequencer {
        Sequencer::new(Arc::new(AudioQueue::new()), Tuning::default())
    }

    #[test]
    fn test_fifo_without_overlap() {
        let mut seq = sequencer();
        let mut speaker = FakeSpeaker::default();
        let start = Instant::now();
        for payload in [vec![20, 1], vec![5, 2], vec![10, 3]] {
            seq.queue().enqueue(payload);
        }

        let mut now = start;
        let mut starts = Vec::new();
        loop {
            speaker.clock = Some(now);
            let step = seq.advance(now, &mut speaker);
            if let Some(started) = &step.started {
                starts.push((now, started.estimated));
            }
            if step.drained {
                break;
            }
            // ticking early must never start the next item
            let early = seq.advance(now + Duration::from_millis(1), &mut speaker);
            assert_eq!(early, Advance::default());
            now = seq.deadline().unwrap();
        }

        let order: Vec<u8> = speaker.played.iter().map(|(p, _)| p[1]).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(starts.len(), 3);
        for pair in starts.windows(2) {
            let (prev_at, prev_est) = pair[0];
            assert!(pair[1].0 >= prev_at + Duration::from_secs_f32(prev_est));
        }
        assert!(!seq.is_busy());
    }

    #[test]
    fn test_wait_includes_buffer_and_fallback() {
        let mut seq = sequencer();
        let mut speaker = FakeSpeaker::default();
        let now = Instant::now();

        seq.queue().enqueue(vec![20]);
        let started = seq.advance(now, &mut speaker).started.unwrap();
        assert_eq!(started.not_before, now + Duration::from_millis(2100));

        // zero estimate waits the fallback duration
        seq.queue().enqueue(vec![0]);
        let next = seq.advance(started.not_before, &mut speaker);
        assert!(next.finished.is_some());
        let started = next.started.unwrap();
        assert_eq!(started.not_before - (now + Duration::from_millis(2100)), Duration::from_millis(5100));
    }

    #[test]
    fn test_huge_estimate_waits_the_cap() {
        let mut seq = sequencer();
        let now = Instant::now();
        for estimate in [1e30, 1e19, f32::MAX] {
            let mut speaker = FakeSpeaker {
                estimate: Some(estimate),
                ..Default::default()
            };
            seq.queue().enqueue(vec![10]);
            let at = seq.deadline().unwrap_or(now);
            let started = seq.advance(at, &mut speaker).started.unwrap();
            assert_eq!(started.estimated, estimate);
            assert_eq!(started.not_before, at + MAX_CUE_DURATION + Duration::from_millis(100));
        }
    }

    #[test]
    fn test_load_error_skips_without_waiting() {
        let mut seq = sequencer();
        let now = Instant::now();
        let mut speaker = FakeSpeaker {
            clock: Some(now),
            ..Default::default()
        };
        seq.pending_mut().stage_animation("Wave".to_string());
        seq.queue().enqueue(Vec::new());
        seq.queue().enqueue(vec![10, 7]);

        let step = seq.advance(now, &mut speaker);
        assert_eq!(step.skipped, 1);
        let started = step.started.unwrap();
        assert_eq!(speaker.played, vec![(vec![10, 7], now)]);
        // the staged animation goes to the item that actually played
        assert_eq!(started.directives.animation.as_deref(), Some("Wave"));
    }

    #[test]
    fn test_all_failed_loads_count_as_drained() {
        let mut seq = sequencer();
        let mut speaker = FakeSpeaker::default();
        seq.queue().enqueue(Vec::new());
        let step = seq.advance(Instant::now(), &mut speaker);
        assert_eq!(step.skipped, 1);
        assert!(step.drained);
        assert!(!seq.is_busy());
    }

    #[test]
    fn test_idle_advance_is_quiet() {
        let mut seq = sequencer();
        let mut speaker = FakeSpeaker::default();
        assert_eq!(seq.advance(Instant::now(), &mut speaker), Advance::default());
    }

    #[test]
    fn test_fallback_item_gets_fixed_directives() {
        let mut seq = sequencer();
        let mut speaker = FakeSpeaker::default();
        let now = Instant::now();
        seq.pending_mut().stage_animation("Wave".to_string());
        seq.pending_mut().stage_expression("sad".to_string(), 3.0);
        seq.queue().set_tag(AudioKind::Fallback);
        seq.queue().enqueue(vec![10]);
        seq.queue().enqueue(vec![10]);

        let first = seq.advance(now, &mut speaker).started.unwrap();
        assert_eq!(first.kind, AudioKind::Fallback);
        assert_eq!(first.directives.animation.as_deref(), Some("Thinking"));
        assert_eq!(first.directives.expression, Some(("blink".to_string(), 2.5)));

        let second = seq.advance(first.not_before, &mut speaker).started.unwrap();
        assert_eq!(second.kind, AudioKind::Response);
        assert!(second.directives.is_empty());
    }
}
