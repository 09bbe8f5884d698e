use std::time::Duration;

use tokio::time::Instant;

use crate::types::command::DEFAULT_EXPRESSION_SECS;

pub const FALLBACK_ANIMATION: &str = "Thinking";
pub const FALLBACK_EXPRESSION: &str = "blink";
pub const FALLBACK_EXPRESSION_SECS: f32 = 2.5;

/// Longest wait or hold a single cue can ask for.
pub const MAX_CUE_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Timing and cue constants for playback and capture.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Wait used when the speaker cannot estimate an item's length.
    pub fallback_duration: Duration,
    /// Slack added after each item before the next may start.
    pub playback_buffer: Duration,
    /// Hold time for expressions applied without a positive duration.
    pub default_expression_secs: f32,
    pub fallback_animation: String,
    pub fallback_expression: String,
    pub fallback_expression_secs: f32,
    pub sample_rate: u32,
    pub max_record_secs: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            fallback_duration: Duration::from_secs(5),
            playback_buffer: Duration::from_millis(100),
            default_expression_secs: DEFAULT_EXPRESSION_SECS,
            fallback_animation: FALLBACK_ANIMATION.to_string(),
            fallback_expression: FALLBACK_EXPRESSION.to_string(),
            fallback_expression_secs: FALLBACK_EXPRESSION_SECS,
            sample_rate: 16000,
            max_record_secs: 180,
        }
    }
}

impl Tuning {
    /// Converts a speaker estimate into a wait, substituting the fallback for
    /// anything that is not a positive finite number.
    pub fn playback_wait(&self, estimated_secs: f32) -> Duration {
        let play = cue_duration(estimated_secs).unwrap_or(self.fallback_duration.min(MAX_CUE_DURATION));
        play.saturating_add(self.playback_buffer)
    }

    pub fn expression_hold(&self, secs: f32) -> Duration {
        cue_duration(secs)
            .or_else(|| cue_duration(self.default_expression_secs))
            .unwrap_or(Duration::from_secs_f32(DEFAULT_EXPRESSION_SECS))
    }
}

/// Positive finite seconds as a duration, capped at [`MAX_CUE_DURATION`].
fn cue_duration(secs: f32) -> Option<Duration> {
    if !(secs.is_finite() && secs > 0.0) {
        return None;
    }
    let duration = Duration::try_from_secs_f32(secs).unwrap_or(MAX_CUE_DURATION);
    Some(duration.min(MAX_CUE_DURATION))
}

/// `now + wait`, never overflowing the clock.
pub fn deadline_after(now: Instant, wait: Duration) -> Instant {
    now.checked_add(wait)
        .or_else(|| now.checked_add(MAX_CUE_DURATION))
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_wait() {
        let tuning = Tuning::default();
        assert_eq!(tuning.playback_wait(2.0), Duration::from_millis(2100));
        assert_eq!(tuning.playback_wait(0.0), Duration::from_millis(5100));
        assert_eq!(tuning.playback_wait(-1.0), Duration::from_millis(5100));
        assert_eq!(tuning.playback_wait(f32::NAN), Duration::from_millis(5100));
    }

    #[test]
    fn test_expression_hold() {
        let tuning = Tuning::default();
        assert_eq!(tuning.expression_hold(3.0), Duration::from_secs(3));
        assert_eq!(tuning.expression_hold(0.0), Duration::from_secs(2));
    }

    #[test]
    fn test_huge_values_are_capped() {
        let tuning = Tuning::default();
        let capped = MAX_CUE_DURATION + Duration::from_millis(100);
        assert_eq!(tuning.playback_wait(1e30), capped);
        assert_eq!(tuning.playback_wait(1e19), capped);
        assert_eq!(tuning.playback_wait(f32::MAX), capped);
        assert_eq!(tuning.expression_hold(1e30), MAX_CUE_DURATION);
        assert_eq!(tuning.expression_hold(f32::INFINITY), Duration::from_secs(2));

        let odd = Tuning {
            fallback_duration: Duration::MAX,
            playback_buffer: Duration::MAX,
            default_expression_secs: f32::NAN,
            ..Tuning::default()
        };
        assert_eq!(odd.playback_wait(0.0), Duration::MAX);
        assert_eq!(odd.expression_hold(-1.0), Duration::from_secs(2));
    }

    #[test]
    fn test_deadline_after_does_not_overflow() {
        let now = Instant::now();
        assert_eq!(deadline_after(now, Duration::from_secs(3)), now + Duration::from_secs(3));
        assert_eq!(deadline_after(now, Duration::MAX), now + MAX_CUE_DURATION);
    }

    #[test]
    fn test_partial_overrides_keep_defaults() {
        let tuning: Tuning = serde_json::from_str(
            r#"{"fallback_animation":"Shrug","playback_buffer":{"secs":0,"nanos":250000000}}"#,
        )
        .unwrap();
        assert_eq!(tuning.fallback_animation, "Shrug");
        assert_eq!(tuning.playback_buffer, Duration::from_millis(250));
        assert_eq!(tuning.fallback_duration, Duration::from_secs(5));
        assert_eq!(tuning.max_record_secs, 180);

        let empty: Tuning = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, Tuning::default());
    }
}
