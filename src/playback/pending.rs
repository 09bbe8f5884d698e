use crate::tuning::Tuning;
use crate::types::AudioKind;

/// Visual cues to apply as an audio item starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directives {
    pub animation: Option<String>,
    /// Expression name and hold time in seconds.
    pub expression: Option<(String, f32)>,
}

impl Directives {
    pub fn is_empty(&self) -> bool {
        self.animation.is_none() && self.expression.is_none()
    }
}

/// At most one staged animation and one staged expression, each replaced by
/// newer arrivals of the same kind until consumed.
#[derive(Debug, Default)]
pub struct PendingCommands {
    animation: Option<String>,
    expression: Option<(String, f32)>,
}

impl PendingCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_animation(&mut self, name: String) {
        if let Some(previous) = self.animation.replace(name) {
            tracing::debug!("staged animation {} replaced before use", previous);
        }
    }

    pub fn stage_expression(&mut self, name: String, duration: f32) {
        if let Some((previous, _)) = self.expression.replace((name, duration)) {
            tracing::debug!("staged expression {} replaced before use", previous);
        }
    }

    pub fn animation(&self) -> Option<&str> {
        self.animation.as_deref()
    }

    pub fn expression(&self) -> Option<(&str, f32)> {
        self.expression.as_ref().map(|(n, d)| (n.as_str(), *d))
    }

    /// Turns staged intent into the cues for the item about to play.
    ///
    /// A fallback item always gets the fixed fallback pair and discards
    /// whatever was staged. A response item takes what is staged, possibly
    /// nothing.
    pub fn consume_for_playback(&mut self, kind: AudioKind, tuning: &Tuning) -> Directives {
        match kind {
            AudioKind::Fallback => {
                let discarded_animation = self.animation.take();
                let discarded_expression = self.expression.take();
                if discarded_animation.is_some() || discarded_expression.is_some() {
                    tracing::debug!(
                        "fallback audio discards staged animation={:?} expression={:?}",
                        discarded_animation,
                        discarded_expression
                    );
                }
                Directives {
                    animation: Some(tuning.fallback_animation.clone()),
                    expression: Some((
                        tuning.fallback_expression.clone(),
                        tuning.fallback_expression_secs,
                    )),
                }
            }
            AudioKind::Response => Directives {
                animation: self.animation.take(),
                expression: self.expression.take(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_writer_wins() {
        let tuning = Tuning::default();
        let mut pending = PendingCommands::new();
        pending.stage_animation("A".to_string());
        pending.stage_animation("B".to_string());
        pending.stage_expression("sad".to_string(), 3.0);
        pending.stage_expression("angry".to_string(), 1.0);

        let directives = pending.consume_for_playback(AudioKind::Response, &tuning);
        assert_eq!(directives.animation.as_deref(), Some("B"));
        assert_eq!(directives.expression, Some(("angry".to_string(), 1.0)));
    }

    #[test]
    fn test_response_consumes_once() {
        let tuning = Tuning::default();
        let mut pending = PendingCommands::new();
        pending.stage_animation("Waving".to_string());

        let first = pending.consume_for_playback(AudioKind::Response, &tuning);
        assert_eq!(first.animation.as_deref(), Some("Waving"));
        assert_eq!(first.expression, None);

        let second = pending.consume_for_playback(AudioKind::Response, &tuning);
        assert!(second.is_empty());
    }

    #[test]
    fn test_response_leaves_nothing_behind_per_slot() {
        let tuning = Tuning::default();
        let mut pending = PendingCommands::new();
        pending.stage_expression("sad".to_string(), 3.0);
        let directives = pending.consume_for_playback(AudioKind::Response, &tuning);
        assert_eq!(directives.animation, None);
        assert_eq!(pending.expression(), None);

        pending.stage_animation("Laugh".to_string());
        assert_eq!(pending.animation(), Some("Laugh"));
    }

    #[test]
    fn test_fallback_precedence() {
        let tuning = Tuning::default();
        let mut pending = PendingCommands::new();
        pending.stage_animation("Wave".to_string());
        pending.stage_expression("sad".to_string(), 3.0);

        let directives = pending.consume_for_playback(AudioKind::Fallback, &tuning);
        assert_eq!(directives.animation.as_deref(), Some("Thinking"));
        assert_eq!(directives.expression, Some(("blink".to_string(), 2.5)));

        // the staged pair is gone, not deferred
        assert_eq!(pending.animation(), None);
        assert_eq!(pending.expression(), None);
        let next = pending.consume_for_playback(AudioKind::Response, &tuning);
        assert!(next.is_empty());
    }
}
