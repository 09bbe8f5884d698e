use std::time::Duration;

use tokio::time::Instant;

use crate::traits::Expressions;
use crate::tuning::{deadline_after, MAX_CUE_DURATION};
use crate::types::expression::RESET_EXPRESSION;
use crate::types::ExpressionPreset;

/// Holds at most one expression on the face and clears it when its hold
/// time runs out.
pub struct ExpressionDirector<E> {
    face: E,
    active: Option<(ExpressionPreset, Instant)>,
}

impl<E: Expressions> ExpressionDirector<E> {
    pub fn new(face: E) -> Self {
        Self {
            face,
            active: None,
        }
    }

    pub fn face(&self) -> &E {
        &self.face
    }

    pub fn active(&self) -> Option<ExpressionPreset> {
        self.active.map(|(preset, _)| preset)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.active.map(|(_, at)| at)
    }

    /// Shows `name` for `hold` (at most [`MAX_CUE_DURATION`]), replacing whatever was showing and its reset.
    /// `reset` clears the face now. Unknown names change nothing.
    pub fn apply(&mut self, name: &str, hold: Duration, now: Instant) {
        if name.eq_ignore_ascii_case(RESET_EXPRESSION) {
            tracing::debug!("expression reset");
            self.face.clear_all();
            self.active = None;
            return;
        }

        let preset: ExpressionPreset = match name.parse() {
            Ok(preset) => preset,
            Err(e) => {
                tracing::warn!("{}", e);
                return;
            }
        };

        let hold = hold.min(MAX_CUE_DURATION);
        tracing::debug!("expression {} for {:?}", preset, hold);
        self.face.clear_all();
        self.face.show(preset);
        self.active = Some((preset, deadline_after(now, hold)));
    }

    /// Clears the face once the hold has elapsed. Returns whether it did.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.active {
            Some((preset, at)) if now >= at => {
                tracing::debug!("expression {} expired", preset);
                self.face.clear_all();
                self.active = None;
                true
            }
            _ => false,
        }
    }

    /// Drops the pending reset without touching the face.
    pub fn cancel(&mut self) {
        self.active = None;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum FaceCall {
        Show(ExpressionPreset),
        ClearAll,
    }

    #[derive(Default)]
    pub(crate) struct RecordingFace {
        pub(crate) calls: Vec<FaceCall>,
    }

    impl Expressions for RecordingFace {
        fn show(&mut self, preset: ExpressionPreset) {
            self.calls.push(FaceCall::Show(preset));
        }

        fn clear_all(&mut self) {
            self.calls.push(FaceCall::ClearAll);
        }
    }

    fn director() -> ExpressionDirector<RecordingFace> {
        ExpressionDirector::new(RecordingFace::default())
    }

    #[test]
    fn test_apply_then_expire() {
        let mut director = director();
        let now = Instant::now();
        director.apply("Sad", Duration::from_secs(3), now);
        assert_eq!(director.active(), Some(ExpressionPreset::Sad));
        assert_eq!(director.deadline(), Some(now + Duration::from_secs(3)));
        assert_eq!(
            director.face().calls,
            vec![FaceCall::ClearAll, FaceCall::Show(ExpressionPreset::Sad)]
        );

        assert!(!director.poll(now + Duration::from_millis(2999)));
        assert!(director.poll(now + Duration::from_secs(3)));
        assert_eq!(director.face().calls.last(), Some(&FaceCall::ClearAll));
        assert_eq!(director.deadline(), None);
        assert!(!director.poll(now + Duration::from_secs(10)));
    }

    #[test]
    fn test_new_expression_cancels_previous_reset() {
        let mut director = director();
        let now = Instant::now();
        director.apply("sad", Duration::from_secs(1), now);
        director.apply("blinkLeft", Duration::from_secs(5), now + Duration::from_millis(500));

        // the first hold would have ended here
        assert!(!director.poll(now + Duration::from_secs(1)));
        assert_eq!(director.active(), Some(ExpressionPreset::BlinkLeft));
        assert_eq!(director.deadline(), Some(now + Duration::from_millis(5500)));
    }

    #[test]
    fn test_huge_hold_is_capped() {
        let mut director = director();
        let now = Instant::now();
        director.apply("angry", Duration::MAX, now);
        assert_eq!(director.active(), Some(ExpressionPreset::Angry));
        assert_eq!(director.deadline(), Some(now + MAX_CUE_DURATION));
        assert!(!director.poll(now + Duration::from_secs(3600)));
    }

    #[test]
    fn test_reset_clears_and_cancels() {
        let mut director = director();
        let now = Instant::now();
        director.apply("surprised", Duration::from_secs(4), now);
        director.apply("RESET", Duration::ZERO, now);
        assert_eq!(director.deadline(), None);
        assert_eq!(director.face().calls.len(), 3);
        assert_eq!(director.face().calls[2], FaceCall::ClearAll);
    }

    #[test]
    fn test_unknown_expression_is_ignored() {
        let mut director = director();
        let now = Instant::now();
        director.apply("lookDown", Duration::from_secs(4), now);
        director.apply("grin", Duration::from_secs(1), now);
        assert_eq!(director.active(), Some(ExpressionPreset::LookDown));
        assert_eq!(director.deadline(), Some(now + Duration::from_secs(4)));
        assert_eq!(director.face().calls.len(), 2);
    }
}
