use std::str::FromStr;

pub const EXPRESSION_PREFIX: &str = "expression:";
pub const ANIMATION_PREFIX: &str = "animation:";
pub const AUDIO_PREFIX: &str = "audio:";

/// Hold time used when an expression command carries no usable duration.
pub const DEFAULT_EXPRESSION_SECS: f32 = 2.0;

/// How the next audio item should be staged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioKind {
    /// Normal reply, paired with whatever was staged before it.
    #[default]
    Response,
    /// Generic/error reply; forces the fixed fallback cues.
    Fallback,
}

impl AudioKind {
    fn from_tag(tag: &str) -> Self {
        if tag == "fallback" {
            AudioKind::Fallback
        } else {
            AudioKind::Response
        }
    }
}

/// A typed control directive parsed from a text frame.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlCommand {
    Expression { name: String, duration: f32 },
    Animation { name: String },
    AudioKindTag { kind: AudioKind },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

impl ControlCommand {
    /// Parses one command frame. Prefixes are case-sensitive; the rest of the
    /// frame is the argument.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        if text.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        if let Some(rest) = text.strip_prefix(EXPRESSION_PREFIX) {
            let (name, duration) = parse_expression(rest.trim());
            Ok(ControlCommand::Expression { name, duration })
        } else if let Some(rest) = text.strip_prefix(ANIMATION_PREFIX) {
            Ok(ControlCommand::Animation {
                name: rest.trim().to_string(),
            })
        } else if let Some(rest) = text.strip_prefix(AUDIO_PREFIX) {
            Ok(ControlCommand::AudioKindTag {
                kind: AudioKind::from_tag(rest.trim()),
            })
        } else {
            Err(ParseError::UnknownCommand(text.to_string()))
        }
    }
}

impl FromStr for ControlCommand {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ControlCommand::parse(s)
    }
}

// `NAME` or `NAME:DURATION`; a leading colon is part of the name.
fn parse_expression(arg: &str) -> (String, f32) {
    match arg.find(':') {
        Some(idx) if idx > 0 => {
            let name = arg[..idx].trim().to_string();
            let raw = arg[idx + 1..].trim();
            let duration = match raw.parse::<f32>() {
                Ok(d) if d.is_finite() => d,
                _ => {
                    tracing::debug!(
                        "malformed expression duration {:?}, using {}s",
                        raw,
                        DEFAULT_EXPRESSION_SECS
                    );
                    DEFAULT_EXPRESSION_SECS
                }
            };
            (name, duration)
        }
        _ => (arg.to_string(), DEFAULT_EXPRESSION_SECS),
    }
}
