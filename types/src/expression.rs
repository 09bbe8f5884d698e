use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Pseudo-expression that clears every weight.
pub const RESET_EXPRESSION: &str = "reset";

/// Facial expressions the avatar supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionPreset {
    Sad,
    Angry,
    Blink,
    Surprised,
    BlinkLeft,
    LookDown,
}

impl ExpressionPreset {
    pub const ALL: [ExpressionPreset; 6] = [
        ExpressionPreset::Sad,
        ExpressionPreset::Angry,
        ExpressionPreset::Blink,
        ExpressionPreset::Surprised,
        ExpressionPreset::BlinkLeft,
        ExpressionPreset::LookDown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpressionPreset::Sad => "sad",
            ExpressionPreset::Angry => "angry",
            ExpressionPreset::Blink => "blink",
            ExpressionPreset::Surprised => "surprised",
            ExpressionPreset::BlinkLeft => "blinkLeft",
            ExpressionPreset::LookDown => "lookDown",
        }
    }
}

impl fmt::Display for ExpressionPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unsupported expression: {0}")]
pub struct UnknownExpression(pub String);

impl FromStr for ExpressionPreset {
    type Err = UnknownExpression;

    /// Names match case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExpressionPreset::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownExpression(s.to_string()))
    }
}

impl Serialize for ExpressionPreset {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ExpressionPreset {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ExpressionPreset::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_ignores_case() {
        assert_eq!("SAD".parse(), Ok(ExpressionPreset::Sad));
        assert_eq!("blinkleft".parse(), Ok(ExpressionPreset::BlinkLeft));
        assert_eq!("lookDown".parse(), Ok(ExpressionPreset::LookDown));
        assert_eq!(
            "happy".parse::<ExpressionPreset>(),
            Err(UnknownExpression("happy".to_string()))
        );
        assert!(RESET_EXPRESSION.parse::<ExpressionPreset>().is_err());
    }

    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&ExpressionPreset::BlinkLeft).unwrap();
        assert_eq!(json, r#""blinkLeft""#);
        let preset: ExpressionPreset = serde_json::from_str(r#""Surprised""#).unwrap();
        assert_eq!(preset, ExpressionPreset::Surprised);
    }
}
