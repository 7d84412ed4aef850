use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Signal direction. `BUY`/`SELL` arrive from some backend versions and are
/// folded into `Bullish`/`Bearish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl Direction {
    pub const ALL: [Self; 3] = [Self::Bullish, Self::Bearish, Self::Neutral];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bullish => "BULLISH",
            Self::Bearish => "BEARISH",
            Self::Neutral => "NEUTRAL",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "BULLISH" | "BUY" | "LONG" => Ok(Self::Bullish),
            "BEARISH" | "SELL" | "SHORT" => Ok(Self::Bearish),
            "NEUTRAL" | "HOLD" => Ok(Self::Neutral),
            other => Err(ValidationError::InvalidDirection {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buy_and_sell_are_aliases() {
        assert_eq!(Direction::from_str("buy"), Ok(Direction::Bullish));
        assert_eq!(Direction::from_str("SELL"), Ok(Direction::Bearish));
    }

    #[test]
    fn rejects_unknown_direction() {
        let err = Direction::from_str("SIDEWAYS").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidDirection { .. }));
    }

    #[test]
    fn serializes_uppercase() {
        let json = serde_json::to_string(&Direction::Bearish).expect("serialize");
        assert_eq!(json, "\"BEARISH\"");
    }
}
