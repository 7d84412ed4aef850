use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Analysis horizon key such as `1h` or `4h`.
///
/// Unknown keys are kept as-is: the backend may report horizons this crate
/// has no weight for, and those still take part in consensus with the
/// default weight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timeframe(String);

impl Timeframe {
    /// Known horizons, ascending by duration.
    pub const KNOWN: [&'static str; 8] = ["1m", "5m", "15m", "30m", "1h", "4h", "1d", "1w"];

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(ValidationError::EmptyTimeframe);
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_known(&self) -> bool {
        Self::KNOWN.contains(&self.as_str())
    }
}

impl Display for Timeframe {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Timeframe {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timeframe> for String {
    fn from(value: Timeframe) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timeframe_case_insensitively() {
        let timeframe = Timeframe::from_str(" 4H ").expect("must parse");
        assert_eq!(timeframe.as_str(), "4h");
        assert!(timeframe.is_known());
    }

    #[test]
    fn keeps_unknown_timeframes() {
        let timeframe = Timeframe::from_str("2h").expect("unknown keys are accepted");
        assert!(!timeframe.is_known());
    }

    #[test]
    fn rejects_empty_timeframe() {
        let err = Timeframe::from_str("  ").expect_err("must fail");
        assert_eq!(err, ValidationError::EmptyTimeframe);
    }
}
