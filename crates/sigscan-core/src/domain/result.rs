use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Direction, Symbol, Timeframe, UtcDateTime};

/// Backend risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    /// Gauge position on a 0..100 scale.
    pub const fn gauge(self) -> u8 {
        match self {
            Self::Low => 25,
            Self::Medium => 50,
            Self::High => 75,
        }
    }

    /// Buckets a numeric risk reading given on a 0..100 (or 0..1) scale.
    pub fn from_reading(value: f64) -> Self {
        let percent = if value <= 1.0 { value * 100.0 } else { value };
        if percent < 37.5 {
            Self::Low
        } else if percent < 62.5 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

impl Display for RiskLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" | "MED" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            _ => Err(()),
        }
    }
}

/// One timeframe's raw contribution as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeSignal {
    pub timeframe: Timeframe,
    pub score: f64,
    pub direction: Direction,
}

/// One symbol's normalized scan outcome. Scores are on the canonical 0..1 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub symbol: Symbol,
    pub score: f64,
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe_count: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timeframes: Vec<Timeframe>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timeframe_breakdown: Vec<TimeframeSignal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_24h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<UtcDateTime>,
}

impl ScanResult {
    pub fn new(symbol: Symbol, score: f64, direction: Direction) -> Self {
        Self {
            symbol,
            score,
            direction,
            confidence: None,
            timeframe_count: None,
            components: BTreeMap::new(),
            timeframes: Vec::new(),
            timeframe_breakdown: Vec::new(),
            risk_level: None,
            price: None,
            change_24h: None,
            volume: None,
            timestamp: None,
        }
    }

    pub fn with_timeframe_count(mut self, count: u32) -> Self {
        self.timeframe_count = Some(count);
        self
    }

    pub fn with_component(mut self, name: impl Into<String>, score: f64) -> Self {
        self.components.insert(name.into(), score);
        self
    }

    pub fn with_change_24h(mut self, change: f64) -> Self {
        self.change_24h = Some(change);
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_timeframes(mut self, timeframes: Vec<Timeframe>) -> Self {
        self.timeframes = timeframes;
        self
    }

    pub fn with_breakdown(mut self, breakdown: Vec<TimeframeSignal>) -> Self {
        self.timeframe_breakdown = breakdown;
        self
    }

    /// Number of detector components that contributed a signal.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn component_score(&self, name: &str) -> f64 {
        self.components.get(name).copied().unwrap_or(0.0)
    }

    pub fn risk_gauge(&self) -> u8 {
        self.risk_level.unwrap_or_default().gauge()
    }
}
