//! Scan inputs and the wire request sent to the scan backend.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{RiskLevel, Symbol, Timeframe, ValidationError};

/// Tolerance before detector weights are rescaled to sum to 1.
const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Per-detector weights forwarded to the backend. The core never interprets them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorWeights {
    pub harmonic: f64,
    pub elliott: f64,
    pub smc: f64,
    pub fibonacci: f64,
    pub price_action: f64,
    pub sar: f64,
    pub sentiment: f64,
    pub news: f64,
    pub whales: f64,
}

impl Default for DetectorWeights {
    fn default() -> Self {
        Self {
            harmonic: 0.15,
            elliott: 0.15,
            smc: 0.20,
            fibonacci: 0.10,
            price_action: 0.15,
            sar: 0.10,
            sentiment: 0.10,
            news: 0.05,
            whales: 0.05,
        }
    }
}

impl DetectorWeights {
    fn values(&self) -> [f64; 9] {
        [
            self.harmonic,
            self.elliott,
            self.smc,
            self.fibonacci,
            self.price_action,
            self.sar,
            self.sentiment,
            self.news,
            self.whales,
        ]
    }

    pub fn sum(&self) -> f64 {
        self.values().iter().sum()
    }

    /// Rescales so the weights sum to 1 when they are off by more than 0.01.
    pub fn normalized(self) -> Result<Self, ValidationError> {
        if self.values().iter().any(|value| !value.is_finite()) {
            return Err(ValidationError::NonFiniteValue { field: "weights" });
        }
        if self.values().iter().any(|value| *value < 0.0) {
            return Err(ValidationError::NegativeValue { field: "weights" });
        }

        let sum = self.sum();
        if sum <= 0.0 {
            return Err(ValidationError::InvalidConfig {
                reason: String::from("detector weights must not all be zero"),
            });
        }
        if (sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE {
            return Ok(self);
        }

        let factor = 1.0 / sum;
        Ok(Self {
            harmonic: self.harmonic * factor,
            elliott: self.elliott * factor,
            smc: self.smc * factor,
            fibonacci: self.fibonacci * factor,
            price_action: self.price_action * factor,
            sar: self.sar * factor,
            sentiment: self.sentiment * factor,
            news: self.news * factor,
            whales: self.whales * factor,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskMode {
    Aggressive,
    #[default]
    Conservative,
}

/// Thresholds applied by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanRules {
    /// Minimum score any single timeframe must reach.
    pub any_tf: f64,
    /// Minimum score a majority of timeframes must reach.
    pub majority_tf: f64,
    pub mode: RiskMode,
}

impl Default for ScanRules {
    fn default() -> Self {
        Self {
            any_tf: 0.6,
            majority_tf: 0.7,
            mode: RiskMode::Conservative,
        }
    }
}

/// Weights plus rules; the unit presets switch between.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScanProfile {
    pub weights: DetectorWeights,
    pub rules: ScanRules,
}

impl ScanProfile {
    pub fn aggressive() -> Self {
        Self {
            weights: DetectorWeights {
                harmonic: 0.10,
                elliott: 0.10,
                smc: 0.25,
                fibonacci: 0.10,
                price_action: 0.20,
                sar: 0.10,
                sentiment: 0.05,
                news: 0.05,
                whales: 0.05,
            },
            rules: ScanRules {
                any_tf: 0.5,
                majority_tf: 0.6,
                mode: RiskMode::Aggressive,
            },
        }
    }

    pub fn conservative() -> Self {
        Self {
            weights: DetectorWeights {
                harmonic: 0.20,
                elliott: 0.20,
                smc: 0.15,
                fibonacci: 0.15,
                price_action: 0.10,
                sar: 0.10,
                sentiment: 0.05,
                news: 0.03,
                whales: 0.02,
            },
            rules: ScanRules {
                any_tf: 0.7,
                majority_tf: 0.8,
                mode: RiskMode::Conservative,
            },
        }
    }
}

/// Deep scans run every detector; quick scans are the cheap variant used by auto-refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    #[default]
    Deep,
    Quick,
}

/// Validated inputs of one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerRunConfig {
    symbols: Vec<Symbol>,
    timeframes: Vec<Timeframe>,
}

impl ScannerRunConfig {
    /// Deduplicates (first occurrence wins) and rejects empty sets.
    pub fn new(symbols: Vec<Symbol>, timeframes: Vec<Timeframe>) -> Result<Self, ValidationError> {
        let symbols = dedup(symbols);
        let timeframes = dedup(timeframes);
        if symbols.is_empty() {
            return Err(ValidationError::EmptySymbols);
        }
        if timeframes.is_empty() {
            return Err(ValidationError::EmptyTimeframes);
        }
        Ok(Self {
            symbols,
            timeframes,
        })
    }

    /// Parses raw user input.
    pub fn parse<S, T>(symbols: &[S], timeframes: &[T]) -> Result<Self, ValidationError>
    where
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let symbols = symbols
            .iter()
            .map(|raw| Symbol::parse(raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let timeframes = timeframes
            .iter()
            .map(|raw| Timeframe::parse(raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(symbols, timeframes)
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn timeframes(&self) -> &[Timeframe] {
        &self.timeframes
    }
}

pub(crate) fn dedup<T: Clone + Eq + std::hash::Hash>(values: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(values.len());
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

/// Backend rules block of the wire request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RequestRules {
    pub min_score: f64,
    pub min_confidence: f64,
    pub max_risk_level: RiskLevel,
    pub quick_scan: bool,
}

/// Body of `POST /api/scanner/run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub symbols: Vec<Symbol>,
    pub timeframes: Vec<Timeframe>,
    pub weights: DetectorWeights,
    pub rules: RequestRules,
}

impl ScanRequest {
    pub fn build(config: &ScannerRunConfig, profile: &ScanProfile, mode: ScanMode) -> Self {
        let max_risk_level = match profile.rules.mode {
            RiskMode::Aggressive => RiskLevel::High,
            RiskMode::Conservative => RiskLevel::Medium,
        };
        Self {
            symbols: config.symbols.clone(),
            timeframes: config.timeframes.clone(),
            weights: profile.weights,
            rules: RequestRules {
                min_score: profile.rules.any_tf,
                min_confidence: profile.rules.majority_tf,
                max_risk_level,
                quick_scan: mode == ScanMode::Quick,
            },
        }
    }

    pub fn is_quick(&self) -> bool {
        self.rules.quick_scan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_config_deduplicates_and_keeps_order() {
        let config = ScannerRunConfig::parse(&["ethusdt", "BTCUSDT", "ETHUSDT"], &["4h", "1h", "4H"])
            .expect("valid config");
        let symbols: Vec<&str> = config.symbols().iter().map(Symbol::as_str).collect();
        let timeframes: Vec<&str> = config.timeframes().iter().map(Timeframe::as_str).collect();
        assert_eq!(symbols, vec!["ETHUSDT", "BTCUSDT"]);
        assert_eq!(timeframes, vec!["4h", "1h"]);
    }

    #[test]
    fn run_config_accepts_digit_leading_pairs() {
        let config = ScannerRunConfig::parse(&["1inchusdt", "1000PEPEUSDT"], &["1h"])
            .expect("valid config");
        let symbols: Vec<&str> = config.symbols().iter().map(Symbol::as_str).collect();
        assert_eq!(symbols, vec!["1INCHUSDT", "1000PEPEUSDT"]);
    }

    #[test]
    fn run_config_rejects_empty_sets() {
        let no_timeframes: [&str; 0] = [];
        assert_eq!(
            ScannerRunConfig::parse::<&str, &str>(&[], &["1h"]),
            Err(ValidationError::EmptySymbols)
        );
        assert_eq!(
            ScannerRunConfig::parse(&["BTCUSDT"], &no_timeframes),
            Err(ValidationError::EmptyTimeframes)
        );
    }

    #[test]
    fn request_matches_wire_shape() {
        let config = ScannerRunConfig::parse(&["BTCUSDT"], &["1h"]).expect("valid");
        let request = ScanRequest::build(&config, &ScanProfile::aggressive(), ScanMode::Quick);
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["symbols"][0], "BTCUSDT");
        assert_eq!(json["timeframes"][0], "1h");
        assert_eq!(json["rules"]["max_risk_level"], "HIGH");
        assert_eq!(json["rules"]["quick_scan"], true);
        assert_eq!(json["rules"]["min_score"], 0.5);
        assert_eq!(json["weights"]["smc"], 0.25);

        let deep = ScanRequest::build(&config, &ScanProfile::default(), ScanMode::Deep);
        assert_eq!(deep.rules.max_risk_level, RiskLevel::Medium);
        assert!(!deep.is_quick());
    }

    #[test]
    fn weights_are_rescaled_only_outside_tolerance() {
        let near = DetectorWeights {
            whales: 0.055,
            ..DetectorWeights::default()
        };
        assert_eq!(near.normalized().expect("valid"), near);

        let doubled = DetectorWeights {
            harmonic: 0.30,
            elliott: 0.30,
            smc: 0.40,
            fibonacci: 0.20,
            price_action: 0.30,
            sar: 0.20,
            sentiment: 0.20,
            news: 0.10,
            whales: 0.10,
        };
        let normalized = doubled.normalized().expect("valid");
        assert!((normalized.sum() - 1.0).abs() < 1e-9);
        assert!((normalized.smc - 0.20).abs() < 1e-9);
    }

    #[test]
    fn presets_sum_to_one() {
        for profile in [ScanProfile::default(), ScanProfile::aggressive(), ScanProfile::conservative()] {
            assert!((profile.weights.sum() - 1.0).abs() < 1e-9);
        }
    }
}
