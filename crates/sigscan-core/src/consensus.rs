//! Weighted multi-timeframe consensus.
//!
//! Higher timeframes carry more persistent trend information, so each
//! timeframe contributes with a fixed weight that grows with its duration:
//!
//! | Timeframe | 1m | 5m | 15m | 30m | 1h | 4h | 1d | 1w | other |
//! |-----------|----|----|-----|-----|----|----|----|----|-------|
//! | Weight | 0.05 | 0.10 | 0.15 | 0.20 | 0.25 | 0.35 | 0.45 | 0.50 | 0.25 |
//!
//! The reduction is a commutative sum, so input order never changes the
//! outcome.

use serde::{Deserialize, Serialize};

use crate::{Direction, ScanResult, Timeframe};

pub const DEFAULT_TIMEFRAME_WEIGHT: f64 = 0.25;

/// Weight of a timeframe in the consensus. Total: unknown keys get
/// [`DEFAULT_TIMEFRAME_WEIGHT`].
pub fn timeframe_weight(timeframe: &Timeframe) -> f64 {
    match timeframe.as_str() {
        "1m" => 0.05,
        "5m" => 0.10,
        "15m" => 0.15,
        "30m" => 0.20,
        "1h" => 0.25,
        "4h" => 0.35,
        "1d" => 0.45,
        "1w" => 0.50,
        _ => DEFAULT_TIMEFRAME_WEIGHT,
    }
}

/// One timeframe's weighted contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeScore {
    pub timeframe: Timeframe,
    pub score: f64,
    pub direction: Direction,
    pub weight: f64,
}

impl TimeframeScore {
    pub fn new(timeframe: Timeframe, score: f64, direction: Direction) -> Self {
        let weight = timeframe_weight(&timeframe);
        Self {
            timeframe,
            score,
            direction,
            weight,
        }
    }
}

/// Cross-timeframe summary for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Consensus {
    pub score: f64,
    pub direction: Direction,
    pub total_weight: f64,
    pub bullish_weight: f64,
    pub bearish_weight: f64,
    pub neutral_weight: f64,
}

/// Share of the total weight mass per direction, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightDistribution {
    pub bullish_pct: f64,
    pub bearish_pct: f64,
    pub neutral_pct: f64,
}

impl Consensus {
    pub const EMPTY: Self = Self {
        score: 0.0,
        direction: Direction::Neutral,
        total_weight: 0.0,
        bullish_weight: 0.0,
        bearish_weight: 0.0,
        neutral_weight: 0.0,
    };

    pub fn distribution(&self) -> WeightDistribution {
        if self.total_weight <= 0.0 {
            return WeightDistribution {
                bullish_pct: 0.0,
                bearish_pct: 0.0,
                neutral_pct: 0.0,
            };
        }
        WeightDistribution {
            bullish_pct: self.bullish_weight / self.total_weight * 100.0,
            bearish_pct: self.bearish_weight / self.total_weight * 100.0,
            neutral_pct: self.neutral_weight / self.total_weight * 100.0,
        }
    }

    pub fn band(&self) -> StrengthBand {
        strength_band(self.score)
    }
}

/// Reduces per-timeframe scores into one weighted score and direction.
///
/// Direction is `BULLISH` iff bullish weight strictly exceeds bearish
/// weight, `BEARISH` for the reverse, otherwise `NEUTRAL`. Neutral mass is
/// reported but never decides the direction. Empty input yields
/// [`Consensus::EMPTY`].
pub fn aggregate(scores: &[TimeframeScore]) -> Consensus {
    let mut total_weight = 0.0;
    let mut weighted_sum = 0.0;
    let mut bullish_weight = 0.0;
    let mut bearish_weight = 0.0;

    for entry in scores {
        total_weight += entry.weight;
        weighted_sum += entry.score * entry.weight;
        match entry.direction {
            Direction::Bullish => bullish_weight += entry.weight,
            Direction::Bearish => bearish_weight += entry.weight,
            Direction::Neutral => {}
        }
    }

    if total_weight <= 0.0 {
        return Consensus::EMPTY;
    }

    let direction = if bullish_weight > bearish_weight {
        Direction::Bullish
    } else if bearish_weight > bullish_weight {
        Direction::Bearish
    } else {
        Direction::Neutral
    };

    Consensus {
        score: weighted_sum / total_weight,
        direction,
        total_weight,
        bullish_weight,
        bearish_weight,
        neutral_weight: (total_weight - bullish_weight - bearish_weight).max(0.0),
    }
}

/// Derives the per-timeframe view of a result.
///
/// Uses the explicit breakdown when the backend sent one; otherwise the
/// result's own score and direction are duplicated across its reported
/// timeframes. Nothing is persisted.
pub fn breakdown(result: &ScanResult) -> Vec<TimeframeScore> {
    if !result.timeframe_breakdown.is_empty() {
        return result
            .timeframe_breakdown
            .iter()
            .map(|signal| {
                TimeframeScore::new(signal.timeframe.clone(), signal.score, signal.direction)
            })
            .collect();
    }

    result
        .timeframes
        .iter()
        .map(|timeframe| TimeframeScore::new(timeframe.clone(), result.score, result.direction))
        .collect()
}

/// Breakdown and consensus in one call.
pub fn consensus_for(result: &ScanResult) -> Consensus {
    aggregate(&breakdown(result))
}

/// Presentation band of a 0..1 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthBand {
    Strong,
    Moderate,
    Weak,
}

pub fn strength_band(score: f64) -> StrengthBand {
    if score >= 0.7 {
        StrengthBand::Strong
    } else if score >= 0.4 {
        StrengthBand::Moderate
    } else {
        StrengthBand::Weak
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Symbol, TimeframeSignal};

    fn tf(key: &str) -> Timeframe {
        Timeframe::parse(key).expect("valid timeframe")
    }

    fn entry(key: &str, score: f64, direction: Direction) -> TimeframeScore {
        TimeframeScore::new(tf(key), score, direction)
    }

    #[test]
    fn weight_table_is_ascending_and_total() {
        let weights: Vec<f64> = Timeframe::KNOWN
            .iter()
            .map(|key| timeframe_weight(&tf(key)))
            .collect();
        assert!(weights.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(timeframe_weight(&tf("2h")), DEFAULT_TIMEFRAME_WEIGHT);
    }

    #[test]
    fn weighted_score_and_majority_direction() {
        let consensus = aggregate(&[
            entry("1h", 0.6, Direction::Bullish),
            entry("4h", 0.8, Direction::Bullish),
            entry("1d", 0.3, Direction::Bearish),
        ]);
        let expected = (0.6 * 0.25 + 0.8 * 0.35 + 0.3 * 0.45) / 1.05;
        assert!((consensus.score - expected).abs() < 1e-12);
        assert!((consensus.score - 0.5381).abs() < 1e-3);
        assert!((consensus.bullish_weight - 0.60).abs() < 1e-12);
        assert!((consensus.bearish_weight - 0.45).abs() < 1e-12);
        assert_eq!(consensus.direction, Direction::Bullish);
    }

    #[test]
    fn empty_input_is_zero_and_neutral() {
        assert_eq!(aggregate(&[]), Consensus::EMPTY);
        assert_eq!(Consensus::EMPTY.distribution().bullish_pct, 0.0);
    }

    #[test]
    fn equal_directional_mass_is_neutral() {
        let consensus = aggregate(&[
            entry("1h", 0.9, Direction::Bullish),
            entry("1h", 0.1, Direction::Bearish),
            entry("1d", 0.5, Direction::Neutral),
        ]);
        assert_eq!(consensus.direction, Direction::Neutral);
        assert!((consensus.neutral_weight - 0.45).abs() < 1e-12);
    }

    #[test]
    fn permutation_does_not_change_the_outcome() {
        let mut entries = vec![
            entry("5m", 0.2, Direction::Bearish),
            entry("1w", 0.9, Direction::Bullish),
            entry("30m", 0.4, Direction::Neutral),
            entry("4h", 0.7, Direction::Bearish),
        ];
        let forward = aggregate(&entries);
        entries.reverse();
        let backward = aggregate(&entries);
        entries.rotate_left(1);
        let rotated = aggregate(&entries);

        for other in [backward, rotated] {
            assert!((forward.score - other.score).abs() < 1e-12);
            assert_eq!(forward.direction, other.direction);
        }
    }

    #[test]
    fn unit_scores_stay_in_unit_range() {
        let grid = [0.0, 0.13, 0.5, 0.87, 1.0];
        for a in grid {
            for b in grid {
                let consensus = aggregate(&[
                    entry("15m", a, Direction::Bullish),
                    entry("1d", b, Direction::Bearish),
                    entry("weird", a * b, Direction::Neutral),
                ]);
                assert!((0.0..=1.0).contains(&consensus.score));
            }
        }
    }

    #[test]
    fn distribution_sums_to_one_hundred() {
        let consensus = aggregate(&[
            entry("1h", 0.6, Direction::Bullish),
            entry("4h", 0.8, Direction::Bearish),
            entry("1d", 0.3, Direction::Neutral),
        ]);
        let distribution = consensus.distribution();
        let total = distribution.bullish_pct + distribution.bearish_pct + distribution.neutral_pct;
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn breakdown_prefers_explicit_entries_over_degraded_duplication() {
        let symbol = Symbol::parse("BTCUSDT").expect("valid");
        let degraded = ScanResult::new(symbol.clone(), 0.7, Direction::Bearish)
            .with_timeframes(vec![tf("1h"), tf("4h")]);
        let scores = breakdown(&degraded);
        assert_eq!(scores.len(), 2);
        assert!(scores.iter().all(|s| s.score == 0.7 && s.direction == Direction::Bearish));
        assert_eq!(consensus_for(&degraded).direction, Direction::Bearish);

        let explicit = degraded.with_breakdown(vec![TimeframeSignal {
            timeframe: tf("1d"),
            score: 0.2,
            direction: Direction::Bullish,
        }]);
        let scores = breakdown(&explicit);
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].weight, 0.45);
    }

    #[test]
    fn strength_bands() {
        assert_eq!(strength_band(0.7), StrengthBand::Strong);
        assert_eq!(strength_band(0.4), StrengthBand::Moderate);
        assert_eq!(strength_band(0.39), StrengthBand::Weak);
    }
}
