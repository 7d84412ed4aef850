//! Filter pipeline over a scan result set.
//!
//! Stages run in a fixed order and each one only narrows the set:
//!
//! 1. text search on the symbol
//! 2. direction
//! 3. score range (inclusive)
//! 4. minimum component count
//! 5. timeframe agreement
//! 6. 24h price change
//!
//! Every stage is a plain predicate so it can be exercised on its own. The
//! pipeline borrows from the input and keeps its order; re-running it on
//! each keystroke is cheap and always yields the same subset for the same
//! `(results, criteria)` pair.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Direction, ScanResult, ValidationError};

/// Absolute 24h change, in percent, from which a result counts as a big mover.
pub const BIG_MOVE_PCT: f64 = 5.0;

/// Direction selector; `All` is the pass-through sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionFilter {
    #[default]
    All,
    Only(Direction),
}

impl FromStr for DirectionFilter {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        Direction::from_str(value).map(Self::Only)
    }
}

impl Display for DirectionFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(direction) => Display::fmt(direction, f),
        }
    }
}

/// How many of the requested timeframes a result must cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TfAgreement {
    #[default]
    Any,
    Majority,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceChangeFilter {
    #[default]
    Any,
    Gainers,
    Losers,
    #[serde(rename = "bigmovers")]
    BigMovers,
}

/// Immutable snapshot of the numeric and range predicates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdvancedFilterConfig {
    score_min: f64,
    score_max: f64,
    signal_count_min: usize,
    tf_agreement: TfAgreement,
    price_change: PriceChangeFilter,
}

impl Default for AdvancedFilterConfig {
    fn default() -> Self {
        Self {
            score_min: 0.0,
            score_max: 1.0,
            signal_count_min: 0,
            tf_agreement: TfAgreement::Any,
            price_change: PriceChangeFilter::Any,
        }
    }
}

impl AdvancedFilterConfig {
    /// Returns a copy with a new inclusive score range.
    pub fn with_score_range(self, min: f64, max: f64) -> Result<Self, ValidationError> {
        validate_unit("score_min", min)?;
        validate_unit("score_max", max)?;
        if min > max {
            return Err(ValidationError::InvertedScoreRange {
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(Self {
            score_min: min,
            score_max: max,
            ..self
        })
    }

    pub fn with_signal_count_min(self, signal_count_min: usize) -> Self {
        Self {
            signal_count_min,
            ..self
        }
    }

    pub fn with_tf_agreement(self, tf_agreement: TfAgreement) -> Self {
        Self {
            tf_agreement,
            ..self
        }
    }

    pub fn with_price_change(self, price_change: PriceChangeFilter) -> Self {
        Self {
            price_change,
            ..self
        }
    }

    pub const fn score_min(&self) -> f64 {
        self.score_min
    }

    pub const fn score_max(&self) -> f64 {
        self.score_max
    }

    pub const fn signal_count_min(&self) -> usize {
        self.signal_count_min
    }

    pub const fn tf_agreement(&self) -> TfAgreement {
        self.tf_agreement
    }

    pub const fn price_change(&self) -> PriceChangeFilter {
        self.price_change
    }
}

fn validate_unit(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::ScoreOutOfBounds {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Full predicate set for one pipeline run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FilterCriteria {
    pub search: String,
    pub direction: DirectionFilter,
    pub advanced: AdvancedFilterConfig,
    /// Number of timeframes the scan asked for; the agreement stage compares against it.
    pub requested_timeframes: usize,
}

/// Runs every stage in order.
pub fn apply<'a>(results: &'a [ScanResult], criteria: &FilterCriteria) -> Vec<&'a ScanResult> {
    let advanced = &criteria.advanced;
    results
        .iter()
        .filter(|result| matches_search(result, &criteria.search))
        .filter(|result| matches_direction(result, criteria.direction))
        .filter(|result| within_score_range(result, advanced.score_min, advanced.score_max))
        .filter(|result| meets_signal_count(result, advanced.signal_count_min))
        .filter(|result| {
            meets_tf_agreement(result, advanced.tf_agreement, criteria.requested_timeframes)
        })
        .filter(|result| matches_price_change(result, advanced.price_change))
        .collect()
}

/// Case-insensitive substring match on the symbol; a blank query passes everything.
pub fn matches_search(result: &ScanResult, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    result
        .symbol
        .as_str()
        .to_lowercase()
        .contains(&query.to_lowercase())
}

pub fn matches_direction(result: &ScanResult, filter: DirectionFilter) -> bool {
    match filter {
        DirectionFilter::All => true,
        DirectionFilter::Only(direction) => result.direction == direction,
    }
}

/// Inclusive on both ends.
pub fn within_score_range(result: &ScanResult, min: f64, max: f64) -> bool {
    result.score >= min && result.score <= max
}

pub fn meets_signal_count(result: &ScanResult, min: usize) -> bool {
    result.component_count() >= min
}

/// `Full` needs an exact count match, so a result without a count fails it.
/// `Majority` is only enforced when the backend reported a count.
pub fn meets_tf_agreement(result: &ScanResult, agreement: TfAgreement, requested: usize) -> bool {
    match agreement {
        TfAgreement::Any => true,
        TfAgreement::Full => result
            .timeframe_count
            .is_some_and(|count| count as usize == requested),
        TfAgreement::Majority => result
            .timeframe_count
            .map_or(true, |count| count as usize >= requested.div_ceil(2)),
    }
}

/// Results without a 24h change only pass `Any`.
pub fn matches_price_change(result: &ScanResult, filter: PriceChangeFilter) -> bool {
    match (filter, result.change_24h) {
        (PriceChangeFilter::Any, _) => true,
        (_, None) => false,
        (PriceChangeFilter::Gainers, Some(change)) => change > 0.0,
        (PriceChangeFilter::Losers, Some(change)) => change < 0.0,
        (PriceChangeFilter::BigMovers, Some(change)) => change.abs() >= BIG_MOVE_PCT,
    }
}
