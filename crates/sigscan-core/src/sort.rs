use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ScanResult, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Score,
    Symbol,
    Change,
    Volume,
}

impl SortKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Score => "score",
            Self::Symbol => "symbol",
            Self::Change => "change",
            Self::Volume => "volume",
        }
    }
}

impl Display for SortKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "score" => Ok(Self::Score),
            "symbol" => Ok(Self::Symbol),
            "change" => Ok(Self::Change),
            "volume" => Ok(Self::Volume),
            other => Err(ValidationError::InvalidConfig {
                reason: format!("unknown sort key '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Active sort key and order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

impl SortSpec {
    pub const fn new(key: SortKey, order: SortOrder) -> Self {
        Self { key, order }
    }

    /// Selecting the active key flips the order; selecting another key
    /// switches to it in descending order.
    pub fn toggle(self, key: SortKey) -> Self {
        if self.key == key {
            Self::new(key, self.order.flipped())
        } else {
            Self::new(key, SortOrder::Desc)
        }
    }

    pub fn compare(&self, a: &ScanResult, b: &ScanResult) -> Ordering {
        let ordering = match self.key {
            SortKey::Score => a.score.total_cmp(&b.score),
            SortKey::Symbol => compare_text(a.symbol.as_str(), b.symbol.as_str()),
            SortKey::Change => numeric_key(a.change_24h).total_cmp(&numeric_key(b.change_24h)),
            SortKey::Volume => numeric_key(a.volume).total_cmp(&numeric_key(b.volume)),
        };
        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Missing market fields sort as `0`, so ties fall back to input order.
fn numeric_key(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0)
}

/// Case-folded comparison with an ordinal tie-break.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Stable in-place sort; equal keys keep their relative order in either direction.
pub fn sort_results(results: &mut [&ScanResult], spec: SortSpec) {
    results.sort_by(|a, b| spec.compare(a, b));
}

/// Returns a sorted copy of the references.
pub fn sorted<'a>(results: &[&'a ScanResult], spec: SortSpec) -> Vec<&'a ScanResult> {
    let mut ordered = results.to_vec();
    sort_results(&mut ordered, spec);
    ordered
}
