//! Aggregation of independent sub-fetches that may fail one by one.
//!
//! A set of sub-results only fails as a whole when every member failed;
//! otherwise the failures become warnings next to the values that arrived.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::service::BackendEndpoint;
use crate::{ScanError, Symbol};

pub type PartialResult<T> = Result<T, ScanError>;

/// Successful sub-results plus one warning per failed sub-fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialSet<T> {
    pub values: Vec<(&'static str, T)>,
    pub warnings: Vec<String>,
}

impl<T> PartialSet<T> {
    pub fn get(&self, name: &str) -> Option<&T> {
        self.values
            .iter()
            .find(|(label, _)| *label == name)
            .map(|(_, value)| value)
    }

    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Merges labelled sub-results. Fails only when all of them failed, or when
/// there was nothing to merge.
pub fn merge_partials<T>(
    parts: Vec<(&'static str, PartialResult<T>)>,
) -> Result<PartialSet<T>, ScanError> {
    let attempted = parts.len();
    let mut values = Vec::with_capacity(attempted);
    let mut warnings = Vec::new();

    for (label, part) in parts {
        match part {
            Ok(value) => values.push((label, value)),
            Err(error) => {
                warn!(fetch = label, code = error.code(), error = %error, "sub-fetch failed");
                warnings.push(format!("{label}: {error}"));
            }
        }
    }

    if values.is_empty() {
        return Err(ScanError::AllSubFetchesFailed {
            attempted,
            failures: warnings,
        });
    }

    Ok(PartialSet { values, warnings })
}

pub const PREDICTIONS: &str = "predictions";
pub const CORRELATIONS: &str = "correlations";
pub const MARKET_DEPTH: &str = "market_depth";

/// Loads the auxiliary analytics shown next to one signal.
#[derive(Debug, Clone)]
pub struct SignalDetailsLoader {
    endpoint: BackendEndpoint,
}

impl SignalDetailsLoader {
    pub fn new(endpoint: BackendEndpoint) -> Self {
        Self { endpoint }
    }

    /// Fetches predictions, correlations and market depth concurrently.
    pub async fn load(&self, symbol: &Symbol) -> Result<PartialSet<Value>, ScanError> {
        let encoded = urlencoding::encode(symbol.as_str());
        let predictions_path = format!("/api/analytics/predictions/{encoded}");
        let depth_path = format!("/api/analytics/market-depth/{encoded}");

        let (predictions, correlations, depth) = tokio::join!(
            self.endpoint.get_json(&predictions_path),
            self.endpoint.get_json("/api/analytics/correlations"),
            self.endpoint.get_json(&depth_path),
        );

        merge_partials(vec![
            (PREDICTIONS, predictions),
            (CORRELATIONS, correlations),
            (MARKET_DEPTH, depth),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_keeps_successes_and_warns() {
        let merged = merge_partials(vec![
            ("a", Ok(1)),
            ("b", Err(ScanError::transport("timeout"))),
            ("c", Ok(3)),
        ])
        .expect("two succeeded");

        assert_eq!(merged.get("a"), Some(&1));
        assert_eq!(merged.get("b"), None);
        assert_eq!(merged.warnings, vec![String::from("b: timeout")]);
        assert!(!merged.is_complete());
    }

    #[test]
    fn total_failure_is_an_error() {
        let error = merge_partials::<u8>(vec![
            ("a", Err(ScanError::transport("x"))),
            ("b", Err(ScanError::http_status(404, "missing"))),
        ])
        .expect_err("all failed");

        assert_eq!(
            error,
            ScanError::AllSubFetchesFailed {
                attempted: 2,
                failures: vec![String::from("a: x"), String::from("b: HTTP 404 - missing")],
            }
        );
    }

    #[test]
    fn nothing_to_merge_is_an_error() {
        assert!(merge_partials::<u8>(Vec::new()).is_err());
    }
}
