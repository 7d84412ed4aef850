//! Tolerant normalization of backend scan payloads.
//!
//! Backend versions disagree on field names (`overall_score` vs
//! `final_score` vs `score`, `results` vs `result`, ...). Everything here
//! works on [`serde_json::Value`] so a single malformed field can only ever
//! degrade that field to its default; it never aborts the batch.
//!
//! # Precedence
//!
//! | Output | Chain | Default |
//! |--------|-------|---------|
//! | score | `overall_score` → `final_score` → `score` | `0` |
//! | direction | `overall_direction` → `direction` | `NEUTRAL` |
//! | timeframe count | `tf_count` → `timeframe_count` | absent |
//! | components | `sample_components` → `components` | empty |
//! | 24h change | `change_24h` → `change` | absent |
//! | volume | `volume` → `volume_24h` | absent |
//!
//! The first *defined* value wins: an explicit `0` is a value, `null`, NaN
//! and non-numeric strings are not.

use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{Direction, RiskLevel, ScanResult, Symbol, Timeframe, TimeframeSignal, UtcDateTime};

pub const SCORE_FIELDS: [&str; 3] = ["overall_score", "final_score", "score"];
pub const DIRECTION_FIELDS: [&str; 2] = ["overall_direction", "direction"];
const TIMEFRAME_COUNT_FIELDS: [&str; 2] = ["tf_count", "timeframe_count"];
const COMPONENT_FIELDS: [&str; 2] = ["sample_components", "components"];
const CHANGE_FIELDS: [&str; 2] = ["change_24h", "change"];
const VOLUME_FIELDS: [&str; 2] = ["volume", "volume_24h"];

/// A value picked from a precedence chain, with the field that supplied it.
///
/// `source == None` means every field was absent and the default was used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: Option<&'static str>,
}

impl<T> Resolved<T> {
    pub fn is_default(&self) -> bool {
        self.source.is_none()
    }
}

/// Output of normalizing one backend response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub results: Vec<ScanResult>,
    pub warnings: Vec<String>,
}

/// Returns the raw result records of a response: `results`, then `result`,
/// then a bare top-level array. Anything else is an empty set.
pub fn extract_records(response: &Value) -> &[Value] {
    if let Some(records) = response.as_array() {
        return records;
    }

    ["results", "result"]
        .iter()
        .find_map(|field| response.get(*field).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Normalizes a whole scan response.
pub fn normalize_response(response: &Value) -> NormalizedBatch {
    let records = extract_records(response);
    let mut batch = NormalizedBatch {
        results: Vec::with_capacity(records.len()),
        warnings: Vec::new(),
    };
    let mut seen = HashSet::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let Some(result) = normalize_record(record) else {
            batch
                .warnings
                .push(format!("record {index} has no usable symbol; skipped"));
            continue;
        };

        if !seen.insert(result.symbol.clone()) {
            batch.warnings.push(format!(
                "duplicate symbol '{}' at record {index}; keeping first occurrence",
                result.symbol
            ));
            continue;
        }

        batch.results.push(result);
    }

    if !batch.warnings.is_empty() {
        warn!(
            skipped = batch.warnings.len(),
            kept = batch.results.len(),
            "scan response contained unusable records"
        );
    }

    batch
}

/// Normalizes one record. Returns `None` only when the record has no usable
/// symbol; every other field degrades to its default.
pub fn normalize_record(record: &Value) -> Option<ScanResult> {
    let object = record.as_object()?;
    let symbol = object
        .get("symbol")
        .and_then(Value::as_str)
        .and_then(|raw| Symbol::parse(raw).ok())?;

    let score = resolve_score(record);
    let direction = resolve_direction(record);
    if score.is_default() {
        debug!(symbol = %symbol, "no score field present; defaulting to 0");
    }

    let (timeframes, mut breakdown) = read_timeframes(object, direction.value);
    if let Some(explicit) = object.get("timeframe_breakdown").and_then(Value::as_object) {
        breakdown = read_breakdown(explicit);
    }

    Some(ScanResult {
        symbol,
        score: score.value,
        direction: direction.value,
        confidence: object.get("confidence").and_then(as_number).map(to_unit_scale),
        timeframe_count: first_defined(object, &TIMEFRAME_COUNT_FIELDS, as_count)
            .map(|resolved| resolved.value),
        components: first_defined(object, &COMPONENT_FIELDS, |value| {
            value.as_object().map(read_components)
        })
        .map(|resolved| resolved.value)
        .unwrap_or_default(),
        timeframes,
        timeframe_breakdown: breakdown,
        risk_level: object.get("risk_level").and_then(as_risk_level),
        price: object.get("price").and_then(as_number),
        change_24h: first_defined(object, &CHANGE_FIELDS, as_number).map(|resolved| resolved.value),
        volume: first_defined(object, &VOLUME_FIELDS, as_number).map(|resolved| resolved.value),
        timestamp: object.get("timestamp").and_then(as_timestamp),
    })
}

/// Score precedence: `overall_score` → `final_score` → `score` → `0`.
pub fn resolve_score(record: &Value) -> Resolved<f64> {
    record
        .as_object()
        .and_then(|object| first_defined(object, &SCORE_FIELDS, as_number))
        .map(|resolved| Resolved {
            value: to_unit_scale(resolved.value),
            source: resolved.source,
        })
        .unwrap_or(Resolved {
            value: 0.0,
            source: None,
        })
}

/// Direction precedence: `overall_direction` → `direction` → `NEUTRAL`.
pub fn resolve_direction(record: &Value) -> Resolved<Direction> {
    record
        .as_object()
        .and_then(|object| first_defined(object, &DIRECTION_FIELDS, as_direction))
        .unwrap_or(Resolved {
            value: Direction::Neutral,
            source: None,
        })
}

/// Maps a score onto the canonical 0..1 scale. Values in `(1, 100]` are read
/// as percentages.
pub fn to_unit_scale(value: f64) -> f64 {
    let scaled = if value > 1.0 && value <= 100.0 {
        value / 100.0
    } else {
        value
    };
    scaled.clamp(0.0, 1.0)
}

fn first_defined<T>(
    object: &Map<String, Value>,
    fields: &[&'static str],
    parse: impl Fn(&Value) -> Option<T>,
) -> Option<Resolved<T>> {
    fields.iter().find_map(|field| {
        object.get(*field).and_then(&parse).map(|value| Resolved {
            value,
            source: Some(*field),
        })
    })
}

fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn as_count(value: &Value) -> Option<u32> {
    let number = as_number(value)?;
    if number < 0.0 || number.fract() != 0.0 || number > f64::from(u32::MAX) {
        return None;
    }
    Some(number as u32)
}

fn as_direction(value: &Value) -> Option<Direction> {
    value.as_str().and_then(|raw| Direction::from_str(raw).ok())
}

fn as_risk_level(value: &Value) -> Option<RiskLevel> {
    match value {
        Value::String(text) => RiskLevel::from_str(text)
            .ok()
            .or_else(|| as_number(value).map(RiskLevel::from_reading)),
        Value::Number(_) => as_number(value).map(RiskLevel::from_reading),
        _ => None,
    }
}

fn as_timestamp(value: &Value) -> Option<UtcDateTime> {
    match value {
        Value::String(text) => UtcDateTime::parse(text).ok(),
        Value::Number(number) => number.as_i64().and_then(UtcDateTime::from_unix),
        _ => None,
    }
}

fn read_components(object: &Map<String, Value>) -> BTreeMap<String, f64> {
    object
        .iter()
        .map(|(name, entry)| {
            let score = match entry {
                Value::Object(inner) => inner.get("score").and_then(as_number),
                other => as_number(other),
            }
            .map(to_unit_scale)
            .unwrap_or(0.0);
            (name.clone(), score)
        })
        .collect()
}

/// `timeframes` arrives either as a list of keys or as a `{key: score}` map.
/// Map entries carry no direction of their own and inherit the record's.
fn read_timeframes(
    object: &Map<String, Value>,
    record_direction: Direction,
) -> (Vec<Timeframe>, Vec<TimeframeSignal>) {
    match object.get("timeframes") {
        Some(Value::Array(keys)) => {
            let timeframes = keys
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|key| Timeframe::parse(key).ok())
                .collect();
            (timeframes, Vec::new())
        }
        Some(Value::Object(scores)) => {
            let mut timeframes = Vec::with_capacity(scores.len());
            let mut signals = Vec::with_capacity(scores.len());
            for (key, score) in scores {
                let Ok(timeframe) = Timeframe::parse(key) else {
                    continue;
                };
                timeframes.push(timeframe.clone());
                if let Some(score) = as_number(score) {
                    signals.push(TimeframeSignal {
                        timeframe,
                        score: to_unit_scale(score),
                        direction: record_direction,
                    });
                }
            }
            (timeframes, signals)
        }
        _ => (Vec::new(), Vec::new()),
    }
}

fn read_breakdown(object: &Map<String, Value>) -> Vec<TimeframeSignal> {
    object
        .iter()
        .filter_map(|(key, entry)| {
            let timeframe = Timeframe::parse(key).ok()?;
            let (score, direction) = match entry {
                Value::Object(inner) => (
                    inner.get("score").and_then(as_number),
                    inner.get("direction").and_then(as_direction),
                ),
                other => (as_number(other), None),
            };
            Some(TimeframeSignal {
                timeframe,
                score: score.map(to_unit_scale).unwrap_or(0.0),
                direction: direction.unwrap_or_default(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn explicit_zero_beats_fallback_fields() {
        let record = json!({"symbol": "BTCUSDT", "overall_score": 0, "final_score": 0.7});
        let resolved = resolve_score(&record);
        assert_eq!(resolved.value, 0.0);
        assert_eq!(resolved.source, Some("overall_score"));
    }

    #[test]
    fn null_and_garbage_fall_through_the_chain() {
        let record = json!({"symbol": "BTCUSDT", "overall_score": null, "final_score": "n/a", "score": 0.42});
        let resolved = resolve_score(&record);
        assert_eq!(resolved.value, 0.42);
        assert_eq!(resolved.source, Some("score"));
    }

    #[test]
    fn absent_score_defaults_to_zero() {
        let resolved = resolve_score(&json!({"symbol": "BTCUSDT"}));
        assert_eq!(resolved.value, 0.0);
        assert!(resolved.is_default());
    }

    #[test]
    fn percentage_scores_are_rescaled() {
        let resolved = resolve_score(&json!({"final_score": 72.5}));
        assert!((resolved.value - 0.725).abs() < 1e-12);
        assert_eq!(resolve_score(&json!({"score": 250})).value, 1.0);
        assert_eq!(resolve_score(&json!({"score": -3})).value, 0.0);
    }

    #[test]
    fn direction_aliases_and_precedence() {
        let record = json!({"overall_direction": "SELL", "direction": "BULLISH"});
        assert_eq!(resolve_direction(&record).value, Direction::Bearish);

        let unknown_first = json!({"overall_direction": "SIDEWAYS", "direction": "buy"});
        let resolved = resolve_direction(&unknown_first);
        assert_eq!(resolved.value, Direction::Bullish);
        assert_eq!(resolved.source, Some("direction"));

        assert_eq!(resolve_direction(&json!({})).value, Direction::Neutral);
    }

    #[test]
    fn accepts_either_result_field_name() {
        let modern = json!({"results": [{"symbol": "BTCUSDT"}]});
        let legacy = json!({"result": [{"symbol": "ETHUSDT"}]});
        let neither = json!({"status": "ok"});
        assert_eq!(extract_records(&modern).len(), 1);
        assert_eq!(extract_records(&legacy).len(), 1);
        assert!(extract_records(&neither).is_empty());
    }

    #[test]
    fn digit_leading_pairs_are_kept() {
        let payload = json!({"results": [
            {"symbol": "1INCHUSDT", "overall_score": 0.8},
            {"symbol": "BTCUSDT", "overall_score": 0.6},
        ]});
        let batch = normalize_response(&payload);
        let kept: Vec<&str> = batch.results.iter().map(|result| result.symbol.as_str()).collect();
        assert_eq!(kept, vec!["1INCHUSDT", "BTCUSDT"]);
        assert!(batch.warnings.is_empty());
    }

    #[test]
    fn reads_components_and_timeframe_count() {
        let record = json!({
            "symbol": "solusdt",
            "final_score": 0.66,
            "tf_count": 2,
            "sample_components": {"smc": {"score": 0.8}, "elliott": {"score": null}, "harmonic": 0.3},
            "change_24h": "-4.2",
        });
        let result = normalize_record(&record).expect("record has a symbol");
        assert_eq!(result.symbol.as_str(), "SOLUSDT");
        assert_eq!(result.timeframe_count, Some(2));
        assert_eq!(result.component_count(), 3);
        assert_eq!(result.component_score("elliott"), 0.0);
        assert_eq!(result.change_24h, Some(-4.2));
    }

    #[test]
    fn malformed_optional_fields_degrade_without_dropping_the_record() {
        let record = json!({
            "symbol": "ADAUSDT",
            "tf_count": "three",
            "sample_components": [1, 2],
            "timestamp": "yesterday",
            "price": {"usd": 1},
        });
        let result = normalize_record(&record).expect("record survives");
        assert_eq!(result.timeframe_count, None);
        assert_eq!(result.component_count(), 0);
        assert_eq!(result.timestamp, None);
        assert_eq!(result.price, None);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn timeframe_score_map_inherits_record_direction() {
        let record = json!({
            "symbol": "BTCUSDT",
            "direction": "BULLISH",
            "timeframes": {"1h": 0.6, "4h": 80},
        });
        let result = normalize_record(&record).expect("valid");
        assert_eq!(result.timeframes.len(), 2);
        assert_eq!(result.timeframe_breakdown.len(), 2);
        assert!(result
            .timeframe_breakdown
            .iter()
            .all(|signal| signal.direction == Direction::Bullish));
    }

    #[test]
    fn batch_skips_symbolless_and_duplicate_records() {
        let response = json!({"results": [
            {"symbol": "BTCUSDT", "score": 0.9},
            {"score": 0.5},
            {"symbol": "btcusdt", "score": 0.1},
            "not an object",
            {"symbol": "ETHUSDT", "score": 0.4},
        ]});
        let batch = normalize_response(&response);
        let symbols: Vec<&str> = batch.results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(batch.results[0].score, 0.9);
        assert_eq!(batch.warnings.len(), 3);
    }
}
