//! Runtime settings and the portable scan configuration file.
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `SIGSCAN_API_URL` | Backend base URL (trailing `/` stripped) |
//! | `SIGSCAN_TIMEOUT_MS` | Per-request timeout |
//! | `SIGSCAN_API_TOKEN` | Bearer token sent with every request |
//! | `SIGSCAN_REFRESH_SECS` | Default auto-refresh interval |

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::http_client::DEFAULT_TIMEOUT_MS;
use crate::request::{DetectorWeights, ScanProfile, ScanRules, ScannerRunConfig};
use crate::service::normalize_base_url;
use crate::state::DEFAULT_REFRESH_INTERVAL;
use crate::{CoreError, Symbol, Timeframe, ValidationError};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_SYMBOLS: [&str; 4] = ["BTCUSDT", "ETHUSDT", "SOLUSDT", "ADAUSDT"];
pub const DEFAULT_TIMEFRAMES: [&str; 3] = ["15m", "1h", "4h"];

pub const ENV_API_URL: &str = "SIGSCAN_API_URL";
pub const ENV_TIMEOUT_MS: &str = "SIGSCAN_TIMEOUT_MS";
pub const ENV_API_TOKEN: &str = "SIGSCAN_API_TOKEN";
pub const ENV_REFRESH_SECS: &str = "SIGSCAN_REFRESH_SECS";

#[derive(Debug, Clone, PartialEq)]
pub struct ScannerSettings {
    pub api_url: String,
    pub timeout_ms: u64,
    pub api_token: Option<String>,
    pub history_capacity: usize,
    pub refresh_interval: Duration,
    pub symbols: Vec<Symbol>,
    pub timeframes: Vec<Timeframe>,
    pub profile: ScanProfile,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            api_url: String::from(DEFAULT_API_URL),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            api_token: None,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            symbols: DEFAULT_SYMBOLS
                .iter()
                .filter_map(|raw| Symbol::parse(raw).ok())
                .collect(),
            timeframes: DEFAULT_TIMEFRAMES
                .iter()
                .filter_map(|raw| Timeframe::parse(raw).ok())
                .collect(),
            profile: ScanProfile::default(),
        }
    }
}

impl ScannerSettings {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`; blank values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value_of = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = value_of(ENV_API_URL) {
            self.api_url = normalize_base_url(&url);
        }
        if let Some(raw) = value_of(ENV_TIMEOUT_MS) {
            self.timeout_ms = raw.trim().parse().map_err(|_| ValidationError::InvalidConfig {
                reason: format!("{ENV_TIMEOUT_MS} must be a whole number of milliseconds, got '{raw}'"),
            })?;
        }
        if let Some(token) = value_of(ENV_API_TOKEN) {
            self.api_token = Some(token.trim().to_owned());
        }
        if let Some(raw) = value_of(ENV_REFRESH_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| ValidationError::InvalidConfig {
                reason: format!("{ENV_REFRESH_SECS} must be a whole number of seconds, got '{raw}'"),
            })?;
            self.refresh_interval = Duration::from_secs(secs);
        }
        Ok(self)
    }

    /// Replaces inputs and profile with those of an imported file.
    pub fn apply_file(mut self, file: &ScanConfigFile) -> Result<Self, ValidationError> {
        let run = file.run_config()?;
        self.symbols = run.symbols().to_vec();
        self.timeframes = run.timeframes().to_vec();
        self.profile = file.profile()?;
        Ok(self)
    }
}

/// Saved scan configuration: what `config export` writes and `config import` reads.
///
/// All four fields are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfigFile {
    pub weights: DetectorWeights,
    pub rules: ScanRules,
    pub symbols: Vec<Symbol>,
    pub timeframes: Vec<Timeframe>,
}

impl ScanConfigFile {
    pub fn from_settings(settings: &ScannerSettings) -> Self {
        Self {
            weights: settings.profile.weights,
            rules: settings.profile.rules,
            symbols: settings.symbols.clone(),
            timeframes: settings.timeframes.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses and validates; malformed structure is rejected as a whole.
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        let file: Self = serde_json::from_str(raw)?;
        file.run_config()?;
        file.profile()?;
        Ok(file)
    }

    pub fn export(&self, path: &Path) -> Result<(), CoreError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn import(path: &Path) -> Result<Self, CoreError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn run_config(&self) -> Result<ScannerRunConfig, ValidationError> {
        ScannerRunConfig::new(self.symbols.clone(), self.timeframes.clone())
    }

    /// Weights are rescaled to sum to 1 when they drift.
    pub fn profile(&self) -> Result<ScanProfile, ValidationError> {
        for (field, value) in [("rules.any_tf", self.rules.any_tf), ("rules.majority_tf", self.rules.majority_tf)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::ScoreOutOfBounds {
                    field,
                    value: value.to_string(),
                });
            }
        }
        Ok(ScanProfile {
            weights: self.weights.normalized()?,
            rules: self.rules,
        })
    }
}
