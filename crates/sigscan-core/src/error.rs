use thiserror::Error;

/// Validation and contract errors exposed by `sigscan-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("timeframe cannot be empty")]
    EmptyTimeframe,
    #[error("invalid direction '{value}', expected one of BULLISH, BEARISH, NEUTRAL")]
    InvalidDirection { value: String },

    #[error("please select at least one symbol")]
    EmptySymbols,
    #[error("please select at least one timeframe")]
    EmptyTimeframes,

    #[error("field '{field}' must be within [0, 1], got {value}")]
    ScoreOutOfBounds { field: &'static str, value: String },
    #[error("score_min ({min}) must not exceed score_max ({max})")]
    InvertedScoreRange { min: String, max: String },
    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("refresh interval must be at least {min_secs}s, got {secs}s")]
    RefreshIntervalTooShort { secs: u64, min_secs: u64 },
    #[error("refresh interval must be at most {max_secs}s, got {secs}s")]
    RefreshIntervalTooLong { secs: u64, max_secs: u64 },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("schema_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidSchemaVersion { value: String },
    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,

    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },
    #[error("no session with id '{id}' in history")]
    UnknownSession { id: String },
}

/// Failure of a scan or of an auxiliary fetch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Rejected before any network call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{message}")]
    Transport {
        message: String,
        status: Option<u16>,
    },

    #[error("all {attempted} sub-fetches failed")]
    AllSubFetchesFailed {
        attempted: usize,
        failures: Vec<String>,
    },
}

impl ScanError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            status: None,
        }
    }

    pub fn http_status(status: u16, body: &str) -> Self {
        Self::Transport {
            message: format!("HTTP {status} - {}", excerpt(body, 200)),
            status: Some(status),
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "scan.validation",
            Self::Transport { .. } => "scan.transport",
            Self::AllSubFetchesFailed { .. } => "scan.all_sub_fetches_failed",
        }
    }

    /// Whether the user may re-run the same request. Nothing retries on its own.
    pub const fn user_retryable(&self) -> bool {
        !matches!(self, Self::Validation(_))
    }
}

fn excerpt(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_owned();
    }
    let mut cut: String = trimmed.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
