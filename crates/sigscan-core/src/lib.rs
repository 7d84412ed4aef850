//! # Sigscan Core
//!
//! Multi-timeframe signal scanning pipeline: tolerant normalization of
//! backend scan payloads, weighted timeframe consensus, a filter → sort
//! result pipeline and a scan orchestrator with cancellable auto-refresh.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`domain`] | Symbols, timeframes, directions, scan results |
//! | [`normalize`] | Raw JSON → [`ScanResult`] with field precedence chains |
//! | [`consensus`] | Weighted multi-timeframe score and direction |
//! | [`filter`] | Ordered predicate pipeline |
//! | [`sort`] | Stable single-key sorting |
//! | [`request`] | Run configuration, detector weights, wire request |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`service`] | Scan backend trait, HTTP and mock implementations |
//! | [`history`] | Bounded session history |
//! | [`scheduler`] | Cancellable refresh timer |
//! | [`state`] | Scanner state reducer |
//! | [`orchestrator`] | Scan lifecycle and auto-refresh |
//! | [`partial`] | Partial-failure aggregation and signal details |
//! | [`config`] | Settings and config file import/export |
//! | [`envelope`] | Output envelope with metadata |
//! | [`error`] | Error types |
//!
//! ## Data flow
//!
//! ```text
//! backend payload ─▶ normalize ─▶ results ─▶ filter ─▶ sort ─▶ caller
//!                                    ▲
//!        ScanOrchestrator ───────────┘   (manual scan or refresh tick)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sigscan_core::{MockScanService, ScanMode, ScanOrchestrator, ScannerSettings, ScannerState};
//!
//! let settings = ScannerSettings::default();
//! let state = ScannerState::new(settings.symbols.clone(), settings.timeframes.clone());
//! let orchestrator = ScanOrchestrator::new(Arc::new(MockScanService::new()), state);
//! let outcome = orchestrator.scan(ScanMode::Deep).await?;
//! for result in orchestrator.visible_results() {
//!     println!("{} {:.2} {}", result.symbol, result.score, result.direction);
//! }
//! ```

pub mod config;
pub mod consensus;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod history;
pub mod http_client;
pub mod normalize;
pub mod orchestrator;
pub mod partial;
pub mod request;
pub mod scheduler;
pub mod service;
pub mod sort;
pub mod state;

pub use config::{ScanConfigFile, ScannerSettings};
pub use consensus::{
    aggregate, breakdown, consensus_for, strength_band, timeframe_weight, Consensus,
    StrengthBand, TimeframeScore, WeightDistribution,
};
pub use domain::{
    Direction, RiskLevel, ScanResult, Symbol, Timeframe, TimeframeSignal, UtcDateTime,
};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};
pub use error::{CoreError, ScanError, ValidationError};
pub use filter::{
    AdvancedFilterConfig, DirectionFilter, FilterCriteria, PriceChangeFilter, TfAgreement,
};
pub use history::{SessionEntry, SessionHistory};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};
pub use normalize::{normalize_record, normalize_response, NormalizedBatch};
pub use orchestrator::{ScanOrchestrator, ScanOutcome};
pub use partial::{merge_partials, PartialResult, PartialSet, SignalDetailsLoader};
pub use request::{
    DetectorWeights, RiskMode, ScanMode, ScanProfile, ScanRequest, ScanRules, ScannerRunConfig,
};
pub use scheduler::{RefreshScheduler, RefreshTask};
pub use service::{BackendEndpoint, HttpScanService, MockScanService, ScanService};
pub use sort::{SortKey, SortOrder, SortSpec};
pub use state::{ScanPhase, ScannerEvent, ScannerState, ViewMode};
