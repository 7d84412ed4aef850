//! Scanner view state as a pure reducer.
//!
//! Every change goes through [`reduce`], which returns a fresh
//! [`ScannerState`]. The visible list is never stored: [`visible_results`]
//! re-derives it from `(results, criteria, sort)` on demand.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::filter::{self, AdvancedFilterConfig, DirectionFilter, FilterCriteria};
use crate::request::dedup;
use crate::sort::{self, SortKey, SortSpec};
use crate::{ScanError, ScanResult, Symbol, Timeframe, UtcDateTime, ValidationError};

pub const MAX_COMPARISON: usize = 4;
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    #[default]
    Idle,
    Scanning,
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    List,
    Grid,
    Chart,
    Heatmap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoRefresh {
    pub enabled: bool,
    pub interval: Duration,
}

impl Default for AutoRefresh {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScannerState {
    pub symbols: Vec<Symbol>,
    pub timeframes: Vec<Timeframe>,
    pub phase: ScanPhase,
    /// Requests started but not yet resolved.
    pub in_flight: usize,
    pub results: Vec<ScanResult>,
    pub warnings: Vec<String>,
    pub error: Option<ScanError>,
    pub has_scanned: bool,
    /// Scans resolved so far, successful or not.
    pub completed_scans: u64,
    pub last_scan_at: Option<UtcDateTime>,
    pub search: String,
    pub direction: DirectionFilter,
    pub advanced: AdvancedFilterConfig,
    pub sort: SortSpec,
    pub view_mode: ViewMode,
    pub auto_refresh: AutoRefresh,
    pub selected: BTreeSet<Symbol>,
    pub restored_session: Option<Uuid>,
}

impl ScannerState {
    /// Inputs are deduplicated, first occurrence wins.
    pub fn new(symbols: Vec<Symbol>, timeframes: Vec<Timeframe>) -> Self {
        Self {
            symbols: dedup(symbols),
            timeframes: dedup(timeframes),
            ..Self::default()
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.in_flight > 0
    }

    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            search: self.search.clone(),
            direction: self.direction,
            advanced: self.advanced,
            requested_timeframes: dedup(self.timeframes.clone()).len(),
        }
    }

    fn settle(&mut self, outcome: ScanPhase) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.completed_scans += 1;
        self.phase = if self.in_flight > 0 {
            ScanPhase::Scanning
        } else {
            outcome
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScannerEvent {
    ScanStarted,
    /// Replaces the whole result list; last completion wins.
    ScanSucceeded {
        results: Vec<ScanResult>,
        warnings: Vec<String>,
        at: UtcDateTime,
    },
    ScanFailed(ScanError),
    /// Inputs failed validation before any request was issued.
    ScanRejected(ValidationError),
    SymbolsChanged(Vec<Symbol>),
    TimeframesChanged(Vec<Timeframe>),
    SearchChanged(String),
    DirectionFilterChanged(DirectionFilter),
    AdvancedFiltersChanged(AdvancedFilterConfig),
    SortSelected(SortKey),
    SortChanged(SortSpec),
    AutoRefreshChanged {
        enabled: bool,
        interval: Option<Duration>,
    },
    SessionRestored {
        id: Uuid,
        symbols: Vec<Symbol>,
        timeframes: Vec<Timeframe>,
    },
    ComparisonToggled(Symbol),
    ComparisonCleared,
    ViewModeChanged(ViewMode),
}

pub fn reduce(state: &ScannerState, event: ScannerEvent) -> ScannerState {
    let mut next = state.clone();
    match event {
        ScannerEvent::ScanStarted => {
            next.in_flight += 1;
            next.phase = ScanPhase::Scanning;
            next.error = None;
            next.has_scanned = true;
        }
        ScannerEvent::ScanSucceeded {
            results,
            warnings,
            at,
        } => {
            next.results = results;
            next.warnings = warnings;
            next.error = None;
            next.last_scan_at = Some(at);
            next.settle(ScanPhase::Success);
        }
        ScannerEvent::ScanFailed(error) => {
            next.results.clear();
            next.warnings.clear();
            next.error = Some(error);
            next.settle(ScanPhase::Failure);
        }
        ScannerEvent::ScanRejected(error) => {
            next.error = Some(ScanError::Validation(error));
            if next.in_flight == 0 {
                next.phase = ScanPhase::Failure;
            }
        }
        ScannerEvent::SymbolsChanged(symbols) => next.symbols = dedup(symbols),
        ScannerEvent::TimeframesChanged(timeframes) => next.timeframes = dedup(timeframes),
        ScannerEvent::SearchChanged(search) => next.search = search,
        ScannerEvent::DirectionFilterChanged(direction) => next.direction = direction,
        ScannerEvent::AdvancedFiltersChanged(advanced) => next.advanced = advanced,
        ScannerEvent::SortSelected(key) => next.sort = state.sort.toggle(key),
        ScannerEvent::SortChanged(spec) => next.sort = spec,
        ScannerEvent::AutoRefreshChanged { enabled, interval } => {
            next.auto_refresh.enabled = enabled;
            if let Some(interval) = interval {
                next.auto_refresh.interval = interval;
            }
        }
        ScannerEvent::SessionRestored {
            id,
            symbols,
            timeframes,
        } => {
            next.symbols = dedup(symbols);
            next.timeframes = dedup(timeframes);
            next.restored_session = Some(id);
        }
        ScannerEvent::ComparisonToggled(symbol) => {
            if !next.selected.remove(&symbol) && next.selected.len() < MAX_COMPARISON {
                next.selected.insert(symbol);
            }
        }
        ScannerEvent::ComparisonCleared => next.selected.clear(),
        ScannerEvent::ViewModeChanged(mode) => next.view_mode = mode,
    }
    next
}

/// Filter then sort. Pure in `state`.
pub fn visible_results(state: &ScannerState) -> Vec<&ScanResult> {
    let mut visible = filter::apply(&state.results, &state.criteria());
    sort::sort_results(&mut visible, state.sort);
    visible
}

/// Selected symbols that are present in the current results, in result order.
pub fn comparison_results(state: &ScannerState) -> Vec<&ScanResult> {
    state
        .results
        .iter()
        .filter(|result| state.selected.contains(&result.symbol))
        .collect()
}
