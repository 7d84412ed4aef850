use std::time::Instant;

use serde::Serialize;
use serde_json::json;

use sigscan_core::state::visible_results;
use sigscan_core::{
    consensus_for, strength_band, Direction, EnvelopeError, RiskLevel, ScanError, ScanMode,
    ScanOrchestrator, ScanResult, ScannerState, StrengthBand,
};

use crate::cli::ScanArgs;
use crate::error::CliError;

use super::{apply_view, CommandResult, Runtime};

/// One printed line of the signal list.
#[derive(Debug, Serialize)]
pub struct ScanRow {
    pub symbol: String,
    pub score: f64,
    pub direction: Direction,
    pub band: StrengthBand,
    pub consensus_score: f64,
    pub consensus_direction: Direction,
    pub timeframes: usize,
    pub signals: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_24h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
}

impl From<&ScanResult> for ScanRow {
    fn from(result: &ScanResult) -> Self {
        let consensus = consensus_for(result);
        Self {
            symbol: result.symbol.to_string(),
            score: result.score,
            direction: result.direction,
            band: strength_band(result.score),
            consensus_score: consensus.score,
            consensus_direction: consensus.direction,
            timeframes: result.timeframes.len(),
            signals: result.component_count(),
            change_24h: result.change_24h,
            volume: result.volume,
            risk_level: result.risk_level,
        }
    }
}

pub async fn run(args: &ScanArgs, runtime: &Runtime) -> Result<CommandResult, CliError> {
    let orchestrator = runtime.orchestrator(&args.input)?;
    apply_view(&orchestrator, &args.view)?;

    let mode = if args.quick {
        ScanMode::Quick
    } else {
        ScanMode::Deep
    };
    scan_once(&orchestrator, mode).await
}

/// Runs one scan; backend failures become envelope errors, bad input aborts.
pub async fn scan_once(
    orchestrator: &ScanOrchestrator,
    mode: ScanMode,
) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let outcome = orchestrator.scan(mode).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Err(ScanError::Validation(error)) => Err(CliError::Validation(error)),
        Ok(_) | Err(_) => Ok(snapshot(&orchestrator.state()).with_latency(latency_ms)),
    }
}

/// Renders the visible list of a state, plus its warnings and error.
pub fn snapshot(state: &ScannerState) -> CommandResult {
    let rows: Vec<ScanRow> = visible_results(state).into_iter().map(ScanRow::from).collect();
    let data = json!({
        "scan": state.completed_scans,
        "phase": state.phase,
        "total": state.results.len(),
        "visible": rows.len(),
        "last_scan_at": state.last_scan_at,
        "results": rows,
    });

    let mut result = CommandResult::ok(data).with_warnings(state.warnings.clone());
    if let Some(error) = &state.error {
        result = result.with_errors(vec![EnvelopeError::from(error)]);
    }
    result
}
