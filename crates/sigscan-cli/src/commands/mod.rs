mod config;
mod consensus;
mod details;
mod scan;
mod watch;

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use sigscan_core::service::normalize_base_url;
use sigscan_core::{
    AdvancedFilterConfig, BackendEndpoint, DirectionFilter, Envelope, EnvelopeError, EnvelopeMeta,
    HttpAuth, HttpClient, HttpScanService, MockScanService, NoopHttpClient, ReqwestHttpClient,
    ScanConfigFile, ScanOrchestrator, ScanService, ScannerEvent, ScannerSettings, ScannerState,
    SessionHistory, SortSpec, Symbol, Timeframe,
};

use crate::cli::{Cli, Command, ScanInputArgs, ViewArgs};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

/// Effective settings plus the backend choice for one invocation.
pub struct Runtime {
    pub settings: ScannerSettings,
    pub mock: bool,
}

impl Runtime {
    /// Environment, then `--config`, then explicit flags.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let mut settings = ScannerSettings::from_env()?;
        if let Some(path) = &cli.config {
            let file = ScanConfigFile::import(path)?;
            settings = settings.apply_file(&file)?;
        }
        if let Some(url) = &cli.api_url {
            settings.api_url = normalize_base_url(url);
        }
        if let Some(timeout_ms) = cli.timeout_ms {
            settings.timeout_ms = timeout_ms;
        }
        Ok(Self {
            settings,
            mock: cli.mock,
        })
    }

    pub fn backend_label(&self) -> String {
        if self.mock {
            String::from("mock")
        } else {
            self.settings.api_url.clone()
        }
    }

    pub fn endpoint(&self) -> BackendEndpoint {
        let http: Arc<dyn HttpClient> = if self.mock {
            Arc::new(NoopHttpClient)
        } else {
            Arc::new(ReqwestHttpClient::new())
        };
        BackendEndpoint::new(http, &self.settings.api_url)
            .with_auth(HttpAuth::from_token(self.settings.api_token.clone()))
            .with_timeout_ms(self.settings.timeout_ms)
    }

    pub fn scan_service(&self) -> Arc<dyn ScanService> {
        if self.mock {
            Arc::new(MockScanService::new())
        } else {
            Arc::new(HttpScanService::new(self.endpoint()))
        }
    }

    /// Orchestrator seeded with the requested (or configured) inputs.
    pub fn orchestrator(&self, input: &ScanInputArgs) -> Result<ScanOrchestrator, CliError> {
        let symbols = if input.symbols.is_empty() {
            self.settings.symbols.clone()
        } else {
            input
                .symbols
                .iter()
                .map(|raw| Symbol::parse(raw))
                .collect::<Result<Vec<_>, _>>()?
        };
        let timeframes = if input.timeframes.is_empty() {
            self.settings.timeframes.clone()
        } else {
            input
                .timeframes
                .iter()
                .map(|raw| Timeframe::parse(raw))
                .collect::<Result<Vec<_>, _>>()?
        };
        let profile = input
            .preset
            .map(|preset| preset.profile())
            .unwrap_or(self.settings.profile);

        Ok(
            ScanOrchestrator::new(self.scan_service(), ScannerState::new(symbols, timeframes))
                .with_profile(profile)
                .with_history(SessionHistory::with_capacity(self.settings.history_capacity)),
        )
    }
}

/// Pushes the filter and sort flags into the orchestrator state.
pub fn apply_view(orchestrator: &ScanOrchestrator, view: &ViewArgs) -> Result<(), CliError> {
    let direction: DirectionFilter = view.direction.parse()?;
    let advanced = AdvancedFilterConfig::default()
        .with_score_range(view.score_min, view.score_max)?
        .with_signal_count_min(view.signal_min)
        .with_tf_agreement(view.tf_agreement.into())
        .with_price_change(view.price_change.into());

    orchestrator.dispatch(ScannerEvent::SearchChanged(
        view.search.clone().unwrap_or_default(),
    ));
    orchestrator.dispatch(ScannerEvent::DirectionFilterChanged(direction));
    orchestrator.dispatch(ScannerEvent::AdvancedFiltersChanged(advanced));
    orchestrator.dispatch(ScannerEvent::SortChanged(SortSpec::new(
        view.sort.into(),
        view.order.into(),
    )));
    Ok(())
}

pub fn into_envelope(result: CommandResult, backend: &str) -> Result<Envelope<Value>, CliError> {
    let CommandResult {
        data,
        warnings,
        errors,
        latency_ms,
    } = result;

    let mut meta = EnvelopeMeta::new(Uuid::new_v4().to_string(), backend, latency_ms)?;
    for warning in warnings {
        meta.push_warning(warning);
    }

    let mut envelope = Envelope::success(meta, data);
    for error in errors {
        envelope.push_error(error)?;
    }
    Ok(envelope)
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let runtime = Runtime::from_cli(cli)?;

    let command_result = match &cli.command {
        Command::Scan(args) => scan::run(args, &runtime).await?,
        Command::Watch(args) => watch::run(args, &runtime, cli).await?,
        Command::Consensus(args) => consensus::run(args)?,
        Command::Details(args) => details::run(args, &runtime).await?,
        Command::Config(args) => config::run(args, &runtime)?,
    };

    into_envelope(command_result, &runtime.backend_label())
}
