//! Command-line interface of `sigscan`.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scan` | Run one scan and print the filtered, sorted results |
//! | `watch` | Scan, then keep refreshing on an interval |
//! | `consensus` | Weighted consensus of hand-entered timeframe scores |
//! | `details` | Predictions, correlations and depth for one symbol |
//! | `config` | Show, export or import the scan configuration |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, ndjson, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings and errors as failures |
//! | `--mock` | `false` | Use the offline mock backend |
//! | `--api-url` | `$SIGSCAN_API_URL` | Backend base URL |
//! | `--timeout-ms` | `$SIGSCAN_TIMEOUT_MS` | Request timeout |
//! | `--config` | none | Scan configuration file to apply |
//!
//! # Examples
//!
//! ```bash
//! sigscan --mock scan BTCUSDT ETHUSDT --timeframes 1h,4h --sort score
//! sigscan watch --interval 60 --max-refreshes 3 --format table
//! sigscan consensus 1h:0.6:bullish 4h:0.8:bullish 1d:0.3:bearish
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use sigscan_core::{PriceChangeFilter, ScanProfile, SortKey, SortOrder, TfAgreement};

#[derive(Debug, Parser)]
#[command(
    name = "sigscan",
    author,
    version,
    about = "Multi-timeframe signal scanner",
    long_about = "sigscan asks a scanning backend for per-symbol, per-timeframe signal scores, \
normalizes them, and prints a filtered and ranked signal list.\n\
\n\
Use 'sigscan <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Answer scans from the deterministic offline backend.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    /// Backend base URL; overrides SIGSCAN_API_URL.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Request timeout in milliseconds; overrides SIGSCAN_TIMEOUT_MS.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Scan configuration file (as written by `config export`).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table.
    Table,
    /// Single JSON object.
    Json,
    /// One JSON object per line.
    Ndjson,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one scan.
    ///
    ///   sigscan scan BTCUSDT ETHUSDT --timeframes 1h,4h
    ///   sigscan scan --direction bullish --score-min 0.6 --sort change
    Scan(ScanArgs),

    /// Scan, then re-scan in quick mode every --interval seconds.
    ///
    ///   sigscan watch --interval 60
    ///   sigscan watch BTCUSDT --interval 30 --max-refreshes 5
    Watch(WatchArgs),

    /// Weighted consensus of TIMEFRAME:SCORE:DIRECTION entries.
    ///
    ///   sigscan consensus 1h:0.6:bullish 4h:0.8:bullish 1d:0.3:bearish
    Consensus(ConsensusArgs),

    /// Fetch predictions, correlations and market depth for a symbol.
    ///
    ///   sigscan details BTCUSDT
    Details(DetailsArgs),

    /// Show, export or import the scan configuration.
    Config(ConfigArgs),
}

/// Symbols, timeframes and detector preset of a scan.
#[derive(Debug, Clone, Args)]
pub struct ScanInputArgs {
    /// Symbols to scan. Defaults to the configured list.
    pub symbols: Vec<String>,

    /// Comma-separated timeframes. Defaults to the configured list.
    #[arg(long, value_delimiter = ',')]
    pub timeframes: Vec<String>,

    /// Detector weights and rules preset.
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,
}

/// Filter and sort options applied to the result list.
#[derive(Debug, Clone, Args)]
pub struct ViewArgs {
    /// Case-insensitive substring of the symbol.
    #[arg(long)]
    pub search: Option<String>,

    /// all, bullish, bearish or neutral.
    #[arg(long, default_value = "all")]
    pub direction: String,

    /// Inclusive lower score bound (0..1).
    #[arg(long, default_value_t = 0.0)]
    pub score_min: f64,

    /// Inclusive upper score bound (0..1).
    #[arg(long, default_value_t = 1.0)]
    pub score_max: f64,

    /// Minimum number of detector components.
    #[arg(long, default_value_t = 0)]
    pub signal_min: usize,

    #[arg(long, value_enum, default_value_t = TfAgreementArg::Any)]
    pub tf_agreement: TfAgreementArg,

    #[arg(long, value_enum, default_value_t = PriceChangeArg::Any)]
    pub price_change: PriceChangeArg,

    #[arg(long, value_enum, default_value_t = SortKeyArg::Score)]
    pub sort: SortKeyArg,

    #[arg(long, value_enum, default_value_t = SortOrderArg::Desc)]
    pub order: SortOrderArg,
}

#[derive(Debug, Clone, Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub input: ScanInputArgs,

    #[command(flatten)]
    pub view: ViewArgs,

    /// Use the cheaper quick-scan mode.
    #[arg(long, default_value_t = false)]
    pub quick: bool,
}

#[derive(Debug, Clone, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub input: ScanInputArgs,

    #[command(flatten)]
    pub view: ViewArgs,

    /// Seconds between refreshes (1 to 604800). Defaults to the configured
    /// refresh interval.
    #[arg(long)]
    pub interval: Option<u64>,

    /// Stop after this many refreshes. Runs until ctrl-c otherwise.
    #[arg(long)]
    pub max_refreshes: Option<u64>,
}

#[derive(Debug, Clone, Args)]
pub struct ConsensusArgs {
    /// Entries as TIMEFRAME:SCORE:DIRECTION, e.g. 4h:0.8:bullish.
    #[arg(required = true)]
    pub entries: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct DetailsArgs {
    pub symbol: String,
}

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Print the effective settings.
    Show,
    /// Write the scan configuration to PATH.
    Export { path: PathBuf },
    /// Validate a scan configuration file.
    Import { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetArg {
    Default,
    Aggressive,
    Conservative,
}

impl PresetArg {
    pub fn profile(self) -> ScanProfile {
        match self {
            Self::Default => ScanProfile::default(),
            Self::Aggressive => ScanProfile::aggressive(),
            Self::Conservative => ScanProfile::conservative(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TfAgreementArg {
    Any,
    Majority,
    Full,
}

impl From<TfAgreementArg> for TfAgreement {
    fn from(value: TfAgreementArg) -> Self {
        match value {
            TfAgreementArg::Any => Self::Any,
            TfAgreementArg::Majority => Self::Majority,
            TfAgreementArg::Full => Self::Full,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriceChangeArg {
    Any,
    Gainers,
    Losers,
    Bigmovers,
}

impl From<PriceChangeArg> for PriceChangeFilter {
    fn from(value: PriceChangeArg) -> Self {
        match value {
            PriceChangeArg::Any => Self::Any,
            PriceChangeArg::Gainers => Self::Gainers,
            PriceChangeArg::Losers => Self::Losers,
            PriceChangeArg::Bigmovers => Self::BigMovers,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortKeyArg {
    Score,
    Symbol,
    Change,
    Volume,
}

impl From<SortKeyArg> for SortKey {
    fn from(value: SortKeyArg) -> Self {
        match value {
            SortKeyArg::Score => Self::Score,
            SortKeyArg::Symbol => Self::Symbol,
            SortKeyArg::Change => Self::Change,
            SortKeyArg::Volume => Self::Volume,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortOrderArg {
    Asc,
    Desc,
}

impl From<SortOrderArg> for SortOrder {
    fn from(value: SortOrderArg) -> Self {
        match value {
            SortOrderArg::Asc => Self::Asc,
            SortOrderArg::Desc => Self::Desc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scan_with_view_options() {
        let cli = Cli::parse_from([
            "sigscan",
            "--mock",
            "scan",
            "BTCUSDT",
            "--timeframes",
            "1h,4h",
            "--sort",
            "change",
            "--order",
            "asc",
            "--price-change",
            "bigmovers",
        ]);
        assert!(cli.mock);
        let Command::Scan(args) = cli.command else {
            panic!("expected scan command");
        };
        assert_eq!(args.input.symbols, vec!["BTCUSDT"]);
        assert_eq!(args.input.timeframes, vec!["1h", "4h"]);
        assert_eq!(SortKey::from(args.view.sort), SortKey::Change);
        assert_eq!(PriceChangeFilter::from(args.view.price_change), PriceChangeFilter::BigMovers);
    }

    #[test]
    fn consensus_requires_entries() {
        assert!(Cli::try_parse_from(["sigscan", "consensus"]).is_err());
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = Cli::parse_from(["sigscan", "config", "show", "--format", "table", "--strict"]);
        assert_eq!(cli.format, OutputFormat::Table);
        assert!(cli.strict);
    }
}
