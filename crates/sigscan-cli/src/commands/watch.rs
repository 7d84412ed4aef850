use std::time::Duration;

use serde_json::json;
use tracing::{info, warn};

use sigscan_core::{ScanMode, ScannerSettings};

use crate::cli::{Cli, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::scan::{scan_once, snapshot};
use super::{apply_view, into_envelope, CommandResult, Runtime};

/// Initial deep scan, then one rendered snapshot per completed refresh.
///
/// Returns a summary once `--max-refreshes` is reached or on ctrl-c; the
/// refresh timer is disarmed before returning.
pub async fn run(args: &WatchArgs, runtime: &Runtime, cli: &Cli) -> Result<CommandResult, CliError> {
    let orchestrator = runtime.orchestrator(&args.input)?;
    apply_view(&orchestrator, &args.view)?;

    let backend = runtime.backend_label();
    let first = scan_once(&orchestrator, ScanMode::Deep).await?;
    output::render(&into_envelope(first, &backend)?, cli.format, cli.pretty)?;

    let mut updates = orchestrator.subscribe();
    let mut seen = updates.borrow().completed_scans;
    let interval = refresh_interval(args, &runtime.settings);
    orchestrator.set_auto_refresh(true, Some(interval))?;

    let mut refreshes: u64 = 0;
    loop {
        if args.max_refreshes.is_some_and(|max| refreshes >= max) {
            break;
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted; stopping auto-refresh");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    warn!("scanner state channel closed");
                    break;
                }
                let current = updates.borrow_and_update().clone();
                if current.completed_scans <= seen {
                    continue;
                }
                seen = current.completed_scans;
                refreshes += 1;
                let envelope = into_envelope(snapshot(&current), &backend)?;
                output::render(&envelope, cli.format, cli.pretty)?;
            }
        }
    }

    orchestrator.set_auto_refresh(false, None)?;

    let history: Vec<_> = orchestrator
        .history()
        .entries()
        .map(|entry| {
            json!({
                "id": entry.id,
                "timestamp": entry.timestamp,
                "results": entry.results.len(),
            })
        })
        .collect();

    Ok(CommandResult::ok(json!({
        "refreshes": refreshes,
        "skipped_refreshes": orchestrator.skipped_refreshes(),
        "interval_secs": interval.as_secs(),
        "history": history,
    })))
}

/// `--interval` when given, otherwise the configured default.
fn refresh_interval(args: &WatchArgs, settings: &ScannerSettings) -> Duration {
    args.interval
        .map(Duration::from_secs)
        .unwrap_or(settings.refresh_interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Command;
    use clap::Parser;

    fn watch_args(argv: &[&str]) -> WatchArgs {
        let cli = Cli::parse_from(argv.iter().copied());
        match cli.command {
            Command::Watch(args) => args,
            other => panic!("expected watch, got {other:?}"),
        }
    }

    #[test]
    fn interval_falls_back_to_settings() {
        let settings = ScannerSettings {
            refresh_interval: Duration::from_secs(45),
            ..ScannerSettings::default()
        };
        let args = watch_args(&["sigscan", "watch", "BTCUSDT"]);
        assert_eq!(refresh_interval(&args, &settings), Duration::from_secs(45));

        let args = watch_args(&["sigscan", "watch", "BTCUSDT", "--interval", "30"]);
        assert_eq!(refresh_interval(&args, &settings), Duration::from_secs(30));
    }
}
