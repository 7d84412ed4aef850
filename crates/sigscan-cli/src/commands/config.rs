use serde_json::json;

use sigscan_core::ScanConfigFile;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;

use super::{CommandResult, Runtime};

pub fn run(args: &ConfigArgs, runtime: &Runtime) -> Result<CommandResult, CliError> {
    let settings = &runtime.settings;

    match &args.action {
        ConfigAction::Show => {
            let file = ScanConfigFile::from_settings(settings);
            let data = json!({
                "api_url": settings.api_url,
                "timeout_ms": settings.timeout_ms,
                "authenticated": settings.api_token.is_some(),
                "history_capacity": settings.history_capacity,
                "refresh_interval_secs": settings.refresh_interval.as_secs(),
                "mock": runtime.mock,
                "scan": file,
            });
            Ok(CommandResult::ok(data))
        }
        ConfigAction::Export { path } => {
            let file = ScanConfigFile::from_settings(settings);
            file.export(path)?;
            Ok(CommandResult::ok(json!({
                "path": path.display().to_string(),
                "scan": file,
            })))
        }
        ConfigAction::Import { path } => {
            let file = ScanConfigFile::import(path)?;
            let profile = file.profile()?;
            let mut result = CommandResult::ok(json!({
                "path": path.display().to_string(),
                "scan": file,
                "normalized_weights": profile.weights,
            }));
            if (file.weights.sum() - 1.0).abs() > 0.01 {
                result = result.with_warning(format!(
                    "detector weights sum to {:.3}; they are rescaled to 1 when scanning",
                    file.weights.sum()
                ));
            }
            Ok(result)
        }
    }
}
