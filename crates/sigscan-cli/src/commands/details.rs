use std::time::Instant;

use serde_json::{Map, Value};

use sigscan_core::{EnvelopeError, SignalDetailsLoader, Symbol};

use crate::cli::DetailsArgs;
use crate::error::CliError;

use super::{CommandResult, Runtime};

pub async fn run(args: &DetailsArgs, runtime: &Runtime) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let loader = SignalDetailsLoader::new(runtime.endpoint());

    let started = Instant::now();
    let loaded = loader.load(&symbol).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let mut result = match loaded {
        Ok(set) => {
            let complete = set.is_complete();
            let mut sections = Map::new();
            for (name, value) in set.values {
                sections.insert(name.to_owned(), value);
            }
            let data = serde_json::json!({
                "symbol": symbol,
                "complete": complete,
                "sections": Value::Object(sections),
            });
            CommandResult::ok(data).with_warnings(set.warnings)
        }
        Err(error) => CommandResult::ok(serde_json::json!({ "symbol": symbol }))
            .with_errors(vec![EnvelopeError::from(&error)]),
    };

    if runtime.mock {
        result = result.with_warning("mock backend serves empty signal details");
    }
    Ok(result.with_latency(latency_ms))
}
