use serde_json::json;

use sigscan_core::normalize::to_unit_scale;
use sigscan_core::{aggregate, Direction, Timeframe, TimeframeScore};

use crate::cli::ConsensusArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn run(args: &ConsensusArgs) -> Result<CommandResult, CliError> {
    let scores = args
        .entries
        .iter()
        .map(|entry| parse_entry(entry))
        .collect::<Result<Vec<_>, _>>()?;

    let consensus = aggregate(&scores);
    let data = json!({
        "consensus": consensus,
        "band": consensus.band(),
        "distribution": consensus.distribution(),
        "timeframes": scores,
    });

    let mut result = CommandResult::ok(data);
    for score in &scores {
        if !score.timeframe.is_known() {
            result = result.with_warning(format!(
                "timeframe '{}' has no preset weight; using the default",
                score.timeframe
            ));
        }
    }
    Ok(result)
}

/// `TIMEFRAME:SCORE:DIRECTION`; scores above 1 are read as percentages.
fn parse_entry(entry: &str) -> Result<TimeframeScore, CliError> {
    let parts: Vec<&str> = entry.split(':').collect();
    let [timeframe, score, direction] = parts.as_slice() else {
        return Err(CliError::Command(format!(
            "expected TIMEFRAME:SCORE:DIRECTION, got '{entry}'"
        )));
    };

    let timeframe = Timeframe::parse(timeframe)?;
    let score: f64 = score
        .trim()
        .parse()
        .map_err(|_| CliError::Command(format!("score '{score}' is not a number")))?;
    if !score.is_finite() || score < 0.0 {
        return Err(CliError::Command(format!(
            "score '{score}' must be a non-negative number"
        )));
    }
    let direction: Direction = direction.parse()?;

    Ok(TimeframeScore::new(timeframe, to_unit_scale(score), direction))
}
