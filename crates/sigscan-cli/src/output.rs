use serde_json::Value;

use sigscan_core::Envelope;

use crate::cli::OutputFormat;
use crate::error::CliError;

const RESULT_COLUMNS: [(&str, &str, usize); 8] = [
    ("symbol", "SYMBOL", 12),
    ("score", "SCORE", 6),
    ("direction", "DIRECTION", 9),
    ("band", "BAND", 8),
    ("consensus_direction", "CONSENSUS", 9),
    ("change_24h", "CHG_24H", 8),
    ("volume", "VOLUME", 14),
    ("risk_level", "RISK", 6),
];

pub fn render(
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            println!("{payload}");
        }
        OutputFormat::Ndjson => {
            let payload = serde_json::to_string(envelope)?;
            println!("{payload}");
        }
        OutputFormat::Table => render_table(envelope)?,
    }

    Ok(())
}

fn render_table(envelope: &Envelope<Value>) -> Result<(), CliError> {
    println!("request_id  : {}", envelope.meta.request_id);
    println!("schema      : {}", envelope.meta.schema_version);
    println!("generated_at: {}", envelope.meta.generated_at);
    println!("backend     : {}", envelope.meta.backend);
    println!("latency_ms  : {}", envelope.meta.latency_ms);

    if !envelope.meta.warnings.is_empty() {
        println!("warnings:");
        for warning in &envelope.meta.warnings {
            println!("  - {warning}");
        }
    }

    match envelope.data.get("results").and_then(Value::as_array) {
        Some(rows) => {
            for line in result_table(rows) {
                println!("{line}");
            }
        }
        None => {
            println!("data:");
            let pretty_data = serde_json::to_string_pretty(&envelope.data)?;
            for line in pretty_data.lines() {
                println!("  {line}");
            }
        }
    }

    if !envelope.errors.is_empty() {
        println!("errors:");
        for error in &envelope.errors {
            println!("  - {}: {}", error.code, error.message);
        }
    }

    Ok(())
}

fn result_table(rows: &[Value]) -> Vec<String> {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        RESULT_COLUMNS
            .iter()
            .map(|&(_, title, width)| format!("{title:<width$}"))
            .collect::<Vec<_>>()
            .join(" "),
    );

    if rows.is_empty() {
        lines.push(String::from("(no signals)"));
        return lines;
    }

    for row in rows {
        lines.push(
            RESULT_COLUMNS
                .iter()
                .map(|&(key, _, width)| format!("{:<width$}", cell(row.get(key))))
                .collect::<Vec<_>>()
                .join(" ")
                .trim_end()
                .to_owned(),
        );
    }
    lines
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::from("-"),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => match number.as_f64() {
            Some(float) if number.is_f64() => format!("{float:.2}"),
            _ => number.to_string(),
        },
        Some(other) => other.to_string(),
    }
}
