use pricecache_core::Envelope;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::CliError;

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
        OutputFormat::Table => render_table(envelope)?,
    }

    Ok(())
}

fn render_table(envelope: &Envelope<Value>) -> Result<(), CliError> {
    println!("request_id  : {}", envelope.meta.request_id);
    println!("schema      : {}", envelope.meta.schema_version);
    println!("generated_at: {}", envelope.meta.generated_at);
    println!("latency_ms  : {}", envelope.meta.latency_ms);
    println!("cache_hit   : {}", envelope.meta.cache_hit);

    if !envelope.meta.warnings.is_empty() {
        println!("warnings:");
        for warning in &envelope.meta.warnings {
            println!("  - {warning}");
        }
    }

    match envelope.data.get("records").and_then(Value::as_array) {
        Some(records) => render_records(records),
        None if !envelope.data.is_null() => {
            println!("data:");
            let pretty_data = serde_json::to_string_pretty(&envelope.data)?;
            for line in pretty_data.lines() {
                println!("  {line}");
            }
        }
        None => {}
    }

    if !envelope.errors.is_empty() {
        println!("errors:");
        for error in &envelope.errors {
            println!("  - {}: {}", error.code, error.message);
        }
    }

    Ok(())
}

fn render_records(records: &[Value]) {
    println!(
        "{:<10}  {:>12}  {:>12}  {:>12}  {:>12}  {:>12}  {:>12}",
        "date", "open", "high", "low", "close", "adj_close", "volume"
    );
    for record in records {
        let number = |field: &str| {
            record
                .get(field)
                .and_then(Value::as_f64)
                .map(|value| format!("{value:.4}"))
                .unwrap_or_default()
        };
        println!(
            "{:<10}  {:>12}  {:>12}  {:>12}  {:>12}  {:>12}  {:>12}",
            record.get("date").and_then(Value::as_str).unwrap_or_default(),
            number("open"),
            number("high"),
            number("low"),
            number("close"),
            number("adj_close"),
            record.get("volume").and_then(Value::as_u64).unwrap_or_default(),
        );
    }
}
