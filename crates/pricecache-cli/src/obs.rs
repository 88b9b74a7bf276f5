use crate::cli::LogFormat;
use crate::error::CliError;

/// Installs the global subscriber. Log lines go to stderr so stdout carries
/// only the envelope.
pub fn init_tracing(log_level: &str, log_format: LogFormat) -> Result<(), CliError> {
    let filter = std::env::var("PRICECACHE_LOG").unwrap_or_else(|_| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| CliError::Logging(format!("invalid log filter: {err}")))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let installed = match log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed.map_err(|err| CliError::Logging(err.to_string()))
}
