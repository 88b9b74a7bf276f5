mod cli;
mod commands;
mod error;
mod obs;
mod output;

use clap::Parser;

use crate::cli::Cli;
use crate::error::CliError;

fn main() {
    let cli = Cli::parse();

    if let Err(error) = run(&cli) {
        tracing::error!(code = error.code(), error = %error, "command failed");
        match commands::failure_envelope(&error) {
            Ok(envelope) => {
                if let Err(render_error) = output::render(&envelope, cli.format, cli.pretty) {
                    tracing::warn!(error = %render_error, "could not render error envelope");
                }
            }
            Err(envelope_error) => {
                tracing::warn!(error = %envelope_error, "could not build error envelope");
            }
        }
        eprintln!("error: {error}");
        std::process::exit(error.exit_code());
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    obs::init_tracing(&cli.log_level, cli.log_format)?;

    let envelope = commands::run(cli)?;
    output::render(&envelope, cli.format, cli.pretty)
}
