//! `kubectl oadp`, a kubectl plugin for OADP and Velero.

use std::process::ExitCode;

use clap::Parser;
use oadp_client::errors::ApiFailure;
use oadp_telemetry::Tracing;
use tracing::debug;

use crate::cli::Cli;

mod cli;
mod commands;
mod output;
mod prompt;

const APP_NAME: &str = "kubectl-oadp";

#[tokio::main]
async fn main() -> ExitCode {
    let Cli {
        command,
        global,
        telemetry,
    } = Cli::parse();

    // Must be kept alive until the end of main.
    let _tracing_guard = match Tracing::from_options(APP_NAME, telemetry).init() {
        Ok(guard) => guard,
        Err(error) => {
            eprintln!("Error: {}", snafu::Report::from_error(error));
            return ExitCode::FAILURE;
        }
    };

    match commands::run(command, &global).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            debug!(
                error = &error as &dyn std::error::Error,
                "command failed"
            );
            eprintln!("Error: {}", user_message(&error));
            ExitCode::FAILURE
        }
    }
}

/// Failures of the Kubernetes API are shown as a short sentence, the raw API
/// error only goes to the debug log. Everything else is shown with its full
/// chain of causes.
fn user_message(error: &commands::Error) -> String {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(cause) = source {
        if let Some(kube_error) = cause.downcast_ref::<kube::Error>() {
            return format!("{error}: {}", ApiFailure::from_kube(kube_error));
        }
        source = cause.source();
    }

    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
