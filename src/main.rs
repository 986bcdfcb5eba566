//! jarprep - ahead-of-time Java artifact instrumentation
//!
//! CLI entry point: parses flags and response files, then runs the
//! preprocessing pipeline.

use console::style;
use jarprep::cli::{self, Invocation};
use jarprep::error::PrepResult;
use jarprep::orchestration::RunStatus;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(RunStatus::Succeeded) => ExitCode::SUCCESS,
        Ok(RunStatus::Failed) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PrepResult<RunStatus> {
    let args: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|a| a.to_string_lossy().into_owned())
        .collect();

    let config = match cli::invocation(&args)? {
        Invocation::Help => {
            print!("{}", cli::usage());
            return Ok(RunStatus::Succeeded);
        }
        Invocation::Version => {
            println!("jarprep {}", env!("CARGO_PKG_VERSION"));
            return Ok(RunStatus::Succeeded);
        }
        Invocation::Run(config) => config,
    };

    // Logs go to stderr so stdout only carries the summary
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level().filter_directive()))
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    cli::commands::run(&config).await
}
