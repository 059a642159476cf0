//! Bazelisk - runs the Bazel version a workspace asks for
//!
//! CLI entry point.

use bazelisk::cli::Cli;
use bazelisk::config::{Config, ConfigManager};
use bazelisk::error::BazeliskResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "BAZELISK_LOG";

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> BazeliskResult<i32> {
    let cli = Cli::parse();
    let config = ConfigManager::new().load().await?;
    init_logging(&config);

    bazelisk::cli::launch(cli, &config).await
}

/// Logs go to stderr so Bazel owns stdout
fn init_logging(config: &Config) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("bazelisk=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);

    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
