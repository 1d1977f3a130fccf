//! # posts-admin
//!
//! Operator CLI for the file-backed post store.
//!
//! ```bash
//! posts-admin init
//! posts-admin create --as alice --title "Hello" --content "..." --tag intro
//! posts-admin list --author alice --page 2
//! posts-admin reindex
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

mod cli;
mod commands;
mod config;
mod error;
mod state;
mod telemetry;

use cli::Cli;
use config::AppConfig;
use state::AppState;
use telemetry::TelemetryConfig;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let cli = Cli::parse();
    let config = AppConfig::from_env(cli.data_dir);
    let state = AppState::new(&config).await?;

    match commands::run(&state, cli.command).await {
        Ok(output) => {
            print_json(&output)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::debug!(status = err.status(), error = %err, "Command failed");
            print_json(&err.to_response())?;
            Ok(err.exit_code())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
