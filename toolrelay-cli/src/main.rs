// toolrelay-cli/src/main.rs
mod credentials;
mod settings;

mod models {
    pub mod cli;
}

use anyhow::{Context, Result};
use colored::*;
use std::env;
use std::fs;
use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{
    fmt::{self, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use toolrelay_core::{CancellationToken, QueryState, Relay, RelayError, ToolExecutionStatus};

use crate::models::cli::Cli;

const LOG_FILE_NAME: &str = "toolrelay.log";

async fn run(cli: Cli) -> Result<()> {
    let cwd = env::current_dir().context("Failed to get current directory")?;
    let config = settings::load_relay_config(&cli, &cwd)?;
    info!(mode = %config.mode, model = %config.model_name, "Resolved relay configuration.");

    if cli.write_credentials {
        credentials::write_credentials(&env::temp_dir(), &config.credentials)?;
    }

    let relay = Relay::from_config(config)?;

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling query.");
            ctrl_c_token.cancel();
        }
    });

    let outcome = relay.run(&cli.question, &cancel).await?;

    for result in &outcome.tool_results {
        if result.status == ToolExecutionStatus::Degraded {
            warn!(tool_call_id = %result.tool_call_id, tool_name = %result.tool_name, "Tool result is degraded.");
        }
    }
    debug!(path = ?outcome.path, messages = outcome.messages.len(), "Query finished.");
    if outcome.path.last() != Some(&QueryState::Done) {
        warn!(path = ?outcome.path, "Query did not end in Done state.");
    }

    println!("{}", outcome.final_answer);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    colored::control::set_override(true);

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // --- Logging Setup ---
    let default_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(default_level.into()));

    let log_dir = dirs::cache_dir()
        .or_else(dirs::runtime_dir)
        .unwrap_or_else(env::temp_dir)
        .join("toolrelay");
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("{} Failed to create log directory {}: {}", "Error:".red(), log_dir.display(), e);
        return ExitCode::FAILURE;
    }
    let log_path = log_dir.join(LOG_FILE_NAME);

    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let time_format = match time::format_description::parse(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]",
    ) {
        Ok(desc) => desc,
        Err(e) => {
            eprintln!("{} Failed to parse log time format: {}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };
    let local_timer = LocalTime::new(time_format);

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(local_timer.clone())
        .with_target(false)
        .with_level(true);
    let file_layer = fmt::layer()
        .with_writer(non_blocking_writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_timer(local_timer);

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("{} Failed to initialize logging: {}", "Error:".red(), e);
        return ExitCode::FAILURE;
    }
    colored::control::unset_override();

    info!(
        "Logging initialized (default level: {}). Logging to stderr and {}",
        default_level,
        log_path.display()
    );
    // --- End Logging Setup ---

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Relay failed: {:#}", e);
            match e.downcast_ref::<RelayError>() {
                Some(RelayError::Cancelled { phase }) => {
                    eprintln!("{} Cancelled during {}.", "Error:".red(), phase)
                }
                Some(relay_error) => eprintln!("{} {}", "Error:".red(), relay_error),
                None => eprintln!("{} {:#}", "Error:".red(), e),
            }
            ExitCode::FAILURE
        }
    }
}
