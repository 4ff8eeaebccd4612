pub mod api;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod filter;
pub mod highlight;
pub mod session;

use api::ApiClient;
use clap::Parser;
use commands::{Console, ErrorLog};
use config::{Cli, ConsoleConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let working_dir = std::env::current_dir()?;
    let config = ConsoleConfig::load(&cli, &working_dir)?;

    init_logging(&config.log_level);
    log::info!(
        "Starting console against {} (timeout {}s)",
        config.base_url,
        config.timeout_secs
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_console(config))
}

async fn run_console(config: ConsoleConfig) -> anyhow::Result<()> {
    let client = Arc::new(ApiClient::new(config.gateway_options())?);
    let error_log = Arc::new(ErrorLog::default()); // Keep last 100 errors

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupt received, shutting down");
            ctrl_c.cancel();
        }
    });

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut console = Console::new(client, config, error_log, std::io::stdout());
    console.run(stdin, cancel).await?;
    Ok(())
}

/// stderr only, so console output on stdout stays clean. `RUST_LOG` wins over
/// the configured level.
fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        eprintln!("Logging already initialized: {}", e);
    }
}
