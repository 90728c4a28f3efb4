// Birdie - conversational relay for the disc golf stats dashboard
// Main entry point

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use birdie_relay::config::{load_config, Config, BIRDIE};
use birdie_relay::providers::{with_retry, GeminiProvider, LlmProvider};
use birdie_relay::server::RelayServer;

/// Birdie relay - player context and chat sessions for the stats dashboard
#[derive(Parser)]
#[command(name = "birdie-relay", version, about)]
struct Cli {
    /// Config file (default: ~/.birdie/config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and AI_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP relay (default)
    Serve,
    /// Check the API key and model against the backend, then exit
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let filter = match cli.verbose {
        0 => "info,birdie_relay=info",
        1 => "info,birdie_relay=debug",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.set_port(port);
    }
    tracing::debug!(?config, "configuration loaded");

    let provider = gemini_provider(&config)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Check => check(&provider).await,
        Command::Serve => {
            tracing::info!(
                model = %config.relay.model,
                history_limit = config.relay.history_limit,
                max_output_tokens = config.relay.max_output_tokens,
                bind = %config.server.bind_address,
                "starting birdie relay"
            );
            let server = RelayServer::new(&config, BIRDIE, Arc::new(provider))?;
            server.serve().await
        }
    }
}

fn gemini_provider(config: &Config) -> Result<GeminiProvider> {
    let api_key = config.require_api_key()?.to_string();
    Ok(GeminiProvider::with_timeout(api_key, config.relay.timeout)
        .context("Failed to create Gemini provider")?
        .with_model(config.relay.model.clone())
        .with_base_url(config.backend.base_url.clone()))
}

async fn check(provider: &GeminiProvider) -> Result<()> {
    with_retry(|| provider.check_model())
        .await
        .with_context(|| format!("Model '{}' is not reachable", provider.default_model()))?;
    println!("✓ {} model '{}' is reachable", provider.name(), provider.default_model());
    Ok(())
}
