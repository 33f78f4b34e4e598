//! Kite Connect CLI
//!
//! Single binary that:
//! 1. Loads API credentials from the env file and process environment
//! 2. Resolves an access token (validate the stored one, or log in interactively)
//! 3. Builds the authenticated gateway
//! 4. Runs one API command and prints the result as JSON

mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use kite_auth::{
    ACCESS_TOKEN_VAR, Credential, CredentialResolver, EnvFileStore, KiteSession, StdinPrompt,
    TokenOrigin,
};
use kite_gateway::Gateway;
use serde_json::{Value, json};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    let env_file = Config::resolve_path(cli.env_file.as_deref());
    info!(path = %env_file.display(), "loading configuration");

    let config = Config::load(&env_file)
        .with_context(|| format!("failed to load config from {}", env_file.display()))?;

    info!(
        base_url = %config.base_url,
        timeout_ms = config.request_timeout.as_millis() as u64,
        has_access_token = config.access_token.is_some(),
        "configuration loaded"
    );

    let credential = Credential::new(
        config.api_key.clone(),
        config.api_secret.as_ref().map(|s| s.expose().clone()),
        config.access_token.as_ref().map(|s| s.expose().clone()),
    )
    .with_context(|| {
        format!(
            "set API_KEY and API_SECRET in {} or the environment",
            config.env_file.display()
        )
    })?;

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("failed to build HTTP client")?;

    // Runs to completion, including the operator prompt, before any API call
    let session = KiteSession::new(client.clone(), config.base_url.clone());
    let store = EnvFileStore::new(&config.env_file);
    let resolved = CredentialResolver::new(&session, &StdinPrompt, &store)
        .resolve(&credential)
        .await
        .context("could not obtain a Kite access token")?;

    for warning in &resolved.warnings {
        warn!(%warning, "access token not persisted");
        eprintln!("warning: {warning}\n{}", warning.manual_instruction());
    }
    if resolved.warnings.is_empty() && config.saved_token_is_shadowed(resolved.origin) {
        warn!(
            path = %config.env_file.display(),
            "{ACCESS_TOKEN_VAR} in the process environment overrides the token just saved"
        );
        eprintln!(
            "warning: {ACCESS_TOKEN_VAR} is set in the environment and will hide the token saved to {}; unset it before the next run",
            config.env_file.display()
        );
    }
    info!(origin = ?resolved.origin, "access token ready");

    let origin = resolved.origin;
    let gateway = Gateway::new(
        client,
        config.base_url,
        credential.api_key.clone(),
        resolved.access_token,
        config.request_timeout,
    );

    let output = run(&gateway, origin, cli.command).await?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Execute one command against the gateway.
async fn run(gateway: &Gateway, origin: TokenOrigin, command: Commands) -> Result<Value> {
    let result = match command {
        Commands::Login => {
            let token = match origin {
                TokenOrigin::Existing => "existing",
                TokenOrigin::Exchanged => "new",
            };
            return Ok(json!({ "status": "ok", "token": token }));
        }
        Commands::Profile => gateway.profile().await,
        Commands::Margins { segment } => gateway.margins(segment.as_deref()).await,
        Commands::Positions => gateway.positions().await,
        Commands::Holdings => gateway.holdings().await,
        Commands::Orders => gateway.orders().await,
        Commands::Trades => gateway.trades().await,
        Commands::OrderHistory { order_id } => gateway.order_history(&order_id).await,
        Commands::OrderTrades { order_id } => gateway.order_trades(&order_id).await,
        Commands::CancelOrder { variety, order_id } => {
            gateway.cancel_order(&variety, &order_id).await
        }
    };

    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_token_expired() => Err(anyhow::Error::new(e)
            .context("the access token was rejected; run `kite login` to log in again")),
        Err(e) => Err(e.into()),
    }
}

/// Logs go to stderr so stdout carries only command output.
/// LOG_LEVEL, then RUST_LOG, override the verbosity flag.
fn init_logging(verbosity: u8, json: bool) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
