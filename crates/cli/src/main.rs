//! Paygate CLI
//!
//! Evaluate page views against the active paywall and manage the local cache.

mod commands;
mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use paygate_client::PaywallClient;
use paygate_manager::{PaywallManager, PaywallManagerBuilder};
use paygate_state_file::FileStateStore;

use crate::config::CliConfig;

/// Paygate CLI: decide whether pages are shown behind the paywall.
#[derive(Parser, Debug)]
#[command(name = "paygate", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, env = "PAYGATE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Base URL of the rule and entitlement services.
    #[arg(long, env = "PAYGATE_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Viewer access token for the entitlement service.
    #[arg(long, env = "PAYGATE_ACCESS_TOKEN", global = true)]
    access_token: Option<String>,

    /// Path of the persisted cache and budget ledger.
    #[arg(long, env = "PAYGATE_STATE_PATH", global = true)]
    state_path: Option<PathBuf>,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate one page view.
    Evaluate(commands::evaluate::EvaluateArgs),
    /// Inspect or clear the cached paywall.
    Cache(commands::cache::CacheArgs),
}

impl Cli {
    /// Apply flag and environment overrides on top of the file configuration.
    fn resolve_config(&self) -> anyhow::Result<CliConfig> {
        let mut config = CliConfig::load(self.config.as_deref())?;
        if let Some(ref url) = self.base_url {
            config.client.base_url.clone_from(url);
        }
        if let Some(ref token) = self.access_token {
            config.client.access_token = Some(token.clone());
        }
        if let Some(ref path) = self.state_path {
            config.store.path.clone_from(path);
        }
        Ok(config)
    }
}

fn build_manager(config: CliConfig) -> anyhow::Result<PaywallManager> {
    let store = FileStateStore::open(config.store.path)?;

    let mut client = PaywallClient::builder(config.client.base_url)
        .timeout(Duration::from_secs(config.client.timeout_seconds));
    if let Some(token) = config.client.access_token {
        client = client.access_token(token);
    }

    let manager = PaywallManagerBuilder::new()
        .store(Arc::new(store))
        .fetcher(Arc::new(client.build()?))
        .config(config.manager)
        .build()?;
    Ok(manager)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let manager = build_manager(cli.resolve_config()?)?;

    match cli.command {
        Command::Evaluate(ref args) => commands::evaluate::run(&manager, args, &cli.format).await,
        Command::Cache(ref args) => commands::cache::run(&manager, args, &cli.format),
    }
}
