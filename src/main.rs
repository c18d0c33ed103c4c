//! # Careflow — clinic patient-workflow automation
//!
//! Serves the three store-triggered endpoints: the record-change webhook,
//! the daily awaken sweep, and the callback-list sync webhook.
//!
//! Usage:
//!   careflow                          # Airtable backend (env credentials)
//!   careflow --store memory           # In-memory backend, no credentials
//!   careflow --config careflow.toml   # Explicit config file

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use careflow_core::CareflowConfig;
use careflow_core::traits::Store;
use careflow_store::{AirtableStore, MemoryStore};

#[derive(Parser)]
#[command(
    name = "careflow",
    version,
    about = "Webhook-driven workflow automation for clinic patient records"
)]
struct Cli {
    /// Config file path (default ~/.careflow/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Bind host override
    #[arg(long)]
    host: Option<String>,

    /// Bind port override
    #[arg(short, long)]
    port: Option<u16>,

    /// Record-store backend override: airtable or memory
    #[arg(long)]
    store: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "careflow=debug,careflow_rules=debug,careflow_gateway=debug,tower_http=debug"
    } else {
        "careflow=info,careflow_rules=info,careflow_gateway=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    // Load and overlay configuration
    let mut config = match &cli.config {
        Some(path) => CareflowConfig::load_from(Path::new(&expand_path(path)))?,
        None => CareflowConfig::load()?,
    };
    if let Some(host) = cli.host {
        config.gateway.host = host;
    }
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    if let Some(backend) = cli.store {
        config.store.backend = backend;
    }
    config.store.apply_env();
    // Fail fast on missing credentials — a gateway with empty secrets would
    // answer every webhook with a 500.
    config.store.validate()?;

    let store: Arc<dyn Store> = match config.store.backend.as_str() {
        "memory" => {
            tracing::warn!("Using the in-memory store backend — nothing is persisted");
            Arc::new(MemoryStore::new())
        }
        "airtable" => {
            tracing::info!(
                "Airtable store: base {} (tables '{}', '{}')",
                config.store.base_id,
                config.store.patients_table,
                config.store.callback_table
            );
            Arc::new(AirtableStore::new(&config.store))
        }
        other => anyhow::bail!("Unknown store backend '{other}' (expected airtable or memory)"),
    };

    careflow_gateway::start(&config.gateway, store).await
}
