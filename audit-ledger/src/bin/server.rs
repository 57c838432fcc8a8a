//! Audit ledger service binary

use anyhow::Context;
use audit_ledger::{AuditLedger, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting audit ledger");

    // Config file from the first argument, otherwise environment
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => Config::from_env().context("Failed to load config from environment")?,
    };

    let ledger = AuditLedger::open(config).await?;
    tracing::info!("Ledger opened successfully");

    ledger.record_security_event("Audit ledger started").await?;

    let report = ledger.audit_chain().await?;
    tracing::info!(
        chain_length = report.chain_length,
        valid = report.is_valid(),
        "Startup audit complete"
    );

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down audit ledger");
    ledger.shutdown().await?;
    Ok(())
}
