//! Metrics collection for observability
//!
//! Prometheus metrics for the sealing path and the integrity audit.
//! Each [`Metrics`] owns a private registry so several ledgers can live in
//! one process.
//!
//! # Metrics
//!
//! - `audit_ledger_blocks_appended_total` - Blocks sealed and appended
//! - `audit_ledger_seal_attempts` - Histogram of proofs tried per seal
//! - `audit_ledger_seal_duration_seconds` - Histogram of seal latencies
//! - `audit_ledger_integrity_failures_total` - Failed chain audits
//! - `audit_ledger_chain_length` - Current number of blocks

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Total blocks appended
    pub blocks_appended: IntCounter,

    /// Seal attempts histogram
    pub seal_attempts: Histogram,

    /// Seal duration histogram
    pub seal_duration: Histogram,

    /// Failed integrity audits
    pub integrity_failures: IntCounter,

    /// Chain length
    pub chain_length: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let blocks_appended = IntCounter::new(
            "audit_ledger_blocks_appended_total",
            "Total number of blocks sealed and appended",
        )?;
        registry.register(Box::new(blocks_appended.clone()))?;

        let seal_attempts = Histogram::with_opts(
            HistogramOpts::new(
                "audit_ledger_seal_attempts",
                "Histogram of proofs tried per seal",
            )
            .buckets(vec![
                10.0, 100.0, 1_000.0, 10_000.0, 50_000.0, 100_000.0, 500_000.0, 1_000_000.0,
            ]),
        )?;
        registry.register(Box::new(seal_attempts.clone()))?;

        let seal_duration = Histogram::with_opts(
            HistogramOpts::new(
                "audit_ledger_seal_duration_seconds",
                "Histogram of seal latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 5.0]),
        )?;
        registry.register(Box::new(seal_duration.clone()))?;

        let integrity_failures = IntCounter::new(
            "audit_ledger_integrity_failures_total",
            "Total number of failed chain audits",
        )?;
        registry.register(Box::new(integrity_failures.clone()))?;

        let chain_length = IntGauge::new(
            "audit_ledger_chain_length",
            "Current number of blocks including genesis",
        )?;
        registry.register(Box::new(chain_length.clone()))?;

        Ok(Self {
            blocks_appended,
            seal_attempts,
            seal_duration,
            integrity_failures,
            chain_length,
            registry,
        })
    }

    /// Record a sealed block
    pub fn record_block_appended(&self, attempts: u64, duration_seconds: f64) {
        self.blocks_appended.inc();
        self.seal_attempts.observe(attempts as f64);
        self.seal_duration.observe(duration_seconds);
    }

    /// Record failed audit
    pub fn record_integrity_failure(&self) {
        self.integrity_failures.inc();
    }

    /// Update chain length
    pub fn set_chain_length(&self, length: usize) {
        self.chain_length.set(length as i64);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("blocks_appended", &self.blocks_appended.get())
            .field("integrity_failures", &self.integrity_failures.get())
            .field("chain_length", &self.chain_length.get())
            .finish()
    }
}
