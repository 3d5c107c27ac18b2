//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `quota_ledger_operations_total{operation,outcome}` - Executed commands
//! - `quota_ledger_rejections_total{code}` - Rejections by numeric code
//! - `quota_ledger_quotas_issued_total` - Quotas created by mint or split
//! - `quota_ledger_next_quota_id` - Id the next issuance will receive
//! - `quota_ledger_frozen` - 1 while transfers are frozen

use crate::command::CommandOutput;
use crate::error::TxResult;
use crate::state::LedgerState;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
///
/// Registers into its own registry so several ledgers can coexist in one
/// process.
#[derive(Clone)]
pub struct Metrics {
    /// Executed commands by operation and outcome
    pub operations_total: IntCounterVec,

    /// Rejections by code
    pub rejections_total: IntCounterVec,

    /// Quotas created
    pub quotas_issued: IntCounter,

    /// Next quota id
    pub next_quota_id: IntGauge,

    /// Freeze switch
    pub frozen: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let operations_total = IntCounterVec::new(
            Opts::new(
                "quota_ledger_operations_total",
                "Total number of executed ledger commands",
            ),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new(
                "quota_ledger_rejections_total",
                "Total number of rejected commands by code",
            ),
            &["code"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let quotas_issued = IntCounter::new(
            "quota_ledger_quotas_issued_total",
            "Total number of quotas created by mint or split",
        )?;
        registry.register(Box::new(quotas_issued.clone()))?;

        let next_quota_id = IntGauge::new(
            "quota_ledger_next_quota_id",
            "Id the next mint or split will receive",
        )?;
        registry.register(Box::new(next_quota_id.clone()))?;

        let frozen = IntGauge::new("quota_ledger_frozen", "1 while transfers are frozen")?;
        registry.register(Box::new(frozen.clone()))?;

        Ok(Self {
            operations_total,
            rejections_total,
            quotas_issued,
            next_quota_id,
            frozen,
            registry,
        })
    }

    /// Record the outcome of one command
    pub fn record_command(&self, operation: &str, result: &TxResult<CommandOutput>) {
        match result {
            Ok(output) => {
                self.operations_total
                    .with_label_values(&[operation, "ok"])
                    .inc();
                if output.issued().is_some() {
                    self.quotas_issued.inc();
                }
            }
            Err(rejection) => {
                self.operations_total
                    .with_label_values(&[operation, "rejected"])
                    .inc();
                self.rejections_total
                    .with_label_values(&[&rejection.code().to_string()])
                    .inc();
            }
        }
    }

    /// Refresh gauges from state
    pub fn observe_state(&self, state: &LedgerState) {
        self.next_quota_id
            .set(i64::try_from(state.next_quota_id().get()).unwrap_or(i64::MAX));
        self.frozen.set(i64::from(state.is_frozen()));
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("quotas_issued", &self.quotas_issued.get())
            .field("next_quota_id", &self.next_quota_id.get())
            .finish()
    }
}
