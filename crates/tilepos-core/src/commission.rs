//! # Commission Math
//!
//! Percent resolution and amount derivation for the commission ledger.
//! The ledger row lifecycle (one row per invoice, upserted on every
//! invoice mutation, status preserved across re-sync) lives in the db
//! crate; only the pure math is here.
//!
//! ## Percent Resolution Order
//! ```text
//! invoice.commission_percent_override     (explicit per-invoice)
//!   ?? config per-salesperson default
//!   ?? config global default
//! ```

use crate::config::EngineConfig;
use crate::money::{pct_of, round_amount};

// =============================================================================
// Resolution
// =============================================================================

/// Resolves the commission percent for an invoice.
pub fn resolve_commission_percent(
    override_percent: Option<f64>,
    salesperson: Option<&str>,
    config: &EngineConfig,
) -> f64 {
    override_percent.unwrap_or_else(|| config.commission_percent_for(salesperson))
}

/// Commission amount from a base and a percent, rounded to 2 decimals.
///
/// The base is the FINAL invoice value (after discount, including any
/// exclusive tax), not the cost base.
pub fn commission_amount(base_amount: f64, percent: f64) -> f64 {
    round_amount(pct_of(base_amount, percent))
}

// =============================================================================
// Unit Tests
// =============================================================================
