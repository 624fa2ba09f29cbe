//! # Engine Configuration
//!
//! Explicit configuration struct passed into the engine at
//! construction. The source system read feature toggles and defaults
//! ad hoc from a key-value table mid-computation; here every policy is
//! resolved once, up front.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Policies
// =============================================================================

/// How to interpret an invoice's stored total when per-line data is
/// missing and the rollup must fall back to header values.
///
/// Misconfiguring this silently changes the meaning of reconstructed
/// gross revenue, which is why it is an explicit, named policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrossReconstructionPolicy {
    /// Stored total is already net of discount and commission;
    /// `gross = total + discount + commission`.
    AssumeStoredTotalIsNet,
    /// Stored total IS the gross; net is derived by subtraction.
    AssumeStoredTotalIsGross,
}

impl Default for GrossReconstructionPolicy {
    fn default() -> Self {
        GrossReconstructionPolicy::AssumeStoredTotalIsNet
    }
}

/// Which transport components participate in the landed cost.
///
/// The source always summed all three (percent of base + flat per-unit
/// + lot-total allocation), so `Additive` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportAllocationMode {
    /// Percent + per-unit + lot-total allocation, all summed.
    Additive,
    /// Only the percent-of-base component.
    Percent,
    /// Only the flat per-unit adder and the lot-total allocation.
    PerUnit,
}

impl Default for TransportAllocationMode {
    fn default() -> Self {
        TransportAllocationMode::Additive
    }
}

/// Which cost strategy resolves "the" unit cost of an item at sale
/// time. See [`crate::costing`] for the strategy implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostMethod {
    /// Cost of the most recently created lot (last-in cost basis).
    /// This is the load-bearing policy the source embedded as
    /// `ORDER BY id DESC LIMIT 1` — NOT a weighted average.
    LastLot,
    /// Net-quantity-weighted average across all of the item's lots.
    WeightedAverage,
}

impl Default for CostMethod {
    fn default() -> Self {
        CostMethod::LastLot
    }
}

// =============================================================================
// Engine Config
// =============================================================================

/// Configuration surface for the ledger engine.
///
/// ## Example
/// ```rust
/// use tilepos_core::config::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_default_commission_percent(2.0)
///     .with_salesperson_percent("ravi", 5.0);
/// assert_eq!(config.commission_percent_for(Some("ravi")), 5.0);
/// assert_eq!(config.commission_percent_for(Some("other")), 2.0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cost strategy for sale-time snapshots.
    pub cost_method: CostMethod,

    /// Transport components included in landed cost.
    pub transport_allocation_mode: TransportAllocationMode,

    /// Header-fallback gross reconstruction direction.
    pub gross_reconstruction_policy: GrossReconstructionPolicy,

    /// Commission percent when no override and no per-salesperson
    /// default applies.
    pub default_commission_percent: f64,

    /// Per-salesperson default commission percentages.
    pub commission_percent_by_salesperson: HashMap<String, f64>,
}

impl EngineConfig {
    pub fn with_cost_method(mut self, method: CostMethod) -> Self {
        self.cost_method = method;
        self
    }

    pub fn with_transport_allocation_mode(mut self, mode: TransportAllocationMode) -> Self {
        self.transport_allocation_mode = mode;
        self
    }

    pub fn with_gross_reconstruction_policy(mut self, policy: GrossReconstructionPolicy) -> Self {
        self.gross_reconstruction_policy = policy;
        self
    }

    pub fn with_default_commission_percent(mut self, pct: f64) -> Self {
        self.default_commission_percent = pct;
        self
    }

    pub fn with_salesperson_percent(mut self, salesperson: impl Into<String>, pct: f64) -> Self {
        self.commission_percent_by_salesperson
            .insert(salesperson.into(), pct);
        self
    }

    /// Default commission percent for a salesperson, falling back to
    /// the global default. Invoice-level overrides are resolved above
    /// this, in [`crate::commission::resolve_commission_percent`].
    pub fn commission_percent_for(&self, salesperson: Option<&str>) -> f64 {
        salesperson
            .and_then(|s| self.commission_percent_by_salesperson.get(s).copied())
            .unwrap_or(self.default_commission_percent)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.cost_method, CostMethod::LastLot);
        assert_eq!(
            config.transport_allocation_mode,
            TransportAllocationMode::Additive
        );
        assert_eq!(
            config.gross_reconstruction_policy,
            GrossReconstructionPolicy::AssumeStoredTotalIsNet
        );
        assert_eq!(config.default_commission_percent, 0.0);
    }

    #[test]
    fn test_commission_percent_resolution_order() {
        let config = EngineConfig::default()
            .with_default_commission_percent(2.0)
            .with_salesperson_percent("ravi", 5.0);

        assert_eq!(config.commission_percent_for(Some("ravi")), 5.0);
        assert_eq!(config.commission_percent_for(Some("meena")), 2.0);
        assert_eq!(config.commission_percent_for(None), 2.0);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = EngineConfig::default().with_salesperson_percent("ravi", 5.0);
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.commission_percent_for(Some("ravi")), 5.0);
    }
}
