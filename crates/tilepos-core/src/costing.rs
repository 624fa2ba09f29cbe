//! # Costing Calculator
//!
//! Derives the landed unit cost of a purchase lot: base price plus
//! allocated transport.
//!
//! ## Cost Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Landed Cost Derivation                     │
//! │                                                                 │
//! │  base = per_unit > 0 ? per_unit : per_area × units_per_area     │
//! │  net  = max(0, received − damaged)                              │
//! │                                                                 │
//! │  transport = base × pct/100        (percent component)         │
//! │            + per_unit_adder        (flat component)            │
//! │            + total / net           (lot-wide allocation)       │
//! │                                                                 │
//! │  final_unit_cost = base + transport                             │
//! │                                                                 │
//! │  Example: base 100, pct 5, adder 2, total 300, net 40           │
//! │           transport = 5 + 2 + 7.5 = 14.5 → landed 114.5         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All inputs are clamped, never rejected: this path must stay
//! tolerant of legacy rows. Strict checks for new entries live in
//! [`crate::validation`].

use crate::config::TransportAllocationMode;
use crate::types::PurchaseLot;
use crate::DEFAULT_UNITS_PER_AREA;

// =============================================================================
// Landed Cost
// =============================================================================

/// Cost breakdown for one lot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LandedCost {
    /// Base purchase price per unit (after area conversion).
    pub base_cost: f64,
    /// Allocated transport per unit.
    pub transport_cost: f64,
    /// `base_cost + transport_cost`.
    pub final_unit_cost: f64,
    /// Received minus damaged, clamped to zero.
    pub net_units: f64,
}

/// Computes the landed unit cost of a lot.
///
/// Tolerant by design: negative inputs are clamped to zero,
/// `units_per_area <= 0` falls back to 1 (area-denominated prices are
/// then read as unit-denominated), and a lot with zero net units
/// contributes no lot-total allocation instead of dividing by zero.
///
/// ## Example
/// ```rust
/// use tilepos_core::config::TransportAllocationMode;
/// use tilepos_core::costing::landed_unit_cost;
/// # use tilepos_core::types::PurchaseLot;
/// # use chrono::{NaiveDate, Utc};
/// # let lot = PurchaseLot {
/// #     id: "l1".into(), item_id: "i1".into(),
/// #     received_qty: 50.0, damaged_qty: 10.0,
/// #     base_price_per_unit: 100.0, base_price_per_area: 0.0,
/// #     transport_percent: 5.0, transport_per_unit: 2.0, transport_total: 300.0,
/// #     purchase_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
/// #     vendor: None, notes: None, created_at: Utc::now(),
/// # };
/// let cost = landed_unit_cost(&lot, 15.5, TransportAllocationMode::Additive);
/// assert_eq!(cost.net_units, 40.0);
/// assert_eq!(cost.transport_cost, 14.5); // 5 + 2 + 300/40
/// assert_eq!(cost.final_unit_cost, 114.5);
/// ```
pub fn landed_unit_cost(
    lot: &PurchaseLot,
    units_per_area: f64,
    mode: TransportAllocationMode,
) -> LandedCost {
    let upa = if units_per_area > 0.0 {
        units_per_area
    } else {
        DEFAULT_UNITS_PER_AREA
    };

    let base = if lot.base_price_per_unit > 0.0 {
        lot.base_price_per_unit
    } else {
        lot.base_price_per_area.max(0.0) * upa
    };

    let net_units = (lot.received_qty.max(0.0) - lot.damaged_qty.max(0.0)).max(0.0);

    let pct_component = base * lot.transport_percent.max(0.0) / 100.0;
    let adder_component = lot.transport_per_unit.max(0.0);
    let alloc_component = if lot.transport_total > 0.0 && net_units > 0.0 {
        lot.transport_total / net_units
    } else {
        0.0
    };

    let transport = match mode {
        TransportAllocationMode::Additive => pct_component + adder_component + alloc_component,
        TransportAllocationMode::Percent => pct_component,
        TransportAllocationMode::PerUnit => adder_component + alloc_component,
    };

    LandedCost {
        base_cost: base,
        transport_cost: transport,
        final_unit_cost: base + transport,
        net_units,
    }
}

// =============================================================================
// Cost Strategies
// =============================================================================

/// Resolves "the" unit cost of an item from its lots at sale time.
///
/// Lots are passed in creation order (oldest first). Which lot costs a
/// sale is a policy decision, not a query-ordering accident, so it is
/// named and swappable here.
pub trait CostStrategy: Send + Sync {
    /// Current unit cost for an item, or 0.0 when no lot can price it.
    fn unit_cost(
        &self,
        lots: &[PurchaseLot],
        units_per_area: f64,
        mode: TransportAllocationMode,
    ) -> f64;

    /// Stable strategy name for logs.
    fn name(&self) -> &'static str;
}

/// Last-in cost basis: the most recently created lot prices the sale.
///
/// Lots whose base price resolves to zero are skipped (the source
/// skipped zero-cost rows before falling back), so a data-entry stub
/// cannot zero out the snapshot while an older priced lot exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastLotCostStrategy;

impl CostStrategy for LastLotCostStrategy {
    fn unit_cost(
        &self,
        lots: &[PurchaseLot],
        units_per_area: f64,
        mode: TransportAllocationMode,
    ) -> f64 {
        for lot in lots.iter().rev() {
            let cost = landed_unit_cost(lot, units_per_area, mode);
            if cost.base_cost > 0.0 {
                return cost.final_unit_cost;
            }
        }
        0.0
    }

    fn name(&self) -> &'static str {
        "last_lot"
    }
}

/// Net-quantity-weighted average landed cost across all lots.
///
/// `Σ (landed × net) / Σ net` over lots with positive net units.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedAverageCostStrategy;

impl CostStrategy for WeightedAverageCostStrategy {
    fn unit_cost(
        &self,
        lots: &[PurchaseLot],
        units_per_area: f64,
        mode: TransportAllocationMode,
    ) -> f64 {
        let mut cost_sum = 0.0;
        let mut qty_sum = 0.0;
        for lot in lots {
            let cost = landed_unit_cost(lot, units_per_area, mode);
            if cost.net_units > 0.0 {
                cost_sum += cost.final_unit_cost * cost.net_units;
                qty_sum += cost.net_units;
            }
        }
        if qty_sum > 0.0 {
            cost_sum / qty_sum
        } else {
            0.0
        }
    }

    fn name(&self) -> &'static str {
        "weighted_average"
    }
}

static LAST_LOT: LastLotCostStrategy = LastLotCostStrategy;
static WEIGHTED_AVERAGE: WeightedAverageCostStrategy = WeightedAverageCostStrategy;

impl crate::config::CostMethod {
    /// The strategy implementation for this configured method.
    pub fn strategy(&self) -> &'static dyn CostStrategy {
        match self {
            crate::config::CostMethod::LastLot => &LAST_LOT,
            crate::config::CostMethod::WeightedAverage => &WEIGHTED_AVERAGE,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn lot(received: f64, damaged: f64, per_unit: f64, per_area: f64) -> PurchaseLot {
        PurchaseLot {
            id: "l".into(),
            item_id: "i".into(),
            received_qty: received,
            damaged_qty: damaged,
            base_price_per_unit: per_unit,
            base_price_per_area: per_area,
            transport_percent: 0.0,
            transport_per_unit: 0.0,
            transport_total: 0.0,
            purchase_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            vendor: None,
            notes: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap(),
        }
    }

    /// The worked example from the engine's documentation.
    #[test]
    fn test_landed_cost_worked_example() {
        let mut l = lot(50.0, 10.0, 100.0, 0.0);
        l.transport_percent = 5.0;
        l.transport_per_unit = 2.0;
        l.transport_total = 300.0;

        let c = landed_unit_cost(&l, 15.5, TransportAllocationMode::Additive);
        assert_eq!(c.net_units, 40.0);
        assert_eq!(c.base_cost, 100.0);
        // 100*0.05 + 2 + 300/40 = 5 + 2 + 7.5
        assert_eq!(c.transport_cost, 14.5);
        assert_eq!(c.final_unit_cost, 114.5);
    }

    #[test]
    fn test_area_price_conversion() {
        let l = lot(10.0, 0.0, 0.0, 45.0);
        let c = landed_unit_cost(&l, 15.5, TransportAllocationMode::Additive);
        assert_eq!(c.base_cost, 45.0 * 15.5);
    }

    #[test]
    fn test_units_per_area_fallback_to_one() {
        let l = lot(10.0, 0.0, 0.0, 45.0);
        let c = landed_unit_cost(&l, 0.0, TransportAllocationMode::Additive);
        assert_eq!(c.base_cost, 45.0);
        let c = landed_unit_cost(&l, -3.0, TransportAllocationMode::Additive);
        assert_eq!(c.base_cost, 45.0);
    }

    #[test]
    fn test_zero_net_units_no_allocation() {
        let mut l = lot(10.0, 10.0, 100.0, 0.0);
        l.transport_total = 500.0;
        let c = landed_unit_cost(&l, 1.0, TransportAllocationMode::Additive);
        assert_eq!(c.net_units, 0.0);
        assert_eq!(c.transport_cost, 0.0);
        assert_eq!(c.final_unit_cost, 100.0);
    }

    #[test]
    fn test_per_unit_price_wins_over_area_price() {
        let l = lot(10.0, 0.0, 80.0, 45.0);
        let c = landed_unit_cost(&l, 15.5, TransportAllocationMode::Additive);
        assert_eq!(c.base_cost, 80.0);
    }

    #[test]
    fn test_transport_modes() {
        let mut l = lot(50.0, 10.0, 100.0, 0.0);
        l.transport_percent = 5.0;
        l.transport_per_unit = 2.0;
        l.transport_total = 300.0;

        let pct = landed_unit_cost(&l, 1.0, TransportAllocationMode::Percent);
        assert_eq!(pct.transport_cost, 5.0);

        let per_unit = landed_unit_cost(&l, 1.0, TransportAllocationMode::PerUnit);
        assert_eq!(per_unit.transport_cost, 9.5);
    }

    #[test]
    fn test_last_lot_strategy_uses_most_recent() {
        let lots = vec![lot(10.0, 0.0, 90.0, 0.0), lot(10.0, 0.0, 110.0, 0.0)];
        let cost = LastLotCostStrategy.unit_cost(&lots, 1.0, TransportAllocationMode::Additive);
        assert_eq!(cost, 110.0);
    }

    #[test]
    fn test_last_lot_strategy_skips_zero_cost_rows() {
        // A priced lot followed by an unpriced data-entry stub: the
        // stub must not zero out the snapshot.
        let lots = vec![lot(10.0, 0.0, 90.0, 0.0), lot(10.0, 0.0, 0.0, 0.0)];
        let cost = LastLotCostStrategy.unit_cost(&lots, 1.0, TransportAllocationMode::Additive);
        assert_eq!(cost, 90.0);
    }

    #[test]
    fn test_last_lot_strategy_empty() {
        let cost = LastLotCostStrategy.unit_cost(&[], 1.0, TransportAllocationMode::Additive);
        assert_eq!(cost, 0.0);
    }

    #[test]
    fn test_weighted_average_strategy() {
        // 10 units at 90 + 30 units at 110 => (900 + 3300) / 40 = 105
        let lots = vec![lot(10.0, 0.0, 90.0, 0.0), lot(30.0, 0.0, 110.0, 0.0)];
        let cost =
            WeightedAverageCostStrategy.unit_cost(&lots, 1.0, TransportAllocationMode::Additive);
        assert_eq!(cost, 105.0);
    }

    #[test]
    fn test_weighted_average_ignores_zero_net_lots() {
        let lots = vec![lot(10.0, 10.0, 500.0, 0.0), lot(30.0, 0.0, 110.0, 0.0)];
        let cost =
            WeightedAverageCostStrategy.unit_cost(&lots, 1.0, TransportAllocationMode::Additive);
        assert_eq!(cost, 110.0);
    }

    #[test]
    fn test_strategies_diverge() {
        let lots = vec![lot(30.0, 0.0, 90.0, 0.0), lot(10.0, 0.0, 130.0, 0.0)];
        let last = LastLotCostStrategy.unit_cost(&lots, 1.0, TransportAllocationMode::Additive);
        let avg =
            WeightedAverageCostStrategy.unit_cost(&lots, 1.0, TransportAllocationMode::Additive);
        assert_eq!(last, 130.0);
        assert_eq!(avg, 100.0);
        assert_ne!(last, avg);
    }
}
