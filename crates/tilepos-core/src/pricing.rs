//! # Line-Item Pricer
//!
//! Computes a sale line's quantity and revenue, and manages the frozen
//! unit-cost snapshot.
//!
//! ## The Snapshot-Freezing Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  CREATE: snapshot := current lot cost        (always computed)  │
//! │  EDIT:   snapshot preserved if non-zero      (never recomputed) │
//! │          snapshot := current lot cost if 0   (backfilled ONCE)  │
//! │                                                                 │
//! │  This asymmetry is what keeps historical invoices immune to     │
//! │  later purchase-price changes.                                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use crate::money::{round_amount, round_qty};
use crate::types::QuantitySpec;
use crate::UNSET_COST_SNAPSHOT;

// =============================================================================
// Priced Line
// =============================================================================

/// The computed fields of a sale line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricedLine {
    /// Derived quantity (boxes/units), rounded to 3 decimals.
    pub quantity: f64,
    /// `quantity * sell_rate`, rounded to 2 decimals.
    pub line_revenue: f64,
    /// Frozen unit cost (0 when no lot could price the item).
    pub unit_cost_snapshot: f64,
    /// `quantity * unit_cost_snapshot`, rounded to 2 decimals.
    pub line_cost: f64,
}

// =============================================================================
// Quantity
// =============================================================================

/// Derives the sale quantity from a quantity spec.
///
/// Area mode divides the (clamped) area by the conversion ratio; a
/// non-positive ratio yields quantity 0 rather than a division error,
/// matching the source. Direct mode clamps at zero.
pub fn quantity_from_spec(spec: &QuantitySpec, units_per_area: f64) -> f64 {
    let qty = match *spec {
        QuantitySpec::Area {
            length,
            width,
            area_adjustment,
        } => {
            let area = (length * width + area_adjustment).max(0.0);
            if units_per_area > 0.0 {
                area / units_per_area
            } else {
                0.0
            }
        }
        QuantitySpec::Direct { quantity } => quantity.max(0.0),
    };
    round_qty(qty)
}

// =============================================================================
// Pricing
// =============================================================================

/// Prices a NEW sale line: the cost snapshot is always taken from the
/// current lot cost, even if it is zero (the unset sentinel is then
/// backfilled by a later edit).
pub fn price_new_line(spec: &QuantitySpec, sell_rate: f64, current_unit_cost: f64, units_per_area: f64) -> PricedLine {
    let quantity = quantity_from_spec(spec, units_per_area);
    PricedLine {
        quantity,
        line_revenue: round_amount(quantity * sell_rate),
        unit_cost_snapshot: current_unit_cost,
        line_cost: round_amount(quantity * current_unit_cost),
    }
}

/// Prices an EDITED sale line: quantity and revenue are recomputed,
/// but a non-zero snapshot is preserved. Only the unset sentinel is
/// backfilled from the current lot cost, exactly once.
pub fn price_edited_line(
    spec: &QuantitySpec,
    sell_rate: f64,
    existing_snapshot: f64,
    current_unit_cost: f64,
    units_per_area: f64,
) -> PricedLine {
    let quantity = quantity_from_spec(spec, units_per_area);
    let snapshot = if existing_snapshot > UNSET_COST_SNAPSHOT {
        existing_snapshot
    } else {
        current_unit_cost
    };
    PricedLine {
        quantity,
        line_revenue: round_amount(quantity * sell_rate),
        unit_cost_snapshot: snapshot,
        line_cost: round_amount(quantity * snapshot),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_quantity() {
        // (12.5 * 8 + 2) / 15.5 = 102 / 15.5 = 6.5806... -> 6.581
        let spec = QuantitySpec::Area {
            length: 12.5,
            width: 8.0,
            area_adjustment: 2.0,
        };
        assert_eq!(quantity_from_spec(&spec, 15.5), 6.581);
    }

    #[test]
    fn test_area_quantity_negative_adjustment_clamped() {
        let spec = QuantitySpec::Area {
            length: 2.0,
            width: 2.0,
            area_adjustment: -10.0,
        };
        assert_eq!(quantity_from_spec(&spec, 15.5), 0.0);
    }

    #[test]
    fn test_area_quantity_zero_ratio_yields_zero() {
        let spec = QuantitySpec::Area {
            length: 10.0,
            width: 10.0,
            area_adjustment: 0.0,
        };
        assert_eq!(quantity_from_spec(&spec, 0.0), 0.0);
    }

    #[test]
    fn test_direct_quantity() {
        let spec = QuantitySpec::Direct { quantity: 4.25 };
        assert_eq!(quantity_from_spec(&spec, 15.5), 4.25);
        let spec = QuantitySpec::Direct { quantity: -3.0 };
        assert_eq!(quantity_from_spec(&spec, 15.5), 0.0);
    }

    #[test]
    fn test_new_line_takes_current_cost() {
        let spec = QuantitySpec::Direct { quantity: 10.0 };
        let line = price_new_line(&spec, 150.0, 114.5, 1.0);
        assert_eq!(line.quantity, 10.0);
        assert_eq!(line.line_revenue, 1500.0);
        assert_eq!(line.unit_cost_snapshot, 114.5);
        assert_eq!(line.line_cost, 1145.0);
    }

    #[test]
    fn test_edit_preserves_nonzero_snapshot() {
        // Lot price changed to 130 after the sale; the frozen 114.5
        // must survive a quantity edit.
        let spec = QuantitySpec::Direct { quantity: 12.0 };
        let line = price_edited_line(&spec, 150.0, 114.5, 130.0, 1.0);
        assert_eq!(line.unit_cost_snapshot, 114.5);
        assert_eq!(line.line_cost, 1374.0);
        assert_eq!(line.line_revenue, 1800.0);
    }

    #[test]
    fn test_edit_backfills_unset_snapshot() {
        let spec = QuantitySpec::Direct { quantity: 12.0 };
        let line = price_edited_line(&spec, 150.0, 0.0, 130.0, 1.0);
        assert_eq!(line.unit_cost_snapshot, 130.0);
        assert_eq!(line.line_cost, 1560.0);
    }

    #[test]
    fn test_backfill_happens_once() {
        let spec = QuantitySpec::Direct { quantity: 5.0 };
        // First edit backfills from 130...
        let first = price_edited_line(&spec, 100.0, 0.0, 130.0, 1.0);
        assert_eq!(first.unit_cost_snapshot, 130.0);
        // ...second edit sees 130 and ignores the newer 145.
        let second = price_edited_line(&spec, 100.0, first.unit_cost_snapshot, 145.0, 1.0);
        assert_eq!(second.unit_cost_snapshot, 130.0);
    }
}
