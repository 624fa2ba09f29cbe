//! # Input Validation & Stock Warnings
//!
//! Strict checks applied to NEW lots and lines before persistence.
//! The cost derivation path itself stays tolerant of legacy rows (it
//! clamps); this module is the boundary where fresh bad input gets
//! rejected instead of clamped.
//!
//! Stock sufficiency is deliberately NOT an error: selling past
//! availability is allowed (back-orders happen on the shop floor) and
//! surfaces as a [`StockWarning`] the caller can show or log.

use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, ValidationError};
use crate::types::{PurchaseLot, QuantitySpec};

// =============================================================================
// Lot Validation
// =============================================================================

/// Validates a purchase lot before it is recorded.
///
/// Rules:
/// - `received_qty`, `damaged_qty` and all transport fields must be
///   non-negative
/// - `damaged_qty <= received_qty`
/// - exactly one of `base_price_per_unit` / `base_price_per_area` is
///   positive
/// - `transport_percent <= 100`
pub fn validate_new_lot(lot: &PurchaseLot) -> CoreResult<()> {
    if lot.item_id.trim().is_empty() {
        return Err(ValidationError::Required { field: "item_id" });
    }

    non_negative(lot.received_qty, "received_qty")?;
    non_negative(lot.damaged_qty, "damaged_qty")?;
    non_negative(lot.base_price_per_unit, "base_price_per_unit")?;
    non_negative(lot.base_price_per_area, "base_price_per_area")?;
    non_negative(lot.transport_percent, "transport_percent")?;
    non_negative(lot.transport_per_unit, "transport_per_unit")?;
    non_negative(lot.transport_total, "transport_total")?;

    if lot.damaged_qty > lot.received_qty {
        return Err(ValidationError::DamagedExceedsReceived {
            received: lot.received_qty,
            damaged: lot.damaged_qty,
        });
    }

    match (lot.base_price_per_unit > 0.0, lot.base_price_per_area > 0.0) {
        (false, false) => return Err(ValidationError::BasePriceMissing),
        (true, true) => return Err(ValidationError::BasePriceConflict),
        _ => {}
    }

    if lot.transport_percent > 100.0 {
        return Err(ValidationError::AboveMax {
            field: "transport_percent",
            max: 100.0,
        });
    }

    Ok(())
}

// =============================================================================
// Line Validation
// =============================================================================

/// Validates the quantity inputs of a new or edited sale line.
pub fn validate_quantity_spec(spec: &QuantitySpec) -> CoreResult<()> {
    match *spec {
        QuantitySpec::Area { length, width, .. } => {
            non_negative(length, "length")?;
            non_negative(width, "width")?;
            // area_adjustment may be negative (wastage deduction).
        }
        QuantitySpec::Direct { quantity } => {
            non_negative(quantity, "quantity")?;
        }
    }
    Ok(())
}

/// Validates a selling rate.
pub fn validate_sell_rate(sell_rate: f64) -> CoreResult<()> {
    non_negative(sell_rate, "sell_rate_per_unit")
}

fn non_negative(value: f64, field: &'static str) -> CoreResult<()> {
    if value < 0.0 {
        Err(ValidationError::Negative { field })
    } else {
        Ok(())
    }
}

// =============================================================================
// Stock Warning
// =============================================================================

/// Advisory raised when a sale line requests more than is available.
///
/// Never blocks the sale. `available` is the derived position at check
/// time; callers attach the warning to their response or log it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockWarning {
    pub requested: f64,
    pub available: f64,
}

impl StockWarning {
    /// Quantity the sale would go short by.
    #[inline]
    pub fn shortfall(&self) -> f64 {
        (self.requested - self.available).max(0.0)
    }
}

/// Checks a requested quantity against the available position.
///
/// Returns a warning only when stock is tracked (`available > 0`) and
/// the request exceeds it. Items with zero availability sell without a
/// warning, matching how untracked/legacy items behave.
pub fn check_stock(requested: f64, available: f64) -> Option<StockWarning> {
    if available > 0.0 && requested > available {
        Some(StockWarning {
            requested,
            available,
        })
    } else {
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn lot() -> PurchaseLot {
        PurchaseLot {
            id: "l1".into(),
            item_id: "i1".into(),
            received_qty: 50.0,
            damaged_qty: 2.0,
            base_price_per_unit: 100.0,
            base_price_per_area: 0.0,
            transport_percent: 10.0,
            transport_per_unit: 0.0,
            transport_total: 0.0,
            purchase_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            vendor: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_valid_lot() {
        assert_eq!(validate_new_lot(&lot()), Ok(()));
    }

    #[test]
    fn test_negative_received_rejected() {
        let mut l = lot();
        l.received_qty = -1.0;
        assert_eq!(
            validate_new_lot(&l),
            Err(ValidationError::Negative {
                field: "received_qty"
            })
        );
    }

    #[test]
    fn test_damaged_exceeds_received() {
        let mut l = lot();
        l.damaged_qty = 60.0;
        assert_eq!(
            validate_new_lot(&l),
            Err(ValidationError::DamagedExceedsReceived {
                received: 50.0,
                damaged: 60.0
            })
        );
    }

    #[test]
    fn test_base_price_exactly_one() {
        let mut l = lot();
        l.base_price_per_unit = 0.0;
        assert_eq!(validate_new_lot(&l), Err(ValidationError::BasePriceMissing));

        l.base_price_per_unit = 100.0;
        l.base_price_per_area = 6.5;
        assert_eq!(
            validate_new_lot(&l),
            Err(ValidationError::BasePriceConflict)
        );

        l.base_price_per_unit = 0.0;
        assert_eq!(validate_new_lot(&l), Ok(()));
    }

    #[test]
    fn test_transport_percent_capped() {
        let mut l = lot();
        l.transport_percent = 120.0;
        assert_eq!(
            validate_new_lot(&l),
            Err(ValidationError::AboveMax {
                field: "transport_percent",
                max: 100.0
            })
        );
    }

    #[test]
    fn test_quantity_spec() {
        assert!(validate_quantity_spec(&QuantitySpec::Direct { quantity: 3.0 }).is_ok());
        assert!(validate_quantity_spec(&QuantitySpec::Direct { quantity: -3.0 }).is_err());
        // Negative adjustment is allowed; negative dimensions are not.
        assert!(validate_quantity_spec(&QuantitySpec::Area {
            length: 10.0,
            width: 8.0,
            area_adjustment: -2.0
        })
        .is_ok());
        assert!(validate_quantity_spec(&QuantitySpec::Area {
            length: -10.0,
            width: 8.0,
            area_adjustment: 0.0
        })
        .is_err());
    }

    #[test]
    fn test_stock_warning_only_when_tracked_and_short() {
        assert_eq!(check_stock(5.0, 10.0), None);
        assert_eq!(check_stock(10.0, 10.0), None);
        let w = check_stock(12.0, 10.0).unwrap();
        assert_eq!(w.shortfall(), 2.0);
        // Zero availability means untracked: no warning.
        assert_eq!(check_stock(12.0, 0.0), None);
    }
}
