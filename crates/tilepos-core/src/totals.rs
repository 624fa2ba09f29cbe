//! # Invoice Totals Aggregator
//!
//! Full recomputation of an invoice's derived totals from its current
//! line set. Never patches incrementally: several call sites rely on
//! recomputation being idempotent.
//!
//! ## Formulas
//! ```text
//! subtotal     = Σ line_revenue                 (tile + misc lines)
//! discount     = PERCENT ? subtotal × v/100 : v
//! taxable_base = max(0, subtotal − discount)
//! tax          = EXCLUSIVE ? taxable_base × pct/100 : 0
//! total        = taxable_base + tax
//! ```

use serde::{Deserialize, Serialize};

use crate::money::{non_negative, pct_of, round_amount};
use crate::types::{DiscountKind, TaxMode};

// =============================================================================
// Totals
// =============================================================================

/// Derived invoice totals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: f64,
    pub discount_amount: f64,
    pub tax_amount: f64,
    pub total: f64,
}

/// Recomputes totals from the full current set of line revenues.
///
/// Pure and idempotent: recomputing twice with no line changes yields
/// identical totals.
///
/// ## Example
/// ```rust
/// use tilepos_core::totals::recompute_totals;
/// use tilepos_core::types::{DiscountKind, TaxMode};
///
/// let t = recompute_totals(&[600.0, 400.0], DiscountKind::Percent, 10.0, TaxMode::Exclusive, 18.0);
/// assert_eq!(t.subtotal, 1000.0);
/// assert_eq!(t.discount_amount, 100.0);
/// assert_eq!(t.tax_amount, 162.0);
/// assert_eq!(t.total, 1062.0);
/// ```
pub fn recompute_totals(
    line_revenues: &[f64],
    discount_kind: DiscountKind,
    discount_value: f64,
    tax_mode: TaxMode,
    tax_percent: f64,
) -> Totals {
    let subtotal: f64 = line_revenues.iter().sum();

    let discount = match discount_kind {
        DiscountKind::Percent => pct_of(subtotal, discount_value),
        DiscountKind::Amount => discount_value,
    };

    let taxable_base = non_negative(subtotal - discount);

    let tax = match tax_mode {
        TaxMode::Exclusive => pct_of(taxable_base, tax_percent),
        TaxMode::Inclusive => 0.0,
    };

    Totals {
        subtotal: round_amount(subtotal),
        discount_amount: round_amount(discount),
        tax_amount: round_amount(tax),
        total: round_amount(taxable_base + tax),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_discount_exclusive_tax() {
        let t = recompute_totals(
            &[600.0, 400.0],
            DiscountKind::Percent,
            10.0,
            TaxMode::Exclusive,
            18.0,
        );
        assert_eq!(t.subtotal, 1000.0);
        assert_eq!(t.discount_amount, 100.0);
        assert_eq!(t.tax_amount, 162.0);
        assert_eq!(t.total, 1062.0);
    }

    #[test]
    fn test_inclusive_tax_adds_nothing() {
        let t = recompute_totals(
            &[600.0, 400.0],
            DiscountKind::Percent,
            10.0,
            TaxMode::Inclusive,
            18.0,
        );
        assert_eq!(t.tax_amount, 0.0);
        assert_eq!(t.total, 900.0);
    }

    #[test]
    fn test_amount_discount() {
        let t = recompute_totals(
            &[500.0],
            DiscountKind::Amount,
            50.0,
            TaxMode::Inclusive,
            0.0,
        );
        assert_eq!(t.discount_amount, 50.0);
        assert_eq!(t.total, 450.0);
    }

    #[test]
    fn test_discount_larger_than_subtotal_clamps_base() {
        let t = recompute_totals(
            &[100.0],
            DiscountKind::Amount,
            250.0,
            TaxMode::Exclusive,
            18.0,
        );
        assert_eq!(t.discount_amount, 250.0);
        assert_eq!(t.tax_amount, 0.0);
        assert_eq!(t.total, 0.0);
    }

    #[test]
    fn test_empty_invoice() {
        let t = recompute_totals(&[], DiscountKind::Amount, 0.0, TaxMode::Exclusive, 18.0);
        assert_eq!(t, Totals::default());
    }

    /// Recomputing twice with no line changes must be a no-op.
    #[test]
    fn test_idempotent() {
        let lines = [123.45, 678.9, 0.65];
        let a = recompute_totals(&lines, DiscountKind::Percent, 7.5, TaxMode::Exclusive, 18.0);
        let b = recompute_totals(&lines, DiscountKind::Percent, 7.5, TaxMode::Exclusive, 18.0);
        assert_eq!(a, b);
    }
}
