//! # Money Helpers
//!
//! Rounding and percentage helpers for the engine's financial math.
//!
//! ## Why f64 here?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Quantities in this domain are FRACTIONAL                       │
//! │                                                                 │
//! │    boxes = (length × width + adjustment) / sqft_per_box         │
//! │    e.g. (12.5 × 8.0 + 2.0) / 15.5 = 6.581 boxes                 │
//! │                                                                 │
//! │  Every monetary figure is quantity × rate over such values, so  │
//! │  the engine computes in f64 and rounds EXPLICITLY at the        │
//! │  persistence boundary: amounts to 2 decimals, quantities to 3.  │
//! │  Rounding is done once per stored figure, never mid-formula.    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Rounding
// =============================================================================

/// Rounds a monetary amount to 2 decimal places (half away from zero).
///
/// ## Example
/// ```rust
/// use tilepos_core::money::round_amount;
///
/// assert_eq!(round_amount(14.499), 14.5);
/// assert_eq!(round_amount(10.0 / 3.0), 3.33);
/// ```
#[inline]
pub fn round_amount(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Rounds a quantity (boxes/units) to 3 decimal places.
#[inline]
pub fn round_qty(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

// =============================================================================
// Percentages
// =============================================================================

/// Returns `pct` percent of `base` (unrounded).
///
/// ## Example
/// ```rust
/// use tilepos_core::money::pct_of;
///
/// assert_eq!(pct_of(1000.0, 10.0), 100.0);
/// ```
#[inline]
pub fn pct_of(base: f64, pct: f64) -> f64 {
    base * pct / 100.0
}

/// Clamps a value to be non-negative.
#[inline]
pub fn non_negative(v: f64) -> f64 {
    v.max(0.0)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_amount() {
        assert_eq!(round_amount(14.499), 14.5);
        assert_eq!(round_amount(10.0 / 3.0), 3.33);
        assert_eq!(round_amount(-2.346), -2.35);
        assert_eq!(round_amount(0.0), 0.0);
    }

    #[test]
    fn test_round_qty() {
        assert_eq!(round_qty(6.58064), 6.581);
        assert_eq!(round_qty(0.0004), 0.0);
    }

    #[test]
    fn test_pct_of() {
        assert_eq!(pct_of(1000.0, 10.0), 100.0);
        assert_eq!(pct_of(900.0, 18.0), 162.0);
        assert_eq!(pct_of(500.0, 0.0), 0.0);
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(non_negative(-3.0), 0.0);
        assert_eq!(non_negative(3.0), 3.0);
    }
}
