//! # Error Types
//!
//! Domain-specific error types for tilepos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Error Types                             │
//! │                                                                 │
//! │  tilepos-core errors (this file)                                │
//! │  └── ValidationError  - strict input checks for NEW entries     │
//! │                                                                 │
//! │  tilepos-db errors (separate crate)                             │
//! │  ├── DbError          - database operation failures             │
//! │  └── EngineError      - ValidationError | DbError union         │
//! │                                                                 │
//! │  Flow: ValidationError → EngineError → caller                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The financial calculators themselves are total functions over
//! clamped inputs and never return errors; only the boundary that
//! accepts new lots/lines rejects bad data. Exceeding available stock
//! is NOT an error — see [`crate::validation::StockWarning`].

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Strict input validation failures.
///
/// Raised before any lot or line is persisted. The legacy cost
/// derivation path stays tolerant (clamping), but new entry points
/// must never silently clamp bad input.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A numeric field that must be >= 0 was negative.
    #[error("{field} must not be negative")]
    Negative { field: &'static str },

    /// A numeric field that must be > 0 was zero or negative.
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },

    /// Damaged quantity exceeds the received quantity of a lot.
    #[error("damaged quantity {damaged} exceeds received quantity {received}")]
    DamagedExceedsReceived { received: f64, damaged: f64 },

    /// Neither per-unit nor per-area base price was provided.
    #[error("a purchase lot needs a positive base_price_per_unit or base_price_per_area")]
    BasePriceMissing,

    /// Both base price fields were positive; exactly one is allowed.
    #[error("base_price_per_unit and base_price_per_area are both set; exactly one must be positive")]
    BasePriceConflict,

    /// A percentage field is outside its allowed range.
    #[error("{field} must not exceed {max}")]
    AboveMax { field: &'static str, max: f64 },

    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: &'static str },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with ValidationError.
pub type CoreResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ValidationError::DamagedExceedsReceived {
            received: 50.0,
            damaged: 60.0,
        };
        assert_eq!(
            err.to_string(),
            "damaged quantity 60 exceeds received quantity 50"
        );

        let err = ValidationError::Negative {
            field: "received_qty",
        };
        assert_eq!(err.to_string(), "received_qty must not be negative");
    }
}
