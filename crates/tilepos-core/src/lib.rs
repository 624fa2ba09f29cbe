//! # tilepos-core: Pure Business Logic for the TilePOS Ledger Engine
//!
//! This crate is the heart of the costing, pricing and commission
//! ledger. It contains all business logic as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     TilePOS Ledger Engine                       │
//! │                                                                 │
//! │  ┌───────────────────────────────────────────────────────────┐ │
//! │  │                 Callers (CRUD pages, reports)             │ │
//! │  └────────────────────────────┬──────────────────────────────┘ │
//! │                               │                                 │
//! │  ┌────────────────────────────▼──────────────────────────────┐ │
//! │  │             ★ tilepos-core (THIS CRATE) ★                 │ │
//! │  │                                                           │ │
//! │  │  ┌─────────┐ ┌─────────┐ ┌────────┐ ┌──────────┐ ┌──────┐│ │
//! │  │  │ costing │ │ pricing │ │ totals │ │commission│ │rollup││ │
//! │  │  └─────────┘ └─────────┘ └────────┘ └──────────┘ └──────┘│ │
//! │  │                                                           │ │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS      │ │
//! │  └────────────────────────────┬──────────────────────────────┘ │
//! │                               │                                 │
//! │  ┌────────────────────────────▼──────────────────────────────┐ │
//! │  │              tilepos-db (Database Layer)                  │ │
//! │  │        SQLite repositories, migrations, LedgerEngine      │ │
//! │  └───────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Item, PurchaseLot, SaleLine, Invoice, ...)
//! - [`money`] - Rounding/percentage helpers for financial f64 math
//! - [`error`] - Validation error types
//! - [`config`] - Engine configuration (policies, commission defaults)
//! - [`costing`] - Landed unit cost + cost strategies
//! - [`pricing`] - Line pricing with frozen cost snapshots
//! - [`totals`] - Invoice totals aggregation
//! - [`commission`] - Commission percent resolution and amounts
//! - [`rollup`] - Per-invoice financials and daily aggregation
//! - [`validation`] - Strict boundary validation for new entries
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: every function is deterministic
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Total financial math**: inputs are clamped (`max(0, ..)`), so the
//!    calculators themselves cannot fail; errors exist only at the
//!    validation boundary for new entries
//! 4. **Explicit errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod commission;
pub mod config;
pub mod costing;
pub mod error;
pub mod money;
pub mod pricing;
pub mod rollup;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use commission::{commission_amount, resolve_commission_percent};
pub use config::{CostMethod, EngineConfig, GrossReconstructionPolicy, TransportAllocationMode};
pub use costing::{landed_unit_cost, CostStrategy, LandedCost};
pub use error::{CoreResult, ValidationError};
pub use pricing::{price_edited_line, price_new_line, PricedLine};
pub use rollup::{DailyRollupRow, InvoiceFinancials};
pub use totals::{recompute_totals, Totals};
pub use types::*;
pub use validation::StockWarning;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Sentinel meaning "unit cost snapshot was never set".
///
/// A sale line created before any purchase lot existed carries a zero
/// snapshot; the next edit backfills it exactly once from the current
/// lot cost. Any non-zero snapshot is immutable.
pub const UNSET_COST_SNAPSHOT: f64 = 0.0;

/// Fallback conversion ratio when an item's `units_per_area` is zero or
/// negative: area-denominated prices are then read as unit-denominated.
pub const DEFAULT_UNITS_PER_AREA: f64 = 1.0;
