//! # Domain Types
//!
//! Core domain types for the TilePOS ledger engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                            │
//! │                                                                 │
//! │  ┌───────────────┐   ┌───────────────┐   ┌───────────────────┐  │
//! │  │     Item      │   │  PurchaseLot  │   │     Invoice       │  │
//! │  │ ───────────── │   │ ───────────── │   │ ───────────────── │  │
//! │  │ id (UUID)     │   │ item_id (FK)  │   │ invoice_no        │  │
//! │  │ kind tile/misc│   │ received_qty  │   │ discount/tax cfg  │  │
//! │  │ units_per_area│   │ price+freight │   │ derived totals    │  │
//! │  └───────────────┘   └───────────────┘   └───────────────────┘  │
//! │                                                                 │
//! │  ┌───────────────┐   ┌───────────────┐   ┌───────────────────┐  │
//! │  │   SaleLine    │   │  ReturnLine   │   │ CommissionLedger  │  │
//! │  │ ───────────── │   │ ───────────── │   │      Entry        │  │
//! │  │ quantity/rate │   │ sale_line_id  │   │ one per invoice   │  │
//! │  │ cost SNAPSHOT │   │ quantity      │   │ status workflow   │  │
//! │  └───────────────┘   └───────────────┘   └───────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! `SaleLine.unit_cost_snapshot` is frozen at creation time from the
//! item's current lot cost. Later purchase-price changes must never
//! alter historical profit, so edits preserve a non-zero snapshot and
//! only backfill the zero sentinel.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Item
// =============================================================================

/// Item category: tiles are priced per box with an area conversion,
/// miscellaneous goods are plain per-unit items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Tile: sold by box, quantity may be derived from area.
    Tile,
    /// Miscellaneous good: sold by direct unit count.
    Misc,
}

/// A stock-keeping item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Item {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tile or miscellaneous good.
    pub kind: ItemKind,

    /// Display name.
    pub name: String,

    /// Size label, e.g. "600x600" (tiles only).
    pub size_label: Option<String>,

    /// Units (boxes) per area unit, e.g. sqft-per-box.
    /// Values <= 0 are treated as 1 at computation time.
    pub units_per_area: f64,

    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Effective area conversion ratio, with the <= 0 fallback applied.
    #[inline]
    pub fn effective_units_per_area(&self) -> f64 {
        if self.units_per_area > 0.0 {
            self.units_per_area
        } else {
            crate::DEFAULT_UNITS_PER_AREA
        }
    }
}

// =============================================================================
// Purchase Lot
// =============================================================================

/// One receipt of stock for one item, carrying its own price and
/// transport terms.
///
/// Exactly one of `base_price_per_unit` / `base_price_per_area` should
/// be positive (enforced for new entries by
/// [`crate::validation::validate_new_lot`]; the cost derivation itself
/// is tolerant of legacy rows that violate this).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseLot {
    pub id: String,
    pub item_id: String,

    /// Boxes or units received.
    pub received_qty: f64,

    /// Boxes or units received damaged (0 <= damaged <= received).
    pub damaged_qty: f64,

    /// Direct base price per unit.
    pub base_price_per_unit: f64,

    /// Base price per area unit, converted via `units_per_area`.
    pub base_price_per_area: f64,

    /// Transport as a percentage of the base price.
    pub transport_percent: f64,

    /// Flat transport amount per unit.
    pub transport_per_unit: f64,

    /// Lot-wide transport amount, divided across net units.
    pub transport_total: f64,

    pub purchase_date: NaiveDate,
    pub vendor: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PurchaseLot {
    /// Received minus damaged, clamped to zero.
    #[inline]
    pub fn net_units(&self) -> f64 {
        (self.received_qty - self.damaged_qty).max(0.0)
    }
}

// =============================================================================
// Stock Position
// =============================================================================

/// Derived stock availability for one item. Never stored: recomputed
/// from lots, sale lines and return lines at every query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockPosition {
    /// Sum of (received - damaged) across all lots.
    pub received_net: f64,
    /// Sum of quantities across all non-voided sale lines.
    pub sold: f64,
    /// Sum of quantities across all return lines.
    pub returned: f64,
}

impl StockPosition {
    /// Available quantity: `max(0, received_net - sold + returned)`.
    #[inline]
    pub fn available(&self) -> f64 {
        (self.received_net - self.sold + self.returned).max(0.0)
    }
}

// =============================================================================
// Quantity Spec
// =============================================================================

/// How a sale line's quantity is specified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum QuantitySpec {
    /// Area mode: `quantity = max(0, length*width + adjustment) / units_per_area`.
    Area {
        length: f64,
        width: f64,
        area_adjustment: f64,
    },
    /// Direct quantity entry.
    Direct { quantity: f64 },
}

// =============================================================================
// Sale Line
// =============================================================================

/// One row of an invoice.
/// Uses the snapshot pattern to freeze the unit cost at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLine {
    pub id: String,
    pub invoice_id: String,
    pub item_id: String,

    /// Free-text purpose/room label carried from the source system.
    pub purpose: Option<String>,

    /// Area inputs (zero when quantity was entered directly).
    pub length: f64,
    pub width: f64,
    pub area_adjustment: f64,

    /// Derived or directly entered quantity (boxes/units, fractional).
    pub quantity: f64,

    /// Selling rate per unit.
    pub sell_rate_per_unit: f64,

    /// `quantity * sell_rate_per_unit`.
    pub line_revenue: f64,

    /// Unit cost frozen at creation (0 = unset sentinel, backfilled once).
    pub unit_cost_snapshot: f64,

    /// `quantity * unit_cost_snapshot`.
    pub line_cost: f64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SaleLine {
    /// True if the cost snapshot is still the unset sentinel.
    #[inline]
    pub fn snapshot_is_unset(&self) -> bool {
        self.unit_cost_snapshot <= crate::UNSET_COST_SNAPSHOT
    }
}

// =============================================================================
// Return Line
// =============================================================================

/// A returned portion of a sale line. Nets out both stock availability
/// and the reporting rollup (revenue and cost at the line's frozen
/// rates).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReturnLine {
    pub id: String,
    pub sale_line_id: String,
    pub invoice_id: String,
    pub item_id: String,
    pub quantity: f64,
    pub return_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Invoice Header
// =============================================================================

/// Discount entry mode on an invoice header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum DiscountKind {
    /// `discount_value` is a flat amount.
    Amount,
    /// `discount_value` is a percentage of the subtotal.
    Percent,
}

impl Default for DiscountKind {
    fn default() -> Self {
        DiscountKind::Amount
    }
}

/// Tax application mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum TaxMode {
    /// Prices include tax: no tax is added on top.
    Inclusive,
    /// Tax is added on top of the discounted base.
    Exclusive,
}

impl Default for TaxMode {
    fn default() -> Self {
        TaxMode::Exclusive
    }
}

/// An invoice header with its discount/tax/commission configuration and
/// the derived totals columns.
///
/// Totals are never patched incrementally: every mutating operation
/// recomputes them from the full current line set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: String,
    pub invoice_no: String,
    pub invoice_date: NaiveDate,
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,

    /// Salesperson the commission accrues to.
    pub salesperson: Option<String>,

    /// Per-invoice commission override; `None` falls back to the
    /// configured default for the salesperson.
    pub commission_percent_override: Option<f64>,

    pub discount_kind: DiscountKind,
    pub discount_value: f64,
    pub tax_mode: TaxMode,
    pub tax_percent: f64,

    // Derived totals (written back by the aggregator).
    pub subtotal: f64,
    pub discount_amount: f64,
    pub tax_amount: f64,
    pub total: f64,

    /// Voided invoices are excluded from stock and rollup figures.
    pub voided: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Commission Ledger
// =============================================================================

/// Commission workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum CommissionStatus {
    Pending,
    Approved,
    Paid,
    Cancelled,
}

impl Default for CommissionStatus {
    fn default() -> Self {
        CommissionStatus::Pending
    }
}

impl CommissionStatus {
    /// Whether an explicit transition to `next` is allowed.
    ///
    /// Paid is terminal except for cancellation; re-sync never touches
    /// status at all, only explicit transitions go through here.
    pub fn can_transition_to(self, next: CommissionStatus) -> bool {
        use CommissionStatus::*;
        match (self, next) {
            (a, b) if a == b => true,
            (Pending, Approved) | (Approved, Pending) => true,
            (Pending, Paid) | (Approved, Paid) => true,
            (_, Cancelled) => true,
            (Cancelled, Pending) => true,
            _ => false,
        }
    }
}

/// One commission ledger row per invoice (`invoice_id` is unique).
///
/// Upserted on every invoice mutation; the monetary fields are always
/// re-derived while `status` survives re-sync untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CommissionLedgerEntry {
    pub id: String,
    pub invoice_id: String,
    pub salesperson: Option<String>,

    /// Final invoice value the commission is computed from.
    pub base_amount: f64,

    /// Resolved percentage (override or default).
    pub percent: f64,

    /// `base_amount * percent / 100`, rounded to 2 decimals.
    pub amount: f64,

    pub status: CommissionStatus,

    /// Payment reference, set when marked Paid.
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub paid_on: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_net_units_clamped() {
        let lot = PurchaseLot {
            id: "l1".into(),
            item_id: "i1".into(),
            received_qty: 10.0,
            damaged_qty: 25.0,
            base_price_per_unit: 100.0,
            base_price_per_area: 0.0,
            transport_percent: 0.0,
            transport_per_unit: 0.0,
            transport_total: 0.0,
            purchase_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            vendor: None,
            notes: None,
            created_at: Utc::now(),
        };
        assert_eq!(lot.net_units(), 0.0);
    }

    #[test]
    fn test_stock_position_available_clamped() {
        let pos = StockPosition {
            received_net: 10.0,
            sold: 14.0,
            returned: 1.0,
        };
        assert_eq!(pos.available(), 0.0);

        let pos = StockPosition {
            received_net: 10.0,
            sold: 4.0,
            returned: 1.0,
        };
        assert_eq!(pos.available(), 7.0);
    }

    #[test]
    fn test_commission_status_transitions() {
        use CommissionStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Paid));
        assert!(Pending.can_transition_to(Paid));
        assert!(Paid.can_transition_to(Cancelled));
        assert!(!Paid.can_transition_to(Pending));
        assert!(!Paid.can_transition_to(Approved));
        assert!(Cancelled.can_transition_to(Pending));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(DiscountKind::default(), DiscountKind::Amount);
        assert_eq!(TaxMode::default(), TaxMode::Exclusive);
        assert_eq!(CommissionStatus::default(), CommissionStatus::Pending);
    }
}
