//! # Ledger Engine
//!
//! The service facade that ties the pure math in tilepos-core to the
//! repositories. It owns the two discipline points every invoice
//! mutation must respect:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  1. ONE TRANSACTION per mutation:                               │
//! │       write line → recompute totals → sync commission ledger    │
//! │     Either all of it commits or none of it does; the ledger     │
//! │     can never disagree with the invoice it mirrors.             │
//! │                                                                 │
//! │  2. ONE LOCK per item for stock-affecting writes:               │
//! │       two concurrent sales of the same item serialize, so the   │
//! │     oversell check and the insert see the same stock snapshot.  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Exceeding available stock is a warning, not an error: the shop
//! floor sells from pallets that data entry hasn't caught up with.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::pool::Database;
use crate::repository::commission::CommissionRepository;
use crate::repository::invoice::InvoiceRepository;
use crate::repository::item::ItemRepository;
use crate::repository::lot::LotRepository;
use crate::repository::stock::StockRepository;
use tilepos_core::{
    commission_amount, price_edited_line, price_new_line, recompute_totals,
    resolve_commission_percent, rollup,
    validation::{self, check_stock, StockWarning},
    CommissionLedgerEntry, CommissionStatus, DiscountKind, EngineConfig, Invoice, Item, ItemKind,
    PurchaseLot, QuantitySpec, ReturnLine, SaleLine, StockPosition, TaxMode, ValidationError,
};

// =============================================================================
// Operation Inputs
// =============================================================================

/// Input for [`LedgerEngine::create_item`].
#[derive(Debug, Clone)]
pub struct NewItem {
    pub kind: ItemKind,
    pub name: String,
    pub size_label: Option<String>,
    /// Boxes per area unit; <= 0 falls back to 1 at computation time.
    pub units_per_area: f64,
}

/// Input for [`LedgerEngine::record_lot`].
#[derive(Debug, Clone)]
pub struct NewLot {
    pub item_id: String,
    pub received_qty: f64,
    pub damaged_qty: f64,
    pub base_price_per_unit: f64,
    pub base_price_per_area: f64,
    pub transport_percent: f64,
    pub transport_per_unit: f64,
    pub transport_total: f64,
    pub purchase_date: NaiveDate,
    pub vendor: Option<String>,
    pub notes: Option<String>,
}

/// Input for [`LedgerEngine::update_lot`]: every editable field of a
/// lot. The lot's item and creation time are fixed.
#[derive(Debug, Clone)]
pub struct LotUpdate {
    pub received_qty: f64,
    pub damaged_qty: f64,
    pub base_price_per_unit: f64,
    pub base_price_per_area: f64,
    pub transport_percent: f64,
    pub transport_per_unit: f64,
    pub transport_total: f64,
    pub purchase_date: NaiveDate,
    pub vendor: Option<String>,
    pub notes: Option<String>,
}

/// Input for [`LedgerEngine::create_invoice`].
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_no: String,
    pub invoice_date: NaiveDate,
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub salesperson: Option<String>,
    pub commission_percent_override: Option<f64>,
    pub discount_kind: DiscountKind,
    pub discount_value: f64,
    pub tax_mode: TaxMode,
    pub tax_percent: f64,
}

/// Input for [`LedgerEngine::add_line`].
#[derive(Debug, Clone)]
pub struct LineInput {
    pub item_id: String,
    pub purpose: Option<String>,
    pub spec: QuantitySpec,
    pub sell_rate_per_unit: f64,
}

/// Input for [`LedgerEngine::edit_line`]. The line's item is fixed;
/// to change the item, delete the line and add a new one.
#[derive(Debug, Clone)]
pub struct LineEdit {
    pub purpose: Option<String>,
    pub spec: QuantitySpec,
    pub sell_rate_per_unit: f64,
}

/// Input for [`LedgerEngine::record_return`].
#[derive(Debug, Clone)]
pub struct NewReturn {
    pub sale_line_id: String,
    pub quantity: f64,
    pub return_date: NaiveDate,
}

// =============================================================================
// Ledger Engine
// =============================================================================

/// Service facade over the ledger database.
///
/// Cheap to clone is NOT a goal here: hold one engine per process and
/// share it behind an `Arc` if needed. The per-item lock map must be
/// shared for the oversell serialization to mean anything.
pub struct LedgerEngine {
    db: Database,
    config: EngineConfig,
    /// One async mutex per item id, created lazily.
    item_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl LedgerEngine {
    /// Creates an engine over an initialized database.
    pub fn new(db: Database, config: EngineConfig) -> Self {
        info!(
            cost_method = config.cost_method.strategy().name(),
            default_commission_percent = config.default_commission_percent,
            "Ledger engine initialized"
        );
        LedgerEngine {
            db,
            config,
            item_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying database handle.
    pub fn db(&self) -> &Database {
        &self.db
    }

    fn item_lock(&self, item_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.item_locks.lock().expect("item lock map poisoned");
        locks
            .entry(item_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    // =========================================================================
    // Items & Lots
    // =========================================================================

    /// Creates a stock-keeping item.
    pub async fn create_item(&self, input: NewItem) -> EngineResult<Item> {
        if input.name.trim().is_empty() {
            return Err(ValidationError::Required { field: "name" }.into());
        }
        if input.units_per_area < 0.0 {
            return Err(ValidationError::Negative {
                field: "units_per_area",
            }
            .into());
        }

        let item = Item {
            id: Uuid::new_v4().to_string(),
            kind: input.kind,
            name: input.name,
            size_label: input.size_label,
            units_per_area: input.units_per_area,
            created_at: Utc::now(),
        };

        let mut conn = self.db.pool().acquire().await?;
        ItemRepository::insert_tx(&mut conn, &item).await?;

        Ok(item)
    }

    /// Records a purchase lot after strict validation.
    pub async fn record_lot(&self, input: NewLot) -> EngineResult<PurchaseLot> {
        let lot = PurchaseLot {
            id: Uuid::new_v4().to_string(),
            item_id: input.item_id,
            received_qty: input.received_qty,
            damaged_qty: input.damaged_qty,
            base_price_per_unit: input.base_price_per_unit,
            base_price_per_area: input.base_price_per_area,
            transport_percent: input.transport_percent,
            transport_per_unit: input.transport_per_unit,
            transport_total: input.transport_total,
            purchase_date: input.purchase_date,
            vendor: input.vendor,
            notes: input.notes,
            created_at: Utc::now(),
        };
        validation::validate_new_lot(&lot)?;

        let mut conn = self.db.pool().acquire().await?;
        let item = ItemRepository::require_tx(&mut conn, &lot.item_id).await?;
        LotRepository::insert_tx(&mut conn, &lot).await?;

        let landed = tilepos_core::landed_unit_cost(
            &lot,
            item.effective_units_per_area(),
            self.config.transport_allocation_mode,
        );
        debug!(
            lot_id = %lot.id,
            item_id = %lot.item_id,
            landed_unit_cost = landed.final_unit_cost,
            "Purchase lot recorded"
        );

        Ok(lot)
    }

    /// Corrective edit of an existing lot.
    ///
    /// Changes future cost resolution and availability; sale lines
    /// already priced from this lot keep their frozen snapshots and
    /// are financially unaffected.
    pub async fn update_lot(&self, lot_id: &str, input: LotUpdate) -> EngineResult<PurchaseLot> {
        // Lock keyed by the lot's item; requires a peek outside the
        // lock so the lock-then-connection order matches the line ops.
        let existing = {
            let mut conn = self.db.pool().acquire().await?;
            LotRepository::require_tx(&mut conn, lot_id).await?
        };

        let lot = PurchaseLot {
            id: existing.id,
            item_id: existing.item_id,
            received_qty: input.received_qty,
            damaged_qty: input.damaged_qty,
            base_price_per_unit: input.base_price_per_unit,
            base_price_per_area: input.base_price_per_area,
            transport_percent: input.transport_percent,
            transport_per_unit: input.transport_per_unit,
            transport_total: input.transport_total,
            purchase_date: input.purchase_date,
            vendor: input.vendor,
            notes: input.notes,
            created_at: existing.created_at,
        };
        validation::validate_new_lot(&lot)?;

        let lock = self.item_lock(&lot.item_id);
        let _guard = lock.lock().await;

        let mut conn = self.db.pool().acquire().await?;
        LotRepository::update_tx(&mut conn, &lot).await?;

        Ok(lot)
    }

    /// Current unit cost of an item under the configured cost method.
    pub async fn current_unit_cost(&self, item_id: &str) -> EngineResult<f64> {
        let mut conn = self.db.pool().acquire().await?;
        let item = ItemRepository::require_tx(&mut conn, item_id).await?;
        let lots = LotRepository::list_for_item_tx(&mut conn, item_id).await?;
        Ok(self.unit_cost_from(&item, &lots))
    }

    fn unit_cost_from(&self, item: &Item, lots: &[PurchaseLot]) -> f64 {
        self.config.cost_method.strategy().unit_cost(
            lots,
            item.effective_units_per_area(),
            self.config.transport_allocation_mode,
        )
    }

    // =========================================================================
    // Stock
    // =========================================================================

    /// Derived stock position for an item.
    pub async fn stock_position(&self, item_id: &str) -> EngineResult<StockPosition> {
        Ok(self.db.stock().position(item_id).await?)
    }

    /// Available quantity for an item.
    pub async fn available(&self, item_id: &str) -> EngineResult<f64> {
        Ok(self.db.stock().available(item_id).await?)
    }

    // =========================================================================
    // Invoices
    // =========================================================================

    /// Creates an invoice header (and its commission ledger row).
    pub async fn create_invoice(&self, input: NewInvoice) -> EngineResult<Invoice> {
        if input.invoice_no.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "invoice_no",
            }
            .into());
        }
        if input.discount_value < 0.0 {
            return Err(ValidationError::Negative {
                field: "discount_value",
            }
            .into());
        }
        if input.tax_percent < 0.0 {
            return Err(ValidationError::Negative {
                field: "tax_percent",
            }
            .into());
        }
        if input.tax_percent > 100.0 {
            return Err(ValidationError::AboveMax {
                field: "tax_percent",
                max: 100.0,
            }
            .into());
        }

        let now = Utc::now();
        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            invoice_no: input.invoice_no,
            invoice_date: input.invoice_date,
            customer_name: input.customer_name,
            phone: input.phone,
            notes: input.notes,
            salesperson: input.salesperson,
            commission_percent_override: input.commission_percent_override,
            discount_kind: input.discount_kind,
            discount_value: input.discount_value,
            tax_mode: input.tax_mode,
            tax_percent: input.tax_percent,
            subtotal: 0.0,
            discount_amount: 0.0,
            tax_amount: 0.0,
            total: 0.0,
            voided: false,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.pool().begin().await?;
        InvoiceRepository::insert_tx(&mut tx, &invoice).await?;
        self.sync_commission_tx(&mut tx, &invoice).await?;
        tx.commit().await?;

        info!(id = %invoice.id, invoice_no = %invoice.invoice_no, "Invoice created");
        Ok(invoice)
    }

    /// Adds a sale line.
    ///
    /// Returns the persisted line and an oversell warning when the
    /// requested quantity exceeds tracked availability. The warning
    /// never blocks the sale.
    pub async fn add_line(
        &self,
        invoice_id: &str,
        input: LineInput,
    ) -> EngineResult<(SaleLine, Option<StockWarning>)> {
        validation::validate_quantity_spec(&input.spec)?;
        validation::validate_sell_rate(input.sell_rate_per_unit)?;

        let lock = self.item_lock(&input.item_id);
        let _guard = lock.lock().await;

        let mut tx = self.db.pool().begin().await?;

        let invoice = InvoiceRepository::require_tx(&mut tx, invoice_id).await?;
        Self::reject_voided(&invoice)?;

        let item = ItemRepository::require_tx(&mut tx, &input.item_id).await?;
        let lots = LotRepository::list_for_item_tx(&mut tx, &input.item_id).await?;
        let current_cost = self.unit_cost_from(&item, &lots);

        let priced = price_new_line(
            &input.spec,
            input.sell_rate_per_unit,
            current_cost,
            item.effective_units_per_area(),
        );

        let position = StockRepository::position_tx(&mut tx, &input.item_id).await?;
        let warning = check_stock(priced.quantity, position.available());
        if let Some(w) = warning {
            warn!(
                item_id = %input.item_id,
                requested = w.requested,
                available = w.available,
                "Sale exceeds tracked stock"
            );
        }

        let (length, width, area_adjustment) = spec_fields(&input.spec);
        let now = Utc::now();
        let line = SaleLine {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice.id.clone(),
            item_id: input.item_id,
            purpose: input.purpose,
            length,
            width,
            area_adjustment,
            quantity: priced.quantity,
            sell_rate_per_unit: input.sell_rate_per_unit,
            line_revenue: priced.line_revenue,
            unit_cost_snapshot: priced.unit_cost_snapshot,
            line_cost: priced.line_cost,
            created_at: now,
            updated_at: now,
        };

        InvoiceRepository::insert_line_tx(&mut tx, &line).await?;
        self.recompute_and_sync_tx(&mut tx, &invoice.id).await?;
        tx.commit().await?;

        Ok((line, warning))
    }

    /// Edits a sale line. Quantity and revenue are recomputed; a
    /// non-zero cost snapshot is preserved, the zero sentinel is
    /// backfilled once from the current lot cost.
    pub async fn edit_line(
        &self,
        line_id: &str,
        input: LineEdit,
    ) -> EngineResult<(SaleLine, Option<StockWarning>)> {
        validation::validate_quantity_spec(&input.spec)?;
        validation::validate_sell_rate(input.sell_rate_per_unit)?;

        // Lock keyed by the line's item; requires a peek outside the
        // transaction.
        let peek = self
            .db
            .invoices()
            .get_line(line_id)
            .await?
            .ok_or_else(|| crate::error::DbError::not_found("SaleLine", line_id))?;
        let lock = self.item_lock(&peek.item_id);
        let _guard = lock.lock().await;

        let mut tx = self.db.pool().begin().await?;

        let mut line = InvoiceRepository::require_line_tx(&mut tx, line_id).await?;
        let invoice = InvoiceRepository::require_tx(&mut tx, &line.invoice_id).await?;
        Self::reject_voided(&invoice)?;

        let item = ItemRepository::require_tx(&mut tx, &line.item_id).await?;
        let lots = LotRepository::list_for_item_tx(&mut tx, &line.item_id).await?;
        let current_cost = self.unit_cost_from(&item, &lots);

        let priced = price_edited_line(
            &input.spec,
            input.sell_rate_per_unit,
            line.unit_cost_snapshot,
            current_cost,
            item.effective_units_per_area(),
        );

        // The line's own previous quantity is still counted as sold in
        // the derived position, so it is available to this edit.
        let position = StockRepository::position_tx(&mut tx, &line.item_id).await?;
        let warning = check_stock(priced.quantity, position.available() + line.quantity);
        if let Some(w) = warning {
            warn!(
                item_id = %line.item_id,
                requested = w.requested,
                available = w.available,
                "Edited line exceeds tracked stock"
            );
        }

        let (length, width, area_adjustment) = spec_fields(&input.spec);
        line.purpose = input.purpose;
        line.length = length;
        line.width = width;
        line.area_adjustment = area_adjustment;
        line.quantity = priced.quantity;
        line.sell_rate_per_unit = input.sell_rate_per_unit;
        line.line_revenue = priced.line_revenue;
        line.unit_cost_snapshot = priced.unit_cost_snapshot;
        line.line_cost = priced.line_cost;
        line.updated_at = Utc::now();

        InvoiceRepository::update_line_tx(&mut tx, &line).await?;
        self.recompute_and_sync_tx(&mut tx, &line.invoice_id).await?;
        tx.commit().await?;

        Ok((line, warning))
    }

    /// Deletes a sale line and re-derives totals and commission.
    pub async fn delete_line(&self, line_id: &str) -> EngineResult<()> {
        let mut tx = self.db.pool().begin().await?;

        let line = InvoiceRepository::require_line_tx(&mut tx, line_id).await?;
        let invoice = InvoiceRepository::require_tx(&mut tx, &line.invoice_id).await?;
        Self::reject_voided(&invoice)?;

        InvoiceRepository::delete_line_tx(&mut tx, line_id).await?;
        self.recompute_and_sync_tx(&mut tx, &line.invoice_id).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Changes the discount/tax configuration and re-derives totals.
    pub async fn set_discount_tax(
        &self,
        invoice_id: &str,
        discount_kind: DiscountKind,
        discount_value: f64,
        tax_mode: TaxMode,
        tax_percent: f64,
    ) -> EngineResult<Invoice> {
        if discount_value < 0.0 {
            return Err(ValidationError::Negative {
                field: "discount_value",
            }
            .into());
        }
        if tax_percent < 0.0 {
            return Err(ValidationError::Negative {
                field: "tax_percent",
            }
            .into());
        }
        if tax_percent > 100.0 {
            return Err(ValidationError::AboveMax {
                field: "tax_percent",
                max: 100.0,
            }
            .into());
        }

        let mut tx = self.db.pool().begin().await?;

        let invoice = InvoiceRepository::require_tx(&mut tx, invoice_id).await?;
        Self::reject_voided(&invoice)?;

        InvoiceRepository::update_discount_tax_tx(
            &mut tx,
            invoice_id,
            discount_kind,
            discount_value,
            tax_mode,
            tax_percent,
        )
        .await?;
        let invoice = self.recompute_and_sync_tx(&mut tx, invoice_id).await?;
        tx.commit().await?;

        Ok(invoice)
    }

    /// Changes the salesperson / commission override and re-syncs the
    /// ledger row (the commission base does not change, the percent
    /// resolution might).
    pub async fn set_sales_meta(
        &self,
        invoice_id: &str,
        salesperson: Option<String>,
        commission_percent_override: Option<f64>,
    ) -> EngineResult<Invoice> {
        if let Some(pct) = commission_percent_override {
            if pct < 0.0 {
                return Err(ValidationError::Negative {
                    field: "commission_percent_override",
                }
                .into());
            }
        }

        let mut tx = self.db.pool().begin().await?;

        let invoice = InvoiceRepository::require_tx(&mut tx, invoice_id).await?;
        Self::reject_voided(&invoice)?;

        InvoiceRepository::update_sales_meta_tx(
            &mut tx,
            invoice_id,
            salesperson.as_deref(),
            commission_percent_override,
        )
        .await?;
        let invoice = InvoiceRepository::require_tx(&mut tx, invoice_id).await?;
        self.sync_commission_tx(&mut tx, &invoice).await?;
        tx.commit().await?;

        Ok(invoice)
    }

    /// Voids or unvoids an invoice.
    ///
    /// A voided invoice's lines stop counting as sold, and its
    /// commission base drops to zero (the ledger row stays, status
    /// preserved). Unvoiding restores both.
    pub async fn set_voided(&self, invoice_id: &str, voided: bool) -> EngineResult<Invoice> {
        let mut tx = self.db.pool().begin().await?;

        InvoiceRepository::set_voided_tx(&mut tx, invoice_id, voided).await?;
        let invoice = InvoiceRepository::require_tx(&mut tx, invoice_id).await?;
        self.sync_commission_tx(&mut tx, &invoice).await?;
        tx.commit().await?;

        info!(id = %invoice_id, voided, "Invoice void flag changed");
        Ok(invoice)
    }

    /// Recomputes an invoice's totals from its full current line set
    /// and re-syncs the commission row.
    ///
    /// Idempotent; every line mutation already runs this internally,
    /// so the public form exists to repair a header whose stored
    /// totals have drifted (manual SQL, partial restore).
    pub async fn recompute_totals(&self, invoice_id: &str) -> EngineResult<Invoice> {
        let mut tx = self.db.pool().begin().await?;
        let invoice = self.recompute_and_sync_tx(&mut tx, invoice_id).await?;
        tx.commit().await?;

        Ok(invoice)
    }

    // =========================================================================
    // Returns
    // =========================================================================

    /// Records a return against a sale line.
    ///
    /// Returns restock the item and net out of the reporting rollup at
    /// the line's frozen rates; invoice totals are NOT rewritten.
    pub async fn record_return(&self, input: NewReturn) -> EngineResult<ReturnLine> {
        if input.quantity <= 0.0 {
            return Err(ValidationError::NotPositive { field: "quantity" }.into());
        }

        // Lock keyed by the line's item; requires a peek outside the
        // transaction.
        let line = self
            .db
            .invoices()
            .get_line(&input.sale_line_id)
            .await?
            .ok_or_else(|| crate::error::DbError::not_found("SaleLine", &input.sale_line_id))?;
        let lock = self.item_lock(&line.item_id);
        let _guard = lock.lock().await;

        let mut tx = self.db.pool().begin().await?;

        let line = InvoiceRepository::require_line_tx(&mut tx, &input.sale_line_id).await?;
        let invoice = InvoiceRepository::require_tx(&mut tx, &line.invoice_id).await?;
        Self::reject_voided(&invoice)?;

        let already_returned =
            InvoiceRepository::returned_qty_for_line_tx(&mut tx, &line.id).await?;
        let remaining = (line.quantity - already_returned).max(0.0);
        if input.quantity > remaining {
            return Err(ValidationError::AboveMax {
                field: "quantity",
                max: remaining,
            }
            .into());
        }

        let ret = ReturnLine {
            id: Uuid::new_v4().to_string(),
            sale_line_id: line.id.clone(),
            invoice_id: line.invoice_id.clone(),
            item_id: line.item_id.clone(),
            quantity: input.quantity,
            return_date: input.return_date,
            created_at: Utc::now(),
        };

        InvoiceRepository::insert_return_tx(&mut tx, &ret).await?;
        tx.commit().await?;

        info!(id = %ret.id, sale_line_id = %ret.sale_line_id, quantity = ret.quantity, "Return recorded");
        Ok(ret)
    }

    // =========================================================================
    // Commission Ledger
    // =========================================================================

    /// Re-syncs one invoice's commission ledger row on demand.
    ///
    /// Totals are recomputed from the full line set first, so a
    /// drifted stored total can never leak into the commission base.
    pub async fn sync_commission(&self, invoice_id: &str) -> EngineResult<CommissionLedgerEntry> {
        let mut tx = self.db.pool().begin().await?;

        self.recompute_and_sync_tx(&mut tx, invoice_id).await?;
        let entry = CommissionRepository::get_by_invoice_tx(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| crate::error::DbError::not_found("CommissionLedgerEntry", invoice_id))?;
        tx.commit().await?;

        Ok(entry)
    }

    /// Moves the commission row through its workflow.
    ///
    /// `reference` is stored alongside the transition (payment slip
    /// number, bank reference); moving to Paid stamps `paid_on`.
    pub async fn set_commission_status(
        &self,
        invoice_id: &str,
        next: CommissionStatus,
        reference: Option<String>,
    ) -> EngineResult<CommissionLedgerEntry> {
        let mut tx = self.db.pool().begin().await?;

        let entry = CommissionRepository::get_by_invoice_tx(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| crate::error::DbError::not_found("CommissionLedgerEntry", invoice_id))?;

        if !entry.status.can_transition_to(next) {
            return Err(EngineError::InvalidStatusTransition {
                invoice_id: invoice_id.to_string(),
                from: entry.status,
                to: next,
            });
        }

        let paid_on = match next {
            CommissionStatus::Paid => Some(Utc::now()),
            _ => None,
        };
        CommissionRepository::set_status_tx(&mut tx, invoice_id, next, reference.as_deref(), paid_on)
            .await?;
        let entry = CommissionRepository::get_by_invoice_tx(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| crate::error::DbError::not_found("CommissionLedgerEntry", invoice_id))?;
        tx.commit().await?;

        info!(invoice_id, status = ?next, "Commission status changed");
        Ok(entry)
    }

    /// Re-derives totals and commission rows for every non-voided
    /// invoice with `from <= invoice_date < to`. Returns the number of
    /// invoices touched. For repairing ledgers after a config change.
    pub async fn recompute_commission_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<usize> {
        let mut tx = self.db.pool().begin().await?;

        let invoices = InvoiceRepository::list_range_tx(&mut tx, from, to).await?;
        let count = invoices.len();
        for invoice in &invoices {
            self.recompute_and_sync_tx(&mut tx, &invoice.id).await?;
        }
        tx.commit().await?;

        info!(%from, %to, count, "Commission range recomputed");
        Ok(count)
    }

    // =========================================================================
    // Reporting
    // =========================================================================

    /// Financial figures for a single invoice. A voided invoice
    /// reports all-zero figures, matching its exclusion from the
    /// daily rollup.
    pub async fn invoice_financials(
        &self,
        invoice_id: &str,
    ) -> EngineResult<rollup::InvoiceFinancials> {
        let mut conn = self.db.pool().acquire().await?;

        let invoice = InvoiceRepository::require_tx(&mut conn, invoice_id).await?;
        let lines = InvoiceRepository::list_lines_tx(&mut conn, invoice_id).await?;
        let returns = InvoiceRepository::list_returns_tx(&mut conn, invoice_id).await?;

        Ok(self.financials_for(&invoice, &lines, &returns))
    }

    /// Daily rollup across `[from, to)`, voided invoices excluded.
    pub async fn daily_rollup(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<rollup::DailyRollupRow>> {
        let mut conn = self.db.pool().acquire().await?;

        let invoices = InvoiceRepository::list_range_tx(&mut conn, from, to).await?;
        let mut entries = Vec::with_capacity(invoices.len());
        for invoice in &invoices {
            let lines = InvoiceRepository::list_lines_tx(&mut conn, &invoice.id).await?;
            let returns = InvoiceRepository::list_returns_tx(&mut conn, &invoice.id).await?;
            entries.push((
                invoice.invoice_date,
                self.financials_for(invoice, &lines, &returns),
            ));
        }

        Ok(rollup::daily_rollup(entries))
    }

    fn financials_for(
        &self,
        invoice: &Invoice,
        lines: &[SaleLine],
        returns: &[ReturnLine],
    ) -> rollup::InvoiceFinancials {
        // Voided invoices contribute nothing to any report.
        if invoice.voided {
            return rollup::InvoiceFinancials::default();
        }

        let percent = resolve_commission_percent(
            invoice.commission_percent_override,
            invoice.salesperson.as_deref(),
            &self.config,
        );
        rollup::invoice_financials(
            invoice,
            lines,
            returns,
            percent,
            self.config.gross_reconstruction_policy,
        )
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn reject_voided(invoice: &Invoice) -> EngineResult<()> {
        if invoice.voided {
            return Err(EngineError::InvoiceVoided {
                id: invoice.id.clone(),
            });
        }
        Ok(())
    }

    /// Recomputes totals from the invoice's full line set, writes them
    /// back, and syncs the commission row. The tail of every mutation.
    async fn recompute_and_sync_tx(
        &self,
        conn: &mut SqliteConnection,
        invoice_id: &str,
    ) -> EngineResult<Invoice> {
        let invoice = InvoiceRepository::require_tx(&mut *conn, invoice_id).await?;
        let lines = InvoiceRepository::list_lines_tx(&mut *conn, invoice_id).await?;
        let revenues: Vec<f64> = lines.iter().map(|l| l.line_revenue).collect();

        let totals = recompute_totals(
            &revenues,
            invoice.discount_kind,
            invoice.discount_value,
            invoice.tax_mode,
            invoice.tax_percent,
        );
        InvoiceRepository::update_totals_tx(&mut *conn, invoice_id, &totals).await?;

        let mut updated = invoice;
        updated.subtotal = totals.subtotal;
        updated.discount_amount = totals.discount_amount;
        updated.tax_amount = totals.tax_amount;
        updated.total = totals.total;

        self.sync_commission_tx(&mut *conn, &updated).await?;
        Ok(updated)
    }

    /// Upserts the commission row from the invoice's current state.
    /// Monetary fields are always re-derived; status survives.
    async fn sync_commission_tx(
        &self,
        conn: &mut SqliteConnection,
        invoice: &Invoice,
    ) -> EngineResult<()> {
        let percent = resolve_commission_percent(
            invoice.commission_percent_override,
            invoice.salesperson.as_deref(),
            &self.config,
        );
        // A voided invoice owes no commission, but the row remains.
        let base = if invoice.voided { 0.0 } else { invoice.total };
        let amount = commission_amount(base, percent);

        CommissionRepository::upsert_sync_tx(
            conn,
            &invoice.id,
            invoice.salesperson.as_deref(),
            base,
            percent,
            amount,
        )
        .await?;

        Ok(())
    }
}

/// Flattens a quantity spec into the stored line columns.
fn spec_fields(spec: &QuantitySpec) -> (f64, f64, f64) {
    match *spec {
        QuantitySpec::Area {
            length,
            width,
            area_adjustment,
        } => (length, width, area_adjustment),
        QuantitySpec::Direct { .. } => (0.0, 0.0, 0.0),
    }
}

// =============================================================================
// Integration Tests
// =============================================================================
