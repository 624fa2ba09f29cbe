//! # Invoice Repository
//!
//! Database operations for invoice headers, sale lines and returns.
//!
//! ## Invoice Mutation Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Every mutation (add/edit/delete line, discount/tax change)     │
//! │  runs inside ONE engine transaction that ends with:             │
//! │                                                                 │
//! │    1. update_totals_tx()   ← totals recomputed from ALL lines   │
//! │    2. commission upsert    ← ledger row re-derived              │
//! │                                                                 │
//! │  This repository only provides the pieces; the ordering lives   │
//! │  in LedgerEngine.                                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tilepos_core::{
    DiscountKind, Invoice, ReturnLine, SaleLine, TaxMode, Totals,
};

const INVOICE_COLUMNS: &str = r#"
    id, invoice_no, invoice_date, customer_name, phone, notes,
    salesperson, commission_percent_override,
    discount_kind, discount_value, tax_mode, tax_percent,
    subtotal, discount_amount, tax_amount, total,
    voided, created_at, updated_at
"#;

const LINE_COLUMNS: &str = r#"
    id, invoice_id, item_id, purpose,
    length, width, area_adjustment,
    quantity, sell_rate_per_unit, line_revenue,
    unit_cost_snapshot, line_cost,
    created_at, updated_at
"#;

const RETURN_COLUMNS: &str = r#"
    id, sale_line_id, invoice_id, item_id, quantity, return_date, created_at
"#;

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    // =========================================================================
    // Headers
    // =========================================================================

    /// Gets an invoice by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_tx(&mut conn, id).await
    }

    /// Gets an invoice by ID on a caller-supplied connection.
    pub async fn get_tx(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(invoice)
    }

    /// Gets an invoice by ID, failing if it does not exist.
    pub async fn require_tx(conn: &mut SqliteConnection, id: &str) -> DbResult<Invoice> {
        Self::get_tx(conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))
    }

    /// Gets an invoice by its human-facing number.
    pub async fn get_by_no(&self, invoice_no: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_no = ?1"
        ))
        .bind(invoice_no)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Lists non-voided invoices with `from <= invoice_date < to`.
    ///
    /// Half-open on the right so adjacent ranges never double count.
    pub async fn list_range(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        Self::list_range_tx(&mut conn, from, to).await
    }

    /// Range listing on a caller-supplied connection.
    pub async fn list_range_tx(
        conn: &mut SqliteConnection,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE invoice_date >= ?1 AND invoice_date < ?2 AND voided = 0
            ORDER BY invoice_date, invoice_no
            "#
        ))
        .bind(from)
        .bind(to)
        .fetch_all(conn)
        .await?;

        Ok(invoices)
    }

    /// Inserts an invoice header on a caller-supplied connection.
    pub async fn insert_tx(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
        debug!(id = %invoice.id, invoice_no = %invoice.invoice_no, "Inserting invoice");

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_no, invoice_date, customer_name, phone, notes,
                salesperson, commission_percent_override,
                discount_kind, discount_value, tax_mode, tax_percent,
                subtotal, discount_amount, tax_amount, total,
                voided, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8,
                ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16,
                ?17, ?18, ?19
            )
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_no)
        .bind(invoice.invoice_date)
        .bind(&invoice.customer_name)
        .bind(&invoice.phone)
        .bind(&invoice.notes)
        .bind(&invoice.salesperson)
        .bind(invoice.commission_percent_override)
        .bind(invoice.discount_kind)
        .bind(invoice.discount_value)
        .bind(invoice.tax_mode)
        .bind(invoice.tax_percent)
        .bind(invoice.subtotal)
        .bind(invoice.discount_amount)
        .bind(invoice.tax_amount)
        .bind(invoice.total)
        .bind(invoice.voided)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Writes back recomputed totals.
    pub async fn update_totals_tx(
        conn: &mut SqliteConnection,
        invoice_id: &str,
        totals: &Totals,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                subtotal = ?2,
                discount_amount = ?3,
                tax_amount = ?4,
                total = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(invoice_id)
        .bind(totals.subtotal)
        .bind(totals.discount_amount)
        .bind(totals.tax_amount)
        .bind(totals.total)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", invoice_id));
        }

        Ok(())
    }

    /// Updates the discount/tax configuration. Totals must be
    /// recomputed by the caller afterwards.
    pub async fn update_discount_tax_tx(
        conn: &mut SqliteConnection,
        invoice_id: &str,
        discount_kind: DiscountKind,
        discount_value: f64,
        tax_mode: TaxMode,
        tax_percent: f64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                discount_kind = ?2,
                discount_value = ?3,
                tax_mode = ?4,
                tax_percent = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(invoice_id)
        .bind(discount_kind)
        .bind(discount_value)
        .bind(tax_mode)
        .bind(tax_percent)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", invoice_id));
        }

        Ok(())
    }

    /// Updates the salesperson/commission-override fields.
    pub async fn update_sales_meta_tx(
        conn: &mut SqliteConnection,
        invoice_id: &str,
        salesperson: Option<&str>,
        commission_percent_override: Option<f64>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                salesperson = ?2,
                commission_percent_override = ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(invoice_id)
        .bind(salesperson)
        .bind(commission_percent_override)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", invoice_id));
        }

        Ok(())
    }

    /// Sets or clears the voided flag.
    pub async fn set_voided_tx(
        conn: &mut SqliteConnection,
        invoice_id: &str,
        voided: bool,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET voided = ?2, updated_at = ?3 WHERE id = ?1
            "#,
        )
        .bind(invoice_id)
        .bind(voided)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", invoice_id));
        }

        Ok(())
    }

    // =========================================================================
    // Sale Lines
    // =========================================================================

    /// Gets a sale line by ID.
    pub async fn get_line(&self, line_id: &str) -> DbResult<Option<SaleLine>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_line_tx(&mut conn, line_id).await
    }

    /// Gets a sale line on a caller-supplied connection.
    pub async fn get_line_tx(
        conn: &mut SqliteConnection,
        line_id: &str,
    ) -> DbResult<Option<SaleLine>> {
        let line = sqlx::query_as::<_, SaleLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM sale_lines WHERE id = ?1"
        ))
        .bind(line_id)
        .fetch_optional(conn)
        .await?;

        Ok(line)
    }

    /// Gets a sale line, failing if it does not exist.
    pub async fn require_line_tx(conn: &mut SqliteConnection, line_id: &str) -> DbResult<SaleLine> {
        Self::get_line_tx(conn, line_id)
            .await?
            .ok_or_else(|| DbError::not_found("SaleLine", line_id))
    }

    /// Lists all lines of an invoice in creation order.
    pub async fn list_lines(&self, invoice_id: &str) -> DbResult<Vec<SaleLine>> {
        let mut conn = self.pool.acquire().await?;
        Self::list_lines_tx(&mut conn, invoice_id).await
    }

    /// Line listing on a caller-supplied connection.
    pub async fn list_lines_tx(
        conn: &mut SqliteConnection,
        invoice_id: &str,
    ) -> DbResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM sale_lines WHERE invoice_id = ?1 ORDER BY created_at, id"
        ))
        .bind(invoice_id)
        .fetch_all(conn)
        .await?;

        Ok(lines)
    }

    /// Inserts a sale line.
    pub async fn insert_line_tx(conn: &mut SqliteConnection, line: &SaleLine) -> DbResult<()> {
        debug!(id = %line.id, invoice_id = %line.invoice_id, item_id = %line.item_id, "Inserting sale line");

        sqlx::query(
            r#"
            INSERT INTO sale_lines (
                id, invoice_id, item_id, purpose,
                length, width, area_adjustment,
                quantity, sell_rate_per_unit, line_revenue,
                unit_cost_snapshot, line_cost,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7,
                ?8, ?9, ?10,
                ?11, ?12,
                ?13, ?14
            )
            "#,
        )
        .bind(&line.id)
        .bind(&line.invoice_id)
        .bind(&line.item_id)
        .bind(&line.purpose)
        .bind(line.length)
        .bind(line.width)
        .bind(line.area_adjustment)
        .bind(line.quantity)
        .bind(line.sell_rate_per_unit)
        .bind(line.line_revenue)
        .bind(line.unit_cost_snapshot)
        .bind(line.line_cost)
        .bind(line.created_at)
        .bind(line.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Rewrites the mutable fields of a sale line.
    pub async fn update_line_tx(conn: &mut SqliteConnection, line: &SaleLine) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sale_lines SET
                purpose = ?2,
                length = ?3,
                width = ?4,
                area_adjustment = ?5,
                quantity = ?6,
                sell_rate_per_unit = ?7,
                line_revenue = ?8,
                unit_cost_snapshot = ?9,
                line_cost = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&line.id)
        .bind(&line.purpose)
        .bind(line.length)
        .bind(line.width)
        .bind(line.area_adjustment)
        .bind(line.quantity)
        .bind(line.sell_rate_per_unit)
        .bind(line.line_revenue)
        .bind(line.unit_cost_snapshot)
        .bind(line.line_cost)
        .bind(line.updated_at)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SaleLine", &line.id));
        }

        Ok(())
    }

    /// Deletes a sale line.
    pub async fn delete_line_tx(conn: &mut SqliteConnection, line_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM sale_lines WHERE id = ?1")
            .bind(line_id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SaleLine", line_id));
        }

        Ok(())
    }

    // =========================================================================
    // Return Lines
    // =========================================================================

    /// Inserts a return line.
    pub async fn insert_return_tx(conn: &mut SqliteConnection, ret: &ReturnLine) -> DbResult<()> {
        debug!(id = %ret.id, sale_line_id = %ret.sale_line_id, quantity = ret.quantity, "Inserting return line");

        sqlx::query(
            r#"
            INSERT INTO return_lines (
                id, sale_line_id, invoice_id, item_id, quantity, return_date, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&ret.id)
        .bind(&ret.sale_line_id)
        .bind(&ret.invoice_id)
        .bind(&ret.item_id)
        .bind(ret.quantity)
        .bind(ret.return_date)
        .bind(ret.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Lists all returns against an invoice.
    pub async fn list_returns(&self, invoice_id: &str) -> DbResult<Vec<ReturnLine>> {
        let mut conn = self.pool.acquire().await?;
        Self::list_returns_tx(&mut conn, invoice_id).await
    }

    /// Return listing on a caller-supplied connection.
    pub async fn list_returns_tx(
        conn: &mut SqliteConnection,
        invoice_id: &str,
    ) -> DbResult<Vec<ReturnLine>> {
        let returns = sqlx::query_as::<_, ReturnLine>(&format!(
            "SELECT {RETURN_COLUMNS} FROM return_lines WHERE invoice_id = ?1 ORDER BY created_at, id"
        ))
        .bind(invoice_id)
        .fetch_all(conn)
        .await?;

        Ok(returns)
    }

    /// Total quantity already returned against one sale line.
    pub async fn returned_qty_for_line_tx(
        conn: &mut SqliteConnection,
        sale_line_id: &str,
    ) -> DbResult<f64> {
        let total: Option<f64> = sqlx::query_scalar(
            "SELECT SUM(quantity) FROM return_lines WHERE sale_line_id = ?1",
        )
        .bind(sale_line_id)
        .fetch_one(conn)
        .await?;

        Ok(total.unwrap_or(0.0))
    }
}
