//! # Commission Ledger Repository
//!
//! One ledger row per invoice, kept in sync with the invoice's final
//! total.
//!
//! ## Sync Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  upsert_sync_tx() re-derives the MONETARY fields:               │
//! │      salesperson, base_amount, percent, amount                  │
//! │                                                                 │
//! │  and NEVER touches the WORKFLOW fields:                         │
//! │      status, reference, notes, paid_on                          │
//! │                                                                 │
//! │  A row already marked PAID keeps its status even when a later   │
//! │  invoice edit changes the amount; the amount still updates so   │
//! │  the ledger reflects what is actually owed.                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tilepos_core::{CommissionLedgerEntry, CommissionStatus};

const ENTRY_COLUMNS: &str = r#"
    id, invoice_id, salesperson, base_amount, percent, amount,
    status, reference, notes, paid_on, created_at, updated_at
"#;

/// Repository for the commission ledger.
#[derive(Debug, Clone)]
pub struct CommissionRepository {
    pool: SqlitePool,
}

impl CommissionRepository {
    /// Creates a new CommissionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CommissionRepository { pool }
    }

    /// Gets the ledger entry for an invoice.
    pub async fn get_by_invoice(&self, invoice_id: &str) -> DbResult<Option<CommissionLedgerEntry>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_by_invoice_tx(&mut conn, invoice_id).await
    }

    /// Gets the ledger entry on a caller-supplied connection.
    pub async fn get_by_invoice_tx(
        conn: &mut SqliteConnection,
        invoice_id: &str,
    ) -> DbResult<Option<CommissionLedgerEntry>> {
        let entry = sqlx::query_as::<_, CommissionLedgerEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM commission_ledger WHERE invoice_id = ?1"
        ))
        .bind(invoice_id)
        .fetch_optional(conn)
        .await?;

        Ok(entry)
    }

    /// Lists entries for a salesperson, newest first.
    pub async fn list_for_salesperson(
        &self,
        salesperson: &str,
    ) -> DbResult<Vec<CommissionLedgerEntry>> {
        let entries = sqlx::query_as::<_, CommissionLedgerEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM commission_ledger
            WHERE salesperson = ?1
            ORDER BY created_at DESC
            "#
        ))
        .bind(salesperson)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Lists entries whose invoice falls in `[from, to)`.
    pub async fn list_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<CommissionLedgerEntry>> {
        let entries = sqlx::query_as::<_, CommissionLedgerEntry>(
            r#"
            SELECT
                c.id, c.invoice_id, c.salesperson, c.base_amount, c.percent, c.amount,
                c.status, c.reference, c.notes, c.paid_on, c.created_at, c.updated_at
            FROM commission_ledger c
            JOIN invoices i ON i.id = c.invoice_id
            WHERE i.invoice_date >= ?1 AND i.invoice_date < ?2
            ORDER BY i.invoice_date, i.invoice_no
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Upserts the ledger row for an invoice with freshly derived
    /// monetary fields. Workflow fields are left untouched on update.
    pub async fn upsert_sync_tx(
        conn: &mut SqliteConnection,
        invoice_id: &str,
        salesperson: Option<&str>,
        base_amount: f64,
        percent: f64,
        amount: f64,
    ) -> DbResult<()> {
        debug!(invoice_id, base_amount, percent, amount, "Syncing commission ledger");

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO commission_ledger (
                id, invoice_id, salesperson, base_amount, percent, amount,
                status, reference, notes, paid_on, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'PENDING', NULL, NULL, NULL, ?7, ?7)
            ON CONFLICT(invoice_id) DO UPDATE SET
                salesperson = excluded.salesperson,
                base_amount = excluded.base_amount,
                percent = excluded.percent,
                amount = excluded.amount,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(invoice_id)
        .bind(salesperson)
        .bind(base_amount)
        .bind(percent)
        .bind(amount)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Sets the workflow status of an invoice's ledger row.
    ///
    /// Transition legality is checked by the engine before calling;
    /// this only performs the write. `paid_on` records when the
    /// commission was FIRST paid: once stamped it is never rewritten
    /// or cleared, even by a later cancellation.
    pub async fn set_status_tx(
        conn: &mut SqliteConnection,
        invoice_id: &str,
        status: CommissionStatus,
        reference: Option<&str>,
        paid_on: Option<DateTime<Utc>>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE commission_ledger SET
                status = ?2,
                reference = COALESCE(?3, reference),
                paid_on = COALESCE(paid_on, ?4),
                updated_at = ?5
            WHERE invoice_id = ?1
            "#,
        )
        .bind(invoice_id)
        .bind(status)
        .bind(reference)
        .bind(paid_on)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CommissionLedgerEntry", invoice_id));
        }

        Ok(())
    }
}
