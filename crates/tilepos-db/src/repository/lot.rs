//! # Purchase Lot Repository
//!
//! Database operations for purchase lots.
//!
//! Lots stay freely editable: a corrective edit changes future cost
//! resolution and availability, while existing sale lines are shielded
//! by their frozen cost snapshots.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tilepos_core::PurchaseLot;

const LOT_COLUMNS: &str = r#"
    id, item_id, received_qty, damaged_qty,
    base_price_per_unit, base_price_per_area,
    transport_percent, transport_per_unit, transport_total,
    purchase_date, vendor, notes, created_at
"#;

/// Repository for purchase lot database operations.
#[derive(Debug, Clone)]
pub struct LotRepository {
    pool: SqlitePool,
}

impl LotRepository {
    /// Creates a new LotRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LotRepository { pool }
    }

    /// Gets a lot by ID on a caller-supplied connection.
    pub async fn get_tx(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<PurchaseLot>> {
        let lot = sqlx::query_as::<_, PurchaseLot>(&format!(
            "SELECT {LOT_COLUMNS} FROM purchase_lots WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(lot)
    }

    /// Gets a lot by ID, failing if it does not exist.
    pub async fn require_tx(conn: &mut SqliteConnection, id: &str) -> DbResult<PurchaseLot> {
        Self::get_tx(conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("PurchaseLot", id))
    }

    /// Lists an item's lots in creation order (oldest first).
    ///
    /// Creation order is what the cost strategies expect: the
    /// last-lot strategy walks the list from the back.
    pub async fn list_for_item(&self, item_id: &str) -> DbResult<Vec<PurchaseLot>> {
        let mut conn = self.pool.acquire().await?;
        Self::list_for_item_tx(&mut conn, item_id).await
    }

    /// Lists an item's lots on a caller-supplied connection.
    pub async fn list_for_item_tx(
        conn: &mut SqliteConnection,
        item_id: &str,
    ) -> DbResult<Vec<PurchaseLot>> {
        let lots = sqlx::query_as::<_, PurchaseLot>(&format!(
            "SELECT {LOT_COLUMNS} FROM purchase_lots WHERE item_id = ?1 ORDER BY created_at, id"
        ))
        .bind(item_id)
        .fetch_all(conn)
        .await?;

        Ok(lots)
    }

    /// Inserts a lot on a caller-supplied connection.
    pub async fn insert_tx(conn: &mut SqliteConnection, lot: &PurchaseLot) -> DbResult<()> {
        debug!(id = %lot.id, item_id = %lot.item_id, received = lot.received_qty, "Inserting purchase lot");

        sqlx::query(
            r#"
            INSERT INTO purchase_lots (
                id, item_id, received_qty, damaged_qty,
                base_price_per_unit, base_price_per_area,
                transport_percent, transport_per_unit, transport_total,
                purchase_date, vendor, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&lot.id)
        .bind(&lot.item_id)
        .bind(lot.received_qty)
        .bind(lot.damaged_qty)
        .bind(lot.base_price_per_unit)
        .bind(lot.base_price_per_area)
        .bind(lot.transport_percent)
        .bind(lot.transport_per_unit)
        .bind(lot.transport_total)
        .bind(lot.purchase_date)
        .bind(&lot.vendor)
        .bind(&lot.notes)
        .bind(lot.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Rewrites a lot's editable fields (corrective edit).
    pub async fn update_tx(conn: &mut SqliteConnection, lot: &PurchaseLot) -> DbResult<()> {
        debug!(id = %lot.id, "Updating purchase lot");

        let result = sqlx::query(
            r#"
            UPDATE purchase_lots SET
                received_qty = ?2,
                damaged_qty = ?3,
                base_price_per_unit = ?4,
                base_price_per_area = ?5,
                transport_percent = ?6,
                transport_per_unit = ?7,
                transport_total = ?8,
                purchase_date = ?9,
                vendor = ?10,
                notes = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&lot.id)
        .bind(lot.received_qty)
        .bind(lot.damaged_qty)
        .bind(lot.base_price_per_unit)
        .bind(lot.base_price_per_area)
        .bind(lot.transport_percent)
        .bind(lot.transport_per_unit)
        .bind(lot.transport_total)
        .bind(lot.purchase_date)
        .bind(&lot.vendor)
        .bind(&lot.notes)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PurchaseLot", &lot.id));
        }

        Ok(())
    }
}
