//! # Stock Repository
//!
//! Derived stock positions. Availability is NEVER cached or stored:
//! it is recomputed from purchase lots, sale lines and return lines on
//! every query, so it cannot drift out of sync with the ledger.
//!
//! ```text
//! received_net = Σ max(0, received_qty − damaged_qty)   over lots
//! sold         = Σ quantity   over lines of non-voided invoices
//! returned     = Σ quantity   over return lines
//! available    = max(0, received_net − sold + returned)
//! ```

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DbResult;
use tilepos_core::StockPosition;

/// Repository for derived stock queries.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Derives the stock position for one item.
    pub async fn position(&self, item_id: &str) -> DbResult<StockPosition> {
        let mut conn = self.pool.acquire().await?;
        Self::position_tx(&mut conn, item_id).await
    }

    /// Derives the stock position on a caller-supplied connection.
    ///
    /// Used inside sale transactions so the oversell check sees the
    /// same snapshot the insert will commit against.
    pub async fn position_tx(
        conn: &mut SqliteConnection,
        item_id: &str,
    ) -> DbResult<StockPosition> {
        let received_net: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT SUM(MAX(received_qty - damaged_qty, 0))
            FROM purchase_lots
            WHERE item_id = ?1
            "#,
        )
        .bind(item_id)
        .fetch_one(&mut *conn)
        .await?;

        // Lines of voided invoices do not count as sold.
        let sold: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT SUM(sl.quantity)
            FROM sale_lines sl
            JOIN invoices i ON i.id = sl.invoice_id
            WHERE sl.item_id = ?1 AND i.voided = 0
            "#,
        )
        .bind(item_id)
        .fetch_one(&mut *conn)
        .await?;

        let returned: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT SUM(rl.quantity)
            FROM return_lines rl
            JOIN invoices i ON i.id = rl.invoice_id
            WHERE rl.item_id = ?1 AND i.voided = 0
            "#,
        )
        .bind(item_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(StockPosition {
            received_net: received_net.unwrap_or(0.0),
            sold: sold.unwrap_or(0.0),
            returned: returned.unwrap_or(0.0),
        })
    }

    /// Available quantity for one item.
    pub async fn available(&self, item_id: &str) -> DbResult<f64> {
        Ok(self.position(item_id).await?.available())
    }
}
