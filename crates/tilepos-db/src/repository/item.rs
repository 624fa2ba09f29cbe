//! # Item Repository
//!
//! Database operations for stock-keeping items.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tilepos_core::{Item, ItemKind};

/// Repository for item database operations.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Gets an item by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Item>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_tx(&mut conn, id).await
    }

    /// Gets an item by ID on a caller-supplied connection.
    pub async fn get_tx(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, kind, name, size_label, units_per_area, created_at
            FROM items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(item)
    }

    /// Gets an item by ID, failing if it does not exist.
    pub async fn require_tx(conn: &mut SqliteConnection, id: &str) -> DbResult<Item> {
        Self::get_tx(conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", id))
    }

    /// Lists all items ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, kind, name, size_label, units_per_area, created_at
            FROM items
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists items of one kind, ordered by name.
    pub async fn list_by_kind(&self, kind: ItemKind) -> DbResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, kind, name, size_label, units_per_area, created_at
            FROM items
            WHERE kind = ?1
            ORDER BY name
            "#,
        )
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Inserts an item on a caller-supplied connection.
    pub async fn insert_tx(conn: &mut SqliteConnection, item: &Item) -> DbResult<()> {
        debug!(id = %item.id, name = %item.name, "Inserting item");

        sqlx::query(
            r#"
            INSERT INTO items (id, kind, name, size_label, units_per_area, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&item.id)
        .bind(item.kind)
        .bind(&item.name)
        .bind(&item.size_label)
        .bind(item.units_per_area)
        .bind(item.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }
}
