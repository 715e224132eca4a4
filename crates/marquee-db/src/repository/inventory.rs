//! # Inventory Repository
//!
//! Reads for the InventorySKU collaborator record: the engine consumes
//! `total_quantity` — the pool of interchangeable physical units — from
//! here. Insertion exists for provisioning and tests.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{from_epoch, to_epoch};
use marquee_core::InventorySku;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SkuRow {
    id: String,
    business_id: String,
    sku: String,
    name: String,
    total_quantity: i64,
    is_active: bool,
    created_at: i64,
    updated_at: i64,
}

impl From<SkuRow> for InventorySku {
    fn from(row: SkuRow) -> Self {
        InventorySku {
            id: row.id,
            business_id: row.business_id,
            sku: row.sku,
            name: row.name,
            total_quantity: row.total_quantity,
            is_active: row.is_active,
            created_at: from_epoch(row.created_at),
            updated_at: from_epoch(row.updated_at),
        }
    }
}

const SELECT_SKU: &str = r#"
    SELECT id, business_id, sku, name, total_quantity, is_active,
           created_at, updated_at
    FROM inventory_skus
    WHERE id = ?1
"#;

// =============================================================================
// Transaction-Scoped Helpers
// =============================================================================

/// Loads a SKU inside an open transaction.
pub async fn get_sku(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<InventorySku>> {
    let row: Option<SkuRow> = sqlx::query_as(SELECT_SKU)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(row.map(InventorySku::from))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for inventory SKU database operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Gets a SKU by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<InventorySku>> {
        let mut conn = self.pool.acquire().await?;
        get_sku(&mut conn, id).await
    }

    /// Returns the total unit count for a SKU, failing if it does not exist.
    pub async fn total_quantity(&self, id: &str) -> DbResult<i64> {
        let sku = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("SKU", id))?;
        Ok(sku.total_quantity)
    }

    /// Lists active SKUs for a business, ordered by code.
    pub async fn list_active(&self, business_id: &str) -> DbResult<Vec<InventorySku>> {
        let rows: Vec<SkuRow> = sqlx::query_as(
            r#"
            SELECT id, business_id, sku, name, total_quantity, is_active,
                   created_at, updated_at
            FROM inventory_skus
            WHERE business_id = ?1 AND is_active = 1
            ORDER BY sku
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(InventorySku::from).collect())
    }

    /// Inserts a SKU (provisioning/tests).
    pub async fn insert(&self, sku: &InventorySku) -> DbResult<()> {
        debug!(id = %sku.id, sku = %sku.sku, total = %sku.total_quantity, "Inserting SKU");

        sqlx::query(
            r#"
            INSERT INTO inventory_skus (
                id, business_id, sku, name, total_quantity, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&sku.id)
        .bind(&sku.business_id)
        .bind(&sku.sku)
        .bind(&sku.name)
        .bind(sku.total_quantity)
        .bind(sku.is_active)
        .bind(to_epoch(sku.created_at))
        .bind(to_epoch(sku.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
