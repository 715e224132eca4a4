//! # Business Repository
//!
//! Reads for the Business collaborator record: the engine consumes buffer
//! configuration and the IANA time zone from here. Insertion exists for
//! provisioning and tests; the surrounding SaaS owns business editing.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{from_epoch, to_epoch};
use marquee_core::{BufferConfig, Business};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct BusinessRow {
    id: String,
    name: String,
    time_zone: String,
    buffer_before_mins: i64,
    buffer_after_mins: i64,
    created_at: i64,
    updated_at: i64,
}

impl From<BusinessRow> for Business {
    fn from(row: BusinessRow) -> Self {
        Business {
            id: row.id,
            name: row.name,
            time_zone: row.time_zone,
            buffer_before_mins: row.buffer_before_mins,
            buffer_after_mins: row.buffer_after_mins,
            created_at: from_epoch(row.created_at),
            updated_at: from_epoch(row.updated_at),
        }
    }
}

const SELECT_BUSINESS: &str = r#"
    SELECT id, name, time_zone, buffer_before_mins, buffer_after_mins,
           created_at, updated_at
    FROM businesses
    WHERE id = ?1
"#;

// =============================================================================
// Transaction-Scoped Helpers
// =============================================================================

/// Loads a business inside an open transaction.
pub async fn get_business(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Business>> {
    let row: Option<BusinessRow> = sqlx::query_as(SELECT_BUSINESS)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(row.map(Business::from))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for business database operations.
#[derive(Debug, Clone)]
pub struct BusinessRepository {
    pool: SqlitePool,
}

impl BusinessRepository {
    /// Creates a new BusinessRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BusinessRepository { pool }
    }

    /// Gets a business by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Business>> {
        let mut conn = self.pool.acquire().await?;
        get_business(&mut conn, id).await
    }

    /// Returns the business's buffer configuration, failing if the business
    /// does not exist.
    pub async fn get_buffers(&self, id: &str) -> DbResult<BufferConfig> {
        let business = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Business", id))?;
        Ok(business.buffers())
    }

    /// Returns the business's configured IANA time zone.
    pub async fn get_time_zone(&self, id: &str) -> DbResult<String> {
        let business = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Business", id))?;
        Ok(business.time_zone)
    }

    /// Inserts a business (provisioning/tests).
    pub async fn insert(&self, business: &Business) -> DbResult<()> {
        debug!(id = %business.id, name = %business.name, "Inserting business");

        sqlx::query(
            r#"
            INSERT INTO businesses (
                id, name, time_zone, buffer_before_mins, buffer_after_mins,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&business.id)
        .bind(&business.name)
        .bind(&business.time_zone)
        .bind(business.buffer_before_mins)
        .bind(business.buffer_after_mins)
        .bind(to_epoch(business.created_at))
        .bind(to_epoch(business.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates the buffer configuration (provisioning/tests).
    pub async fn set_buffers(&self, id: &str, buffers: BufferConfig) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE businesses SET
                buffer_before_mins = ?2,
                buffer_after_mins = ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(buffers.before_mins)
        .bind(buffers.after_mins)
        .bind(to_epoch(Utc::now()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Business", id));
        }

        Ok(())
    }
}
