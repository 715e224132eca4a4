//! # Reservation Repository
//!
//! Database operations for reservations and their lines.
//!
//! The transaction-scoped helpers here are the building blocks of the
//! reservation engine; nothing else in the system writes these tables.
//! Pool-level methods cover reads for the HTTP surface and the janitor
//! sweep for stale holds.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{from_epoch, from_epoch_opt, to_epoch};
use marquee_core::availability::LineSnapshot;
use marquee_core::{Reservation, ReservationLine, ReservationStatus, TimeWindow};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ReservationRow {
    id: String,
    business_id: String,
    status: ReservationStatus,
    expires_at: Option<i64>,
    customer_name: Option<String>,
    customer_email: Option<String>,
    customer_phone: Option<String>,
    notes: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        Reservation {
            id: row.id,
            business_id: row.business_id,
            status: row.status,
            expires_at: from_epoch_opt(row.expires_at),
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            customer_phone: row.customer_phone,
            notes: row.notes,
            created_at: from_epoch(row.created_at),
            updated_at: from_epoch(row.updated_at),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    id: String,
    reservation_id: String,
    sku_id: String,
    quantity: i64,
    start_utc: i64,
    end_utc: i64,
    line_status: ReservationStatus,
    created_at: i64,
}

impl From<LineRow> for ReservationLine {
    fn from(row: LineRow) -> Self {
        ReservationLine {
            id: row.id,
            reservation_id: row.reservation_id,
            sku_id: row.sku_id,
            quantity: row.quantity,
            start_utc: from_epoch(row.start_utc),
            end_utc: from_epoch(row.end_utc),
            line_status: row.line_status,
            created_at: from_epoch(row.created_at),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SnapshotRow {
    reservation_id: String,
    quantity: i64,
    start_utc: i64,
    end_utc: i64,
}

const SELECT_RESERVATION: &str = r#"
    SELECT id, business_id, status, expires_at,
           customer_name, customer_email, customer_phone, notes,
           created_at, updated_at
    FROM reservations
    WHERE id = ?1
"#;

const SELECT_LINES: &str = r#"
    SELECT id, reservation_id, sku_id, quantity, start_utc, end_utc,
           line_status, created_at
    FROM reservation_lines
    WHERE reservation_id = ?1
    ORDER BY sku_id, created_at
"#;

// =============================================================================
// Transaction-Scoped Helpers
// =============================================================================

/// Loads a reservation inside an open transaction.
pub async fn get_reservation(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Reservation>> {
    let row: Option<ReservationRow> = sqlx::query_as(SELECT_RESERVATION)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(row.map(Reservation::from))
}

/// Loads a reservation's lines inside an open transaction.
pub async fn get_lines(
    conn: &mut SqliteConnection,
    reservation_id: &str,
) -> DbResult<Vec<ReservationLine>> {
    let rows: Vec<LineRow> = sqlx::query_as(SELECT_LINES)
        .bind(reservation_id)
        .fetch_all(conn)
        .await?;

    Ok(rows.into_iter().map(ReservationLine::from).collect())
}

/// Inserts a reservation row.
pub async fn insert_reservation(
    conn: &mut SqliteConnection,
    reservation: &Reservation,
) -> DbResult<()> {
    debug!(id = %reservation.id, status = ?reservation.status, "Inserting reservation");

    sqlx::query(
        r#"
        INSERT INTO reservations (
            id, business_id, status, expires_at,
            customer_name, customer_email, customer_phone, notes,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&reservation.id)
    .bind(&reservation.business_id)
    .bind(reservation.status)
    .bind(reservation.expires_at.map(to_epoch))
    .bind(&reservation.customer_name)
    .bind(&reservation.customer_email)
    .bind(&reservation.customer_phone)
    .bind(&reservation.notes)
    .bind(to_epoch(reservation.created_at))
    .bind(to_epoch(reservation.updated_at))
    .execute(conn)
    .await?;

    Ok(())
}

/// Inserts a reservation line.
pub async fn insert_line(conn: &mut SqliteConnection, line: &ReservationLine) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO reservation_lines (
            id, reservation_id, sku_id, quantity, start_utc, end_utc,
            line_status, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&line.id)
    .bind(&line.reservation_id)
    .bind(&line.sku_id)
    .bind(line.quantity)
    .bind(to_epoch(line.start_utc))
    .bind(to_epoch(line.end_utc))
    .bind(line.line_status)
    .bind(to_epoch(line.created_at))
    .execute(conn)
    .await?;

    Ok(())
}

/// Deletes all lines of a reservation (used when a promotion replaces the
/// line set).
pub async fn delete_lines(conn: &mut SqliteConnection, reservation_id: &str) -> DbResult<()> {
    sqlx::query("DELETE FROM reservation_lines WHERE reservation_id = ?1")
        .bind(reservation_id)
        .execute(conn)
        .await?;

    Ok(())
}

/// Fetches the live line snapshots for a SKU that intersect the (already
/// buffered) check window, excluding one reservation if requested.
///
/// "Live" is the lifecycle predicate rendered in SQL: a counting status,
/// and for holds an expiry strictly after `now`. The interval test is the
/// inclusive-endpoint convention on epoch seconds; the pure calculator
/// re-applies the same test over the returned snapshots.
pub async fn live_snapshots(
    conn: &mut SqliteConnection,
    sku_id: &str,
    exclude_reservation_id: Option<&str>,
    check: &TimeWindow,
    now: DateTime<Utc>,
) -> DbResult<Vec<LineSnapshot>> {
    let rows: Vec<SnapshotRow> = sqlx::query_as(
        r#"
        SELECT l.reservation_id, l.quantity, l.start_utc, l.end_utc
        FROM reservation_lines l
        JOIN reservations r ON r.id = l.reservation_id
        WHERE l.sku_id = ?1
          AND r.status IN ('hold', 'pending', 'confirmed')
          AND (r.status != 'hold' OR (r.expires_at IS NOT NULL AND r.expires_at > ?2))
          AND (?3 IS NULL OR l.reservation_id != ?3)
          AND l.start_utc <= ?4
          AND l.end_utc >= ?5
        "#,
    )
    .bind(sku_id)
    .bind(to_epoch(now))
    .bind(exclude_reservation_id)
    .bind(to_epoch(check.end))
    .bind(to_epoch(check.start))
    .fetch_all(conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(LineSnapshot {
                reservation_id: row.reservation_id,
                quantity: row.quantity,
                window: TimeWindow::new(from_epoch(row.start_utc), from_epoch(row.end_utc))
                    .map_err(|e| DbError::Internal(format!("corrupt line window: {}", e)))?,
            })
        })
        .collect()
}

/// Applies a promotion: flips status, clears the expiry, merges customer
/// details, and stamps `updated_at`.
///
/// Guarded on `status = 'hold'` so a racing promotion cannot apply twice;
/// zero rows affected means the reservation was not a hold anymore.
pub async fn apply_promotion(
    conn: &mut SqliteConnection,
    id: &str,
    target: ReservationStatus,
    customer_name: Option<&str>,
    customer_email: Option<&str>,
    customer_phone: Option<&str>,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE reservations SET
            status = ?2,
            expires_at = NULL,
            customer_name = COALESCE(?3, customer_name),
            customer_email = COALESCE(?4, customer_email),
            customer_phone = COALESCE(?5, customer_phone),
            notes = COALESCE(?6, notes),
            updated_at = ?7
        WHERE id = ?1 AND status = 'hold'
        "#,
    )
    .bind(id)
    .bind(target)
    .bind(customer_name)
    .bind(customer_email)
    .bind(customer_phone)
    .bind(notes)
    .bind(to_epoch(now))
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Reservation (hold)", id));
    }

    Ok(())
}

/// Mirrors the reservation status onto all of its lines.
pub async fn update_line_status(
    conn: &mut SqliteConnection,
    reservation_id: &str,
    status: ReservationStatus,
) -> DbResult<()> {
    sqlx::query("UPDATE reservation_lines SET line_status = ?2 WHERE reservation_id = ?1")
        .bind(reservation_id)
        .bind(status)
        .execute(conn)
        .await?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for reservation database operations.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    /// Creates a new ReservationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReservationRepository { pool }
    }

    /// Gets a reservation by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Reservation>> {
        let mut conn = self.pool.acquire().await?;
        get_reservation(&mut conn, id).await
    }

    /// Gets all lines for a reservation, ordered by SKU.
    pub async fn get_lines(&self, reservation_id: &str) -> DbResult<Vec<ReservationLine>> {
        let mut conn = self.pool.acquire().await?;
        get_lines(&mut conn, reservation_id).await
    }

    /// Counts reservation rows (diagnostics and tests).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reservations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// The janitor sweep: marks holds whose expiry passed before `cutoff`
    /// as cancelled, mirroring the line status.
    ///
    /// Storage hygiene only. The live filter already ignores expired holds,
    /// swept or not, so correctness never depends on this running.
    pub async fn expire_stale_holds(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE reservation_lines SET line_status = 'cancelled'
            WHERE reservation_id IN (
                SELECT id FROM reservations
                WHERE status = 'hold'
                  AND expires_at IS NOT NULL
                  AND expires_at <= ?1
            )
            "#,
        )
        .bind(to_epoch(cutoff))
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            UPDATE reservations SET status = 'cancelled', updated_at = ?2
            WHERE status = 'hold'
              AND expires_at IS NOT NULL
              AND expires_at <= ?1
            "#,
        )
        .bind(to_epoch(cutoff))
        .bind(to_epoch(now))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let swept = result.rows_affected();
        if swept > 0 {
            info!(swept, "Swept stale holds");
        }

        Ok(swept)
    }
}
