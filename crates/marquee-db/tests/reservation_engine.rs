//! End-to-end tests for the reservation engine against a real SQLite
//! database: hold placement, promotion, buffered conflicts, expiry, and
//! concurrent no-oversell behavior.

use chrono::{DateTime, Duration, TimeZone, Utc};

use marquee_core::{
    Business, HoldLine, InventorySku, ReservationStatus, TimeWindow,
};
use marquee_db::{
    Database, DbConfig, EngineConfig, EngineError, HoldRequest, PromoteRequest, ReservationEngine,
};

// =============================================================================
// Test Fixtures
// =============================================================================

const BIZ: &str = "biz-castle-co";
const SKU: &str = "sku-castle-12ft";

async fn seed(db: &Database, total_quantity: i64, buffer_before: i64, buffer_after: i64) {
    let now = Utc::now();

    db.businesses()
        .insert(&Business {
            id: BIZ.to_string(),
            name: "Castle Co".to_string(),
            time_zone: "America/Chicago".to_string(),
            buffer_before_mins: buffer_before,
            buffer_after_mins: buffer_after,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    db.inventory()
        .insert(&InventorySku {
            id: SKU.to_string(),
            business_id: BIZ.to_string(),
            sku: "CASTLE-12FT".to_string(),
            name: "12-ft bounce castle".to_string(),
            total_quantity,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
}

async fn memory_db(total_quantity: i64, buffer_before: i64, buffer_after: i64) -> Database {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    seed(&db, total_quantity, buffer_before, buffer_after).await;
    db
}

fn at(h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2027, 7, 10, h, min, 0).unwrap()
}

fn window(start_h: u32, end_h: u32) -> TimeWindow {
    TimeWindow::new(at(start_h, 0), at(end_h, 0)).unwrap()
}

fn hold_request(quantity: i64, win: TimeWindow) -> HoldRequest {
    HoldRequest {
        business_id: BIZ.to_string(),
        reservation_id: None,
        lines: vec![HoldLine {
            sku_id: SKU.to_string(),
            quantity,
            window: win,
        }],
    }
}

fn confirm_request() -> PromoteRequest {
    PromoteRequest {
        target: ReservationStatus::Confirmed,
        customer_name: Some("Dana Jensen".to_string()),
        customer_email: Some("dana@example.com".to_string()),
        customer_phone: None,
        notes: None,
        lines: None,
    }
}

// =============================================================================
// Holds
// =============================================================================

#[tokio::test]
async fn hold_succeeds_and_sets_expiry() {
    let db = memory_db(2, 0, 0).await;
    let engine = ReservationEngine::new(db.clone());

    let reservation = engine.place_hold(hold_request(1, window(10, 12))).await.unwrap();

    assert_eq!(reservation.status, ReservationStatus::Hold);
    let expires_at = reservation.expires_at.expect("hold must carry an expiry");
    let ttl = expires_at - reservation.created_at;
    assert_eq!(ttl, Duration::minutes(30));

    let lines = db.reservations().get_lines(&reservation.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 1);
    assert_eq!(lines[0].line_status, ReservationStatus::Hold);
}

#[tokio::test]
async fn sequential_holds_never_oversell() {
    let db = memory_db(3, 0, 0).await;
    let engine = ReservationEngine::new(db.clone());

    for _ in 0..3 {
        engine.place_hold(hold_request(1, window(10, 12))).await.unwrap();
    }

    let err = engine.place_hold(hold_request(1, window(10, 12))).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict { available: 0, .. }));
}

#[tokio::test]
async fn two_lines_of_same_sku_count_each_other() {
    let db = memory_db(1, 0, 0).await;
    let engine = ReservationEngine::new(db.clone());

    // One request, two overlapping lines of the single available unit: the
    // second line must see the first and conflict.
    let request = HoldRequest {
        business_id: BIZ.to_string(),
        reservation_id: None,
        lines: vec![
            HoldLine {
                sku_id: SKU.to_string(),
                quantity: 1,
                window: window(10, 12),
            },
            HoldLine {
                sku_id: SKU.to_string(),
                quantity: 1,
                window: window(11, 13),
            },
        ],
    };

    let err = engine.place_hold(request).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict { .. }));

    // The failed transaction rolled back entirely.
    assert_eq!(db.reservations().count().await.unwrap(), 0);
}

#[tokio::test]
async fn hold_replay_with_same_id_is_idempotent() {
    let db = memory_db(1, 0, 0).await;
    let engine = ReservationEngine::new(db.clone());

    let mut request = hold_request(1, window(10, 12));
    request.reservation_id = Some("client-chosen-id".to_string());

    let first = engine.place_hold(request.clone()).await.unwrap();
    // Network blip: the client retries the identical logical request.
    let second = engine.place_hold(request).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(db.reservations().count().await.unwrap(), 1);
}

#[tokio::test]
async fn hold_for_unknown_business_or_sku_fails_cleanly() {
    let db = memory_db(1, 0, 0).await;
    let engine = ReservationEngine::new(db.clone());

    let mut request = hold_request(1, window(10, 12));
    request.business_id = "biz-missing".to_string();
    let err = engine.place_hold(request).await.unwrap_err();
    assert!(matches!(err, EngineError::BusinessNotFound(_)));

    let mut request = hold_request(1, window(10, 12));
    request.lines[0].sku_id = "sku-missing".to_string();
    let err = engine.place_hold(request).await.unwrap_err();
    assert!(matches!(err, EngineError::SkuNotFound(_)));
}

// =============================================================================
// Scenario A: concurrent holds on the last unit
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scenario_a_concurrent_holds_exactly_one_wins() {
    // File-backed database so the two requests genuinely race through WAL
    // instead of serializing on a single in-memory connection.
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("marquee-test.db")).max_connections(5);
    let db = Database::new(config).await.unwrap();
    seed(&db, 1, 0, 0).await;

    let engine_a = ReservationEngine::new(db.clone());
    let engine_b = ReservationEngine::new(db.clone());

    let task_a = tokio::spawn(async move { engine_a.place_hold(hold_request(1, window(10, 12))).await });
    let task_b = tokio::spawn(async move { engine_b.place_hold(hold_request(1, window(10, 12))).await });

    let results = [task_a.await.unwrap(), task_b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(EngineError::Conflict { .. })))
        .count();

    assert_eq!(successes, 1, "exactly one concurrent hold must win");
    assert_eq!(conflicts, 1, "the loser must see a conflict, not oversell");
    assert_eq!(db.reservations().count().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_burst_never_exceeds_total_quantity() {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("marquee-burst.db")).max_connections(8);
    let db = Database::new(config).await.unwrap();
    seed(&db, 2, 0, 0).await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let engine = ReservationEngine::new(db.clone());
        tasks.push(tokio::spawn(async move {
            engine.place_hold(hold_request(1, window(10, 12))).await
        }));
    }

    let mut successes = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => successes += 1,
            Err(EngineError::Conflict { .. }) | Err(EngineError::Transient(_)) => {}
            Err(other) => panic!("unexpected failure: {other}"),
        }
    }

    assert!(successes <= 2, "oversold: {successes} holds on 2 units");
    assert!(successes >= 1, "at least one hold must win the race");
}

// =============================================================================
// Scenario B: teardown buffer
// =============================================================================

#[tokio::test]
async fn scenario_b_teardown_buffer_blocks_adjacent_request() {
    // totalQuantity = 2, bufferAfter = 2h. X books 10:00-12:00.
    let db = memory_db(2, 0, 120).await;
    let engine = ReservationEngine::new(db.clone());

    engine.place_hold(hold_request(1, window(10, 12))).await.unwrap();

    // 13:00-14:00 for both units: X's teardown runs through 14:00, so only
    // one unit is free.
    let err = engine.place_hold(hold_request(2, window(13, 14))).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Conflict {
            requested: 2,
            available: 1,
            ..
        }
    ));

    // 14:01-15:00 clears the buffer entirely.
    let late = TimeWindow::new(at(14, 1), at(15, 0)).unwrap();
    engine.place_hold(hold_request(2, late)).await.unwrap();
}

#[tokio::test]
async fn buffer_monotonicity_on_advisory_availability() {
    let db = memory_db(3, 0, 0).await;
    let engine = ReservationEngine::new(db.clone());

    engine.place_hold(hold_request(1, window(8, 9))).await.unwrap();
    engine.place_hold(hold_request(1, window(15, 16))).await.unwrap();

    let mut previous = i64::MAX;
    for mins in [0i64, 30, 60, 120, 240] {
        db.businesses()
            .set_buffers(BIZ, marquee_core::BufferConfig::from_minutes(mins, mins).unwrap())
            .await
            .unwrap();

        let free = engine.availability(SKU, &window(10, 14), None).await.unwrap();
        assert!(
            free <= previous,
            "raising buffers to {mins}m increased availability"
        );
        previous = free;
    }
}

// =============================================================================
// Scenario C: invalid input never reaches the database
// =============================================================================

#[tokio::test]
async fn scenario_c_zero_quantity_rejected_before_any_row() {
    let db = memory_db(5, 0, 0).await;
    let engine = ReservationEngine::new(db.clone());

    let err = engine.place_hold(hold_request(0, window(10, 12))).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    // No transaction was opened: no reservation row exists.
    assert_eq!(db.reservations().count().await.unwrap(), 0);
}

#[tokio::test]
async fn empty_line_set_rejected() {
    let db = memory_db(5, 0, 0).await;
    let engine = ReservationEngine::new(db.clone());

    let request = HoldRequest {
        business_id: BIZ.to_string(),
        reservation_id: None,
        lines: vec![],
    };
    let err = engine.place_hold(request).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

// =============================================================================
// Promotion
// =============================================================================

#[tokio::test]
async fn promote_confirms_and_clears_expiry() {
    let db = memory_db(2, 0, 0).await;
    let engine = ReservationEngine::new(db.clone());

    let held = engine.place_hold(hold_request(1, window(10, 12))).await.unwrap();
    let booked = engine.promote(&held.id, confirm_request()).await.unwrap();

    assert_eq!(booked.status, ReservationStatus::Confirmed);
    assert_eq!(booked.expires_at, None);
    assert_eq!(booked.customer_name.as_deref(), Some("Dana Jensen"));

    let lines = db.reservations().get_lines(&held.id).await.unwrap();
    assert!(lines.iter().all(|l| l.line_status == ReservationStatus::Confirmed));
}

#[tokio::test]
async fn promote_twice_is_a_noop_not_a_duplicate() {
    let db = memory_db(2, 0, 0).await;
    let engine = ReservationEngine::new(db.clone());

    let held = engine.place_hold(hold_request(1, window(10, 12))).await.unwrap();
    let first = engine.promote(&held.id, confirm_request()).await.unwrap();
    let second = engine.promote(&held.id, confirm_request()).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.status, ReservationStatus::Confirmed);
    assert_eq!(db.reservations().count().await.unwrap(), 1);
}

#[tokio::test]
async fn promote_missing_reservation_fails_with_not_found() {
    let db = memory_db(2, 0, 0).await;
    let engine = ReservationEngine::new(db.clone());

    let err = engine.promote("res-ghost", confirm_request()).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn scenario_d_promote_expired_hold_fails_with_expired() {
    let db = memory_db(2, 0, 0).await;

    // A zero-TTL engine places holds that are already past their expiry.
    let instant_expiry = ReservationEngine::with_config(
        db.clone(),
        EngineConfig {
            hold_ttl_minutes: 0,
            ..EngineConfig::default()
        },
    );
    let held = instant_expiry.place_hold(hold_request(1, window(10, 12))).await.unwrap();

    let engine = ReservationEngine::new(db.clone());
    let err = engine.promote(&held.id, confirm_request()).await.unwrap_err();

    // Expired, specifically — not a conflict.
    assert!(matches!(err, EngineError::Expired(_)));
}

#[tokio::test]
async fn promote_reuses_freed_capacity_from_its_own_hold() {
    // total = 1: the hold itself consumes the only unit. Promotion must
    // exclude the reservation's own lines from the re-check, or it would
    // conflict with itself.
    let db = memory_db(1, 0, 0).await;
    let engine = ReservationEngine::new(db.clone());

    let held = engine.place_hold(hold_request(1, window(10, 12))).await.unwrap();
    let booked = engine.promote(&held.id, confirm_request()).await.unwrap();
    assert_eq!(booked.status, ReservationStatus::Confirmed);
}

#[tokio::test]
async fn promote_with_replacement_lines_revalidates() {
    let db = memory_db(1, 0, 0).await;
    let engine = ReservationEngine::new(db.clone());

    // Competitor takes the afternoon.
    engine.place_hold(hold_request(1, window(14, 16))).await.unwrap();

    // Our hold takes the morning, then tries to move onto the afternoon at
    // promotion time.
    let held = engine.place_hold(hold_request(1, window(9, 11))).await.unwrap();
    let mut request = confirm_request();
    request.lines = Some(vec![HoldLine {
        sku_id: SKU.to_string(),
        quantity: 1,
        window: window(14, 16),
    }]);

    let err = engine.promote(&held.id, request).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict { .. }));

    // The hold survives untouched on its original window.
    let reservation = db.reservations().get_by_id(&held.id).await.unwrap().unwrap();
    assert_eq!(reservation.status, ReservationStatus::Hold);
    let lines = db.reservations().get_lines(&held.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].start_utc, at(9, 0));
}

// =============================================================================
// Expiry
// =============================================================================

#[tokio::test]
async fn expired_hold_contributes_zero_to_availability() {
    let db = memory_db(1, 0, 0).await;

    let instant_expiry = ReservationEngine::with_config(
        db.clone(),
        EngineConfig {
            hold_ttl_minutes: 0,
            ..EngineConfig::default()
        },
    );
    let dead = instant_expiry.place_hold(hold_request(1, window(10, 12))).await.unwrap();

    // The row still exists...
    assert_eq!(db.reservations().count().await.unwrap(), 1);

    // ...but the unit is free again: a fresh hold on the same window wins.
    let engine = ReservationEngine::new(db.clone());
    assert_eq!(engine.availability(SKU, &window(10, 12), None).await.unwrap(), 1);
    let fresh = engine.place_hold(hold_request(1, window(10, 12))).await.unwrap();
    assert_ne!(fresh.id, dead.id);
}

#[tokio::test]
async fn janitor_sweeps_only_stale_holds() {
    let db = memory_db(5, 0, 0).await;

    let instant_expiry = ReservationEngine::with_config(
        db.clone(),
        EngineConfig {
            hold_ttl_minutes: 0,
            ..EngineConfig::default()
        },
    );
    let stale = instant_expiry.place_hold(hold_request(1, window(8, 9))).await.unwrap();

    let engine = ReservationEngine::new(db.clone());
    let live = engine.place_hold(hold_request(1, window(10, 12))).await.unwrap();
    let held = engine.place_hold(hold_request(1, window(13, 14))).await.unwrap();
    let booked = engine.promote(&held.id, confirm_request()).await.unwrap();

    let swept = engine.expire_stale_holds(Duration::zero()).await.unwrap();
    assert_eq!(swept, 1);

    let stale = db.reservations().get_by_id(&stale.id).await.unwrap().unwrap();
    assert_eq!(stale.status, ReservationStatus::Cancelled);
    let stale_lines = db.reservations().get_lines(&stale.id).await.unwrap();
    assert!(stale_lines.iter().all(|l| l.line_status == ReservationStatus::Cancelled));

    // Live hold and confirmed booking are untouched.
    let live = db.reservations().get_by_id(&live.id).await.unwrap().unwrap();
    assert_eq!(live.status, ReservationStatus::Hold);
    let booked = db.reservations().get_by_id(&booked.id).await.unwrap().unwrap();
    assert_eq!(booked.status, ReservationStatus::Confirmed);
}

#[tokio::test]
async fn swept_hold_cannot_be_promoted() {
    let db = memory_db(5, 0, 0).await;

    let instant_expiry = ReservationEngine::with_config(
        db.clone(),
        EngineConfig {
            hold_ttl_minutes: 0,
            ..EngineConfig::default()
        },
    );
    let stale = instant_expiry.place_hold(hold_request(1, window(8, 9))).await.unwrap();

    let engine = ReservationEngine::new(db.clone());
    engine.expire_stale_holds(Duration::zero()).await.unwrap();

    let err = engine.promote(&stale.id, confirm_request()).await.unwrap_err();
    assert!(matches!(err, EngineError::NotPromotable { .. }));
}

// =============================================================================
// Advisory availability
// =============================================================================

#[tokio::test]
async fn advisory_availability_excludes_own_reservation() {
    let db = memory_db(1, 0, 0).await;
    let engine = ReservationEngine::new(db.clone());

    let held = engine.place_hold(hold_request(1, window(10, 12))).await.unwrap();

    // To everyone else the unit is gone; excluding our own hold it is free.
    assert_eq!(engine.availability(SKU, &window(10, 12), None).await.unwrap(), 0);
    assert_eq!(
        engine.availability(SKU, &window(10, 12), Some(&held.id)).await.unwrap(),
        1
    );
}
