//! # Hold Lifecycle
//!
//! The state machine governing a reservation's progression, and the
//! liveness predicate that drives availability counting.
//!
//! ## Reservation Lifecycle
//! ```text
//! place_hold()
//!      │
//!      ▼
//!   ┌──────┐   promote()   ┌─────────┐            ┌───────────┐
//!   │ HOLD ├──────────────►│ PENDING ├───────────►│ CONFIRMED │
//!   └──┬───┘               └────┬────┘            └─────┬─────┘
//!      │ expires_at passes      │                       │
//!      │ (logical, lazy)        │ cancel                │ fulfil / cancel
//!      ▼                        ▼                       ▼
//!   dead for counting;      CANCELLED            COMPLETED / CANCELLED
//!   janitor sweeps to
//!   CANCELLED eventually
//! ```
//!
//! Expiry is a logical state, not a physical one: an expired hold's row
//! still exists, but [`Reservation::is_live`] excludes it from every
//! availability computation. The janitor sweep is storage hygiene only —
//! correctness never depends on it.

use chrono::{DateTime, Utc};

use crate::types::{Reservation, ReservationStatus};

// =============================================================================
// Status Properties
// =============================================================================

impl ReservationStatus {
    /// Whether this status claims inventory at all (before expiry is
    /// considered).
    #[inline]
    pub const fn counts_against_availability(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Hold | ReservationStatus::Pending | ReservationStatus::Confirmed
        )
    }

    /// Terminal statuses never transition again and never count.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Cancelled | ReservationStatus::Completed)
    }

    /// The allowed transition table.
    pub const fn can_transition_to(&self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (*self, next),
            (Hold, Pending)
                | (Hold, Confirmed)
                | (Hold, Cancelled)
                | (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
        )
    }
}

// =============================================================================
// Liveness
// =============================================================================

impl Reservation {
    /// Whether this reservation counts against availability at `now`.
    ///
    /// Single source of truth for the "live" filter: a counting status,
    /// and — for holds — an expiry strictly in the future.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        if !self.status.counts_against_availability() {
            return false;
        }
        match (self.status, self.expires_at) {
            (ReservationStatus::Hold, Some(expires_at)) => expires_at > now,
            // A hold without an expiry should not exist; treat it as dead
            // rather than letting it claim inventory forever.
            (ReservationStatus::Hold, None) => false,
            _ => true,
        }
    }

    /// Whether this is a hold whose expiry has passed.
    pub fn is_expired_hold(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Hold
            && self.expires_at.map(|at| at <= now).unwrap_or(true)
    }
}

// =============================================================================
// Promotion Eligibility
// =============================================================================

/// Outcome of asking whether a reservation can be promoted right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionEligibility {
    /// A live hold: promotion may proceed.
    Promotable,
    /// Already pending/confirmed: promotion is an idempotent no-op.
    AlreadyPromoted,
    /// A hold past its expiry: the hold flow must restart.
    Expired,
    /// Terminal state: promotion can never succeed.
    NotPromotable,
}

/// Classifies a reservation for promotion at `now`.
pub fn promotion_eligibility(reservation: &Reservation, now: DateTime<Utc>) -> PromotionEligibility {
    match reservation.status {
        ReservationStatus::Hold => {
            if reservation.is_expired_hold(now) {
                PromotionEligibility::Expired
            } else {
                PromotionEligibility::Promotable
            }
        }
        ReservationStatus::Pending | ReservationStatus::Confirmed => {
            PromotionEligibility::AlreadyPromoted
        }
        ReservationStatus::Cancelled | ReservationStatus::Completed => {
            PromotionEligibility::NotPromotable
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn reservation(status: ReservationStatus, expires_at: Option<DateTime<Utc>>) -> Reservation {
        let now = Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap();
        Reservation {
            id: "res-1".to_string(),
            business_id: "biz-1".to_string(),
            status,
            expires_at,
            customer_name: None,
            customer_email: None,
            customer_phone: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_transition_table() {
        use ReservationStatus::*;
        assert!(Hold.can_transition_to(Pending));
        assert!(Hold.can_transition_to(Confirmed));
        assert!(Hold.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Completed));

        assert!(!Hold.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Hold));
        assert!(!Cancelled.can_transition_to(Hold));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Pending));
    }

    #[test]
    fn test_live_hold_counts() {
        let r = reservation(ReservationStatus::Hold, Some(now() + Duration::minutes(10)));
        assert!(r.is_live(now()));
        assert!(!r.is_expired_hold(now()));
    }

    #[test]
    fn test_expired_hold_is_dead_even_with_row_present() {
        let r = reservation(ReservationStatus::Hold, Some(now() - Duration::seconds(1)));
        assert!(!r.is_live(now()));
        assert!(r.is_expired_hold(now()));
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        // expires_at == now is already dead: liveness requires strictly
        // future expiry.
        let r = reservation(ReservationStatus::Hold, Some(now()));
        assert!(!r.is_live(now()));
    }

    #[test]
    fn test_promoted_states_ignore_expiry() {
        let r = reservation(ReservationStatus::Confirmed, None);
        assert!(r.is_live(now()));
        let r = reservation(ReservationStatus::Pending, None);
        assert!(r.is_live(now()));
    }

    #[test]
    fn test_terminal_states_never_count() {
        assert!(!reservation(ReservationStatus::Cancelled, None).is_live(now()));
        assert!(!reservation(ReservationStatus::Completed, None).is_live(now()));
    }

    #[test]
    fn test_promotion_eligibility() {
        let live = reservation(ReservationStatus::Hold, Some(now() + Duration::minutes(5)));
        assert_eq!(promotion_eligibility(&live, now()), PromotionEligibility::Promotable);

        let expired = reservation(ReservationStatus::Hold, Some(now() - Duration::seconds(1)));
        assert_eq!(promotion_eligibility(&expired, now()), PromotionEligibility::Expired);

        let confirmed = reservation(ReservationStatus::Confirmed, None);
        assert_eq!(
            promotion_eligibility(&confirmed, now()),
            PromotionEligibility::AlreadyPromoted
        );

        let cancelled = reservation(ReservationStatus::Cancelled, None);
        assert_eq!(
            promotion_eligibility(&cancelled, now()),
            PromotionEligibility::NotPromotable
        );
    }
}
