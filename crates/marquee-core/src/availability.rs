//! # Availability Calculator
//!
//! Pure buffered-overlap counting: given a SKU's total unit count and the
//! set of live reservation lines committed against it, how many units are
//! free for a candidate window?
//!
//! The database layer fetches the live line snapshots (status filter,
//! expiry filter, self-exclusion during promotion); the counting itself
//! happens here so the overlap convention lives in exactly one tested
//! place.
//!
//! ## Buffered Conflict Model
//! Every reservation of a business occupies its units for an *effective*
//! window `[start - buffer_before, end + buffer_after]` — setup and
//! teardown time around the rental itself. Two reservations conflict when
//! their effective windows intersect (inclusively: touching counts).
//!
//! Lines are stored unbuffered, so the check against a candidate window
//! rewrites that condition: raw line `[s, e]` conflicts with the candidate
//! iff it intersects the candidate padded by `buffer_before + buffer_after`
//! on each side. With zero buffers the check degenerates to the exact
//! requested window.
//!
//! Results are advisory outside a transaction — they go stale the moment a
//! concurrent writer commits — and authoritative inside one, where the
//! reservation transaction re-runs the same computation against its
//! snapshot before inserting lines.

use crate::types::{BufferConfig, TimeWindow};

// =============================================================================
// Line Snapshot
// =============================================================================

/// A live reservation line as seen by the calculator: who holds it, how many
/// units, over which exact window.
#[derive(Debug, Clone)]
pub struct LineSnapshot {
    pub reservation_id: String,
    pub quantity: i64,
    pub window: TimeWindow,
}

// =============================================================================
// Counting
// =============================================================================

/// The interval a candidate window must be tested against, given the
/// business's buffers.
///
/// Derivation: buffered line `[s - before, e + after]` intersects buffered
/// candidate `[w.start - before, w.end + after]` exactly when the raw line
/// `[s, e]` intersects `[w.start - (before + after), w.end + (before + after)]`.
pub fn check_window(window: &TimeWindow, buffers: &BufferConfig) -> TimeWindow {
    let pad = buffers.before() + buffers.after();
    TimeWindow {
        start: window.start - pad,
        end: window.end + pad,
    }
}

/// Sums the quantity of every snapshot whose window intersects `check`.
///
/// The intersection test is inclusive at both endpoints (see
/// [`TimeWindow::intersects`]): a reservation ending exactly when the check
/// window begins still counts.
pub fn reserved_units(lines: &[LineSnapshot], check: &TimeWindow) -> i64 {
    lines
        .iter()
        .filter(|line| line.window.intersects(check))
        .map(|line| line.quantity)
        .sum()
}

/// Computes how many units of a SKU are free for the *exact* unbuffered
/// window `window`, given the business's buffers and the SKU's live lines.
///
/// The result is clamped at zero — a data set that somehow oversold reports
/// zero free units rather than a negative count.
pub fn available_units(
    total_quantity: i64,
    lines: &[LineSnapshot],
    window: &TimeWindow,
    buffers: &BufferConfig,
) -> i64 {
    let check = check_window(window, buffers);
    (total_quantity - reserved_units(lines, &check)).max(0)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, h, min, 0).unwrap()
    }

    fn win(start_h: u32, end_h: u32) -> TimeWindow {
        TimeWindow::new(at(start_h, 0), at(end_h, 0)).unwrap()
    }

    fn line(id: &str, quantity: i64, start_h: u32, end_h: u32) -> LineSnapshot {
        LineSnapshot {
            reservation_id: id.to_string(),
            quantity,
            window: win(start_h, end_h),
        }
    }

    #[test]
    fn test_empty_sku_is_fully_available() {
        assert_eq!(available_units(5, &[], &win(10, 12), &BufferConfig::none()), 5);
    }

    #[test]
    fn test_overlapping_lines_reduce_availability() {
        let lines = vec![line("a", 2, 9, 11), line("b", 1, 11, 13)];
        assert_eq!(available_units(5, &lines, &win(10, 12), &BufferConfig::none()), 2);
    }

    #[test]
    fn test_disjoint_lines_do_not_count() {
        let lines = vec![line("a", 3, 6, 8)];
        assert_eq!(available_units(5, &lines, &win(10, 12), &BufferConfig::none()), 5);
    }

    #[test]
    fn test_touching_windows_conflict() {
        // Line ends exactly when the request begins: inclusive overlap.
        let lines = vec![line("a", 1, 8, 10)];
        assert_eq!(available_units(1, &lines, &win(10, 12), &BufferConfig::none()), 0);
    }

    #[test]
    fn test_teardown_buffer_blocks_following_request() {
        // Two units total, 2h teardown. X books 10:00-12:00, so its units
        // are tied up through 14:00. A 13:00-14:00 request must fail; a
        // 14:01-15:00 request clears.
        let buffers = BufferConfig::from_minutes(0, 120).unwrap();
        let lines = vec![line("x", 2, 10, 12)];
        assert_eq!(available_units(2, &lines, &win(13, 14), &buffers), 0);

        let late = TimeWindow::new(at(14, 1), at(15, 0)).unwrap();
        assert_eq!(available_units(2, &lines, &late, &buffers), 2);
    }

    #[test]
    fn test_setup_buffer_blocks_preceding_overlap() {
        // 1h setup, no teardown. X runs 10:00-12:00. A request ending at
        // 09:30 collides with X's setup hour (09:00-10:00); one ending at
        // 08:59 does not.
        let buffers = BufferConfig::from_minutes(60, 0).unwrap();
        let lines = vec![line("x", 1, 10, 12)];

        let brushing = TimeWindow::new(at(7, 0), at(9, 30)).unwrap();
        assert_eq!(available_units(1, &lines, &brushing, &buffers), 0);

        let clear = TimeWindow::new(at(7, 0), at(8, 59)).unwrap();
        assert_eq!(available_units(1, &lines, &clear, &buffers), 1);
    }

    #[test]
    fn test_check_window_combines_both_buffers() {
        let buffers = BufferConfig::from_minutes(30, 60).unwrap();
        let check = check_window(&win(10, 12), &buffers);
        assert_eq!(check.start, at(8, 30));
        assert_eq!(check.end, at(13, 30));

        // Zero buffers degenerate to the exact window.
        assert_eq!(check_window(&win(10, 12), &BufferConfig::none()), win(10, 12));
    }

    #[test]
    fn test_buffer_monotonicity() {
        // Increasing buffers never increases availability.
        let lines = vec![line("a", 1, 8, 9), line("b", 1, 15, 16)];
        let window = win(10, 14);
        let mut previous = i64::MAX;
        for mins in [0, 30, 60, 90, 120, 180] {
            let buffers = BufferConfig::from_minutes(mins, mins).unwrap();
            let free = available_units(3, &lines, &window, &buffers);
            assert!(free <= previous, "buffer {}m increased availability", mins);
            previous = free;
        }
    }

    #[test]
    fn test_negative_never_reported() {
        let lines = vec![line("a", 9, 10, 12)];
        assert_eq!(available_units(5, &lines, &win(10, 12), &BufferConfig::none()), 0);
    }
}
