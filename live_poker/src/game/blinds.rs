//! Blind escalation derived from wall-clock time.
//!
//! Blinds double every `blind_step_seconds` after the table's blind timer
//! starts, capped at 64x. Nothing ticks: every read recomputes the level
//! from the elapsed time, so any number of readers agree without
//! coordinating.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{
    constants::{DEFAULT_BLIND_STEP_SECONDS, MAX_BLIND_LEVEL},
    entities::{Chips, Table},
};

/// Effective blinds for a table at a point in time.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct BlindState {
    pub level: u32,
    pub multiplier: Chips,
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub step_seconds: i64,
    pub timer_started_at: Option<DateTime<Utc>>,
    /// When the next doubling happens; `None` once capped or while the
    /// timer has not started.
    pub next_increase_at: Option<DateTime<Utc>>,
}

/// Positive step length, or the default when unset or nonsensical.
#[must_use]
pub fn sanitize_step_seconds(step: Option<i64>) -> i64 {
    match step {
        Some(step) if step > 0 => step,
        _ => DEFAULT_BLIND_STEP_SECONDS,
    }
}

/// Blind multiplier after `elapsed_secs` of play.
#[must_use]
pub fn blind_multiplier(elapsed_secs: i64, step_seconds: i64) -> Chips {
    1 << blind_level(elapsed_secs, step_seconds)
}

fn blind_level(elapsed_secs: i64, step_seconds: i64) -> u32 {
    let step_seconds = sanitize_step_seconds(Some(step_seconds));
    let steps = elapsed_secs.max(0) / step_seconds;
    u32::try_from(steps)
        .unwrap_or(MAX_BLIND_LEVEL)
        .min(MAX_BLIND_LEVEL)
}

/// Computes the blind state of `table` at `now`.
#[must_use]
pub fn compute_blind_state(table: &Table, now: DateTime<Utc>) -> BlindState {
    let step_seconds = sanitize_step_seconds(table.blind_step_seconds);
    let elapsed = table
        .blind_timer_started_at
        .map(|started| (now - started).num_seconds().max(0))
        .unwrap_or(0);

    let level = blind_level(elapsed, step_seconds);
    let multiplier: Chips = 1 << level;

    let next_increase_at = match table.blind_timer_started_at {
        Some(started) if level < MAX_BLIND_LEVEL => {
            Some(started + Duration::seconds(step_seconds * (i64::from(level) + 1)))
        }
        _ => None,
    };

    BlindState {
        level,
        multiplier,
        small_blind: table.small_blind.saturating_mul(multiplier),
        big_blind: table.big_blind.saturating_mul(multiplier),
        step_seconds,
        timer_started_at: table.blind_timer_started_at,
        next_increase_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{constants::MAX_BLIND_MULTIPLIER, entities::Identity};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn table(step: Option<i64>, started: Option<DateTime<Utc>>) -> Table {
        Table {
            id: 1,
            name: "Main".to_string(),
            dealer_id: Identity::from("dealer"),
            small_blind: 5,
            big_blind: 10,
            blind_step_seconds: step,
            blind_timer_started_at: started,
            is_joinable: true,
            seat_count: 8,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 20, 0, 0).unwrap()
    }

    #[test]
    fn test_no_timer_means_base_blinds() {
        let state = compute_blind_state(&table(Some(60), None), t0());
        assert_eq!(state.multiplier, 1);
        assert_eq!(state.level, 0);
        assert_eq!(state.small_blind, 5);
        assert_eq!(state.big_blind, 10);
        assert_eq!(state.next_increase_at, None);
    }

    #[test]
    fn test_blinds_double_each_step() {
        let t = table(Some(60), Some(t0()));

        assert_eq!(compute_blind_state(&t, t0() + Duration::seconds(59)).multiplier, 1);
        assert_eq!(compute_blind_state(&t, t0() + Duration::seconds(60)).multiplier, 2);
        assert_eq!(compute_blind_state(&t, t0() + Duration::seconds(125)).multiplier, 4);

        let state = compute_blind_state(&t, t0() + Duration::seconds(180));
        assert_eq!(state.multiplier, 8);
        assert_eq!(state.small_blind, 40);
        assert_eq!(state.big_blind, 80);
        assert_eq!(state.next_increase_at, Some(t0() + Duration::seconds(240)));
    }

    #[test]
    fn test_multiplier_caps_at_64() {
        let t = table(Some(60), Some(t0()));
        let state = compute_blind_state(&t, t0() + Duration::days(30));
        assert_eq!(state.multiplier, MAX_BLIND_MULTIPLIER);
        assert_eq!(state.level, 6);
        assert_eq!(state.next_increase_at, None);
    }

    #[test]
    fn test_invalid_step_defaults_to_ten_minutes() {
        assert_eq!(sanitize_step_seconds(None), 600);
        assert_eq!(sanitize_step_seconds(Some(0)), 600);
        assert_eq!(sanitize_step_seconds(Some(-30)), 600);
        assert_eq!(sanitize_step_seconds(Some(45)), 45);

        let t = table(Some(-1), Some(t0()));
        assert_eq!(compute_blind_state(&t, t0() + Duration::seconds(599)).multiplier, 1);
        assert_eq!(compute_blind_state(&t, t0() + Duration::seconds(600)).multiplier, 2);
    }

    #[test]
    fn test_timer_in_the_future_counts_as_zero_elapsed() {
        let t = table(Some(60), Some(t0() + Duration::hours(1)));
        assert_eq!(compute_blind_state(&t, t0()).multiplier, 1);
    }

    proptest! {
        #[test]
        fn prop_multiplier_is_monotonic_and_bounded(
            a in 0i64..1_000_000,
            b in 0i64..1_000_000,
            step in -10i64..5_000,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let m_lo = blind_multiplier(lo, step);
            let m_hi = blind_multiplier(hi, step);
            prop_assert!(m_lo <= m_hi);
            prop_assert!((1..=MAX_BLIND_MULTIPLIER).contains(&m_hi));
            prop_assert!(m_hi.count_ones() == 1);
        }
    }
}
