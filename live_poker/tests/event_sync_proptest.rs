/// Property-based tests for cursor-based delta sync and blind escalation.
use chrono::{Duration, TimeZone, Utc};
use live_poker::{
    MemoryTableStore, NoopNotifier, TableAction, TableConfig, TableManager,
    events::GameEvent,
    game::{
        blinds::{blind_multiplier, compute_blind_state},
        constants::MAX_BLIND_MULTIPLIER,
        entities::{Identity, Table},
    },
};
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Clone, Debug)]
enum Op {
    Join(u8),
    Leave(u8),
    Fetch,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8).prop_map(Op::Join),
        (0u8..8).prop_map(Op::Leave),
        Just(Op::Fetch),
    ]
}

async fn replay(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let manager = TableManager::new(Arc::new(MemoryTableStore::new()), Arc::new(NoopNotifier));
    let table = manager.create_table(&TableConfig::default()).await.unwrap();

    let mut cursor = None;
    let mut seen: Vec<GameEvent> = Vec::new();
    for op in ops {
        match op {
            Op::Join(seat) => {
                let who = Identity::new(format!("p{seat}"));
                let action = TableAction::JoinSeat { seat_number: seat };
                let _ = manager.perform_action(table.id, &who, &action).await;
            }
            Op::Leave(seat) => {
                let who = Identity::new(format!("p{seat}"));
                let _ = manager.perform_action(table.id, &who, &TableAction::LeaveSeat).await;
            }
            Op::Fetch => {
                let delta = manager.fetch_delta(table.id, cursor).await.unwrap();
                if delta.is_empty() {
                    prop_assert_eq!(delta.cursor, cursor);
                }
                cursor = delta.cursor;
                seen.extend(delta.events);
            }
        }
    }

    let tail = manager.fetch_delta(table.id, cursor).await.unwrap();
    seen.extend(tail.events);
    cursor = tail.cursor;

    let again = manager.fetch_delta(table.id, cursor).await.unwrap();
    prop_assert!(again.is_empty());
    prop_assert_eq!(again.cursor, cursor);

    let full = manager.fetch_delta(table.id, None).await.unwrap();
    prop_assert!(full.events.windows(2).all(|w| w[0].id < w[1].id));
    prop_assert_eq!(&seen, &full.events);
    prop_assert_eq!(full.cursor, cursor);
    Ok(())
}

fn table(step: Option<i64>, started: bool) -> Table {
    Table {
        id: 1,
        name: "Blinds".to_string(),
        dealer_id: Identity::from("dealer"),
        small_blind: 25,
        big_blind: 50,
        blind_step_seconds: step,
        blind_timer_started_at: started.then(|| Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()),
        is_joinable: true,
        seat_count: 8,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_sequential_deltas_union_to_full_history(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(replay(ops))?;
    }

    #[test]
    fn test_blind_multiplier_is_monotone_and_capped(
        a in 0i64..1_000_000,
        b in 0i64..1_000_000,
        step in 1i64..10_000,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let m_lo = blind_multiplier(lo, step);
        let m_hi = blind_multiplier(hi, step);
        prop_assert!(m_lo <= m_hi);
        prop_assert!(m_hi <= MAX_BLIND_MULTIPLIER);
        prop_assert!(m_lo >= 1);
    }

    #[test]
    fn test_blinds_without_timer_are_base(step in prop::option::of(-100i64..10_000), secs in 0i64..1_000_000) {
        let table = table(step, false);
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs);
        let state = compute_blind_state(&table, now);
        prop_assert_eq!(state.multiplier, 1);
        prop_assert_eq!(state.small_blind, 25);
        prop_assert_eq!(state.big_blind, 50);
    }

    #[test]
    fn test_blind_state_scales_base_blinds(secs in 0i64..100_000) {
        let table = table(Some(600), true);
        let now = table.blind_timer_started_at.unwrap() + Duration::seconds(secs);
        let state = compute_blind_state(&table, now);
        prop_assert_eq!(state.small_blind, 25 * state.multiplier);
        prop_assert_eq!(state.big_blind, 50 * state.multiplier);
        prop_assert_eq!(state.multiplier, blind_multiplier(secs, 600));
    }
}
