//! End-to-end hands driven through the table manager on the in-memory store.

use live_poker::{
    MemoryTableStore, NoopNotifier, TableAction, TableConfig, TableError, TableManager,
    events::{BetKind, EventAction, GameEvent},
    game::entities::{Card, Identity, Phase, TableId},
};
use std::sync::Arc;

const PLAYERS: [&str; 3] = ["alice", "bob", "carol"];

fn dealer() -> Identity {
    Identity::from("dealer")
}

fn card(code: &str) -> Card {
    code.parse().unwrap()
}

async fn seated_table() -> (TableManager, TableId) {
    let manager = TableManager::new(Arc::new(MemoryTableStore::new()), Arc::new(NoopNotifier));
    let table = manager.create_table(&TableConfig::default()).await.unwrap();
    for (seat_number, name) in PLAYERS.into_iter().enumerate() {
        manager
            .perform_action(
                table.id,
                &Identity::from(name),
                &TableAction::JoinSeat {
                    seat_number: seat_number as u8,
                },
            )
            .await
            .unwrap();
    }
    (manager, table.id)
}

async fn deal(manager: &TableManager, table_id: TableId, codes: &[&str]) {
    for code in codes {
        manager
            .perform_action(table_id, &dealer(), &TableAction::DealCard { card: card(code) })
            .await
            .unwrap();
    }
}

async fn act(manager: &TableManager, table_id: TableId, who: &str, action: TableAction) {
    manager
        .perform_action(table_id, &Identity::from(who), &action)
        .await
        .unwrap_or_else(|e| panic!("{who} {action:?}: {e}"));
}

#[tokio::test]
async fn test_three_player_deal_opens_betting() {
    let (manager, table_id) = seated_table().await;

    let view = manager
        .perform_action(table_id, &dealer(), &TableAction::StartGame)
        .await
        .unwrap();
    assert_eq!(view.phase, Phase::DealHoleCards);
    assert!(!view.is_joinable);
    let game = view.game.unwrap();
    assert_eq!(game.button_seat, Some(0));
    assert_eq!(game.assigned_seat, Some(1));
    assert_eq!(view.seats[1].current_bet, 5);
    assert_eq!(view.seats[2].current_bet, 10);

    deal(&manager, table_id, &["As", "Ks", "Qs", "Js", "Ts", "9s"]).await;

    let view = manager.table_view(table_id, Some(&dealer())).await.unwrap();
    assert_eq!(view.phase, Phase::Betting);
    let game = view.game.unwrap();
    assert_eq!(game.required_bet_count, 3);
    assert_eq!(game.bet_count, 0);
    // First to act is the seat after the big blind.
    assert_eq!(game.assigned_seat, Some(0));

    let hands: Vec<Vec<Card>> = view.seats[..3]
        .iter()
        .map(|seat| seat.cards.clone().unwrap())
        .collect();
    assert_eq!(hands[0], vec![card("Qs"), card("9s")]);
    assert_eq!(hands[1], vec![card("As"), card("Js")]);
    assert_eq!(hands[2], vec![card("Ks"), card("Ts")]);
}

#[tokio::test]
async fn test_full_hand_to_showdown_and_back_to_waiting() {
    let (manager, table_id) = seated_table().await;
    manager
        .perform_action(table_id, &dealer(), &TableAction::StartGame)
        .await
        .unwrap();
    deal(&manager, table_id, &["As", "Ks", "Qs", "Js", "Ts", "9s"]).await;

    act(&manager, table_id, "alice", TableAction::Call).await;
    act(&manager, table_id, "bob", TableAction::Call).await;
    act(&manager, table_id, "carol", TableAction::Check).await;

    let view = manager.table_view(table_id, None).await.unwrap();
    assert_eq!(view.phase, Phase::DealFlop);
    assert_eq!(view.game.as_ref().unwrap().pot, 30);
    assert!(view.seats.iter().all(|seat| seat.current_bet == 0));

    // Post-flop action starts left of the button.
    deal(&manager, table_id, &["2c", "7d", "8h"]).await;
    for who in ["bob", "carol", "alice"] {
        act(&manager, table_id, who, TableAction::Check).await;
    }
    deal(&manager, table_id, &["3c"]).await;
    for who in ["bob", "carol", "alice"] {
        act(&manager, table_id, who, TableAction::Check).await;
    }
    deal(&manager, table_id, &["4d"]).await;
    for who in ["bob", "carol", "alice"] {
        act(&manager, table_id, who, TableAction::Check).await;
    }

    let view = manager.table_view(table_id, None).await.unwrap();
    assert_eq!(view.phase, Phase::Showdown);
    assert_eq!(view.game.unwrap().community_cards.len(), 5);

    let view = manager
        .perform_action(table_id, &dealer(), &TableAction::EndHand)
        .await
        .unwrap();
    assert_eq!(view.phase, Phase::Waiting);
    assert!(view.is_joinable);
    assert!(view.seats.iter().all(|seat| seat.card_count == 0));

    let delta = manager.fetch_delta(table_id, None).await.unwrap();
    let last = delta.events.last().unwrap();
    assert_eq!(last.payload.awards.len(), 1);
    assert_eq!(last.payload.awards[0].seat_number, 1);
    assert_eq!(last.payload.awards[0].amount, 30);
    match &last.payload.action {
        EventAction::HandEnded { shown } => {
            assert_eq!(shown.len(), 1);
            assert_eq!(shown[0].cards, vec![card("As"), card("Js")]);
        }
        other => panic!("unexpected final event {other:?}"),
    }
    assert_eq!(delta.events.len(), 28);
}

#[tokio::test]
async fn test_fold_to_one_lands_in_showdown_with_pot_awarded() {
    let (manager, table_id) = seated_table().await;
    manager
        .perform_action(table_id, &dealer(), &TableAction::StartGame)
        .await
        .unwrap();
    deal(&manager, table_id, &["As", "Ks", "Qs", "Js", "Ts", "9s"]).await;

    act(&manager, table_id, "alice", TableAction::Fold).await;
    act(&manager, table_id, "bob", TableAction::Fold).await;

    let delta = manager.fetch_delta(table_id, None).await.unwrap();
    let last = delta.events.last().unwrap();
    assert_eq!(last.payload.phase, Phase::Showdown);
    assert_eq!(last.payload.awards.len(), 1);
    assert_eq!(last.payload.awards[0].seat_number, 2);
    assert_eq!(last.payload.awards[0].amount, 15);
    assert!(matches!(
        last.payload.action,
        EventAction::PlayerActed {
            bet: BetKind::Fold,
            ..
        }
    ));

    // The winner may show before the dealer closes the hand.
    act(&manager, table_id, "carol", TableAction::VolunteerShow).await;
    let view = manager.table_view(table_id, None).await.unwrap();
    assert_eq!(view.seats[2].cards.as_ref().unwrap().len(), 2);

    let view = manager
        .perform_action(table_id, &dealer(), &TableAction::EndHand)
        .await
        .unwrap();
    assert_eq!(view.phase, Phase::Waiting);
}

#[tokio::test]
async fn test_check_facing_bet_is_invalid_transition() {
    let (manager, table_id) = seated_table().await;
    manager
        .perform_action(table_id, &dealer(), &TableAction::StartGame)
        .await
        .unwrap();
    deal(&manager, table_id, &["As", "Ks", "Qs", "Js", "Ts", "9s"]).await;

    let err = manager
        .perform_action(table_id, &Identity::from("alice"), &TableAction::Check)
        .await
        .unwrap_err();
    assert!(matches!(err, TableError::InvalidTransition(_)), "{err}");
}

#[tokio::test]
async fn test_reset_from_mid_hand_returns_to_waiting() {
    let (manager, table_id) = seated_table().await;
    manager
        .perform_action(table_id, &dealer(), &TableAction::StartGame)
        .await
        .unwrap();
    deal(&manager, table_id, &["As", "Ks"]).await;

    let view = manager
        .perform_action(table_id, &dealer(), &TableAction::ResetTable)
        .await
        .unwrap();
    assert_eq!(view.phase, Phase::Waiting);
    assert!(view.game.is_none());
    assert!(view.is_joinable);
    assert!(view.blinds.timer_started_at.is_none());

    // Cards from the abandoned hand are free again.
    manager
        .perform_action(table_id, &dealer(), &TableAction::StartGame)
        .await
        .unwrap();
    deal(&manager, table_id, &["As"]).await;
}

#[tokio::test]
async fn test_duplicate_card_is_conflict_in_any_order() {
    let orders: [&[&str]; 3] = [
        &["As", "Ks", "Qs", "Js", "Ts", "As"],
        &["As", "As"],
        &["As", "Ks", "Qs", "Js", "Ts", "9s", "Ks"],
    ];
    for order in orders {
        let (manager, table_id) = seated_table().await;
        manager
            .perform_action(table_id, &dealer(), &TableAction::StartGame)
            .await
            .unwrap();
        let (last, rest) = order.split_last().unwrap();
        deal(&manager, table_id, rest).await;
        let err = manager
            .perform_action(table_id, &dealer(), &TableAction::DealCard { card: card(last) })
            .await
            .unwrap_err();
        assert!(matches!(err, TableError::DuplicateCard(c) if c == card(last)), "{order:?}: {err}");
    }
}

#[tokio::test]
async fn test_players_cannot_run_the_table() {
    let (manager, table_id) = seated_table().await;
    for action in [
        TableAction::StartGame,
        TableAction::ResetTable,
        TableAction::KickSeat { seat_number: 1 },
        TableAction::DealCard { card: card("As") },
    ] {
        let err = manager
            .perform_action(table_id, &Identity::from("alice"), &action)
            .await
            .unwrap_err();
        assert!(matches!(err, TableError::Unauthorized(_)), "{action:?}: {err}");
    }
}

#[tokio::test]
async fn test_hole_card_events_never_carry_cards() {
    let (manager, table_id) = seated_table().await;
    manager
        .perform_action(table_id, &dealer(), &TableAction::StartGame)
        .await
        .unwrap();
    deal(&manager, table_id, &["As", "Ks", "Qs"]).await;

    let delta = manager.fetch_delta(table_id, None).await.unwrap();
    let hole_events: Vec<&GameEvent> = delta
        .events
        .iter()
        .filter(|event| matches!(event.payload.action, EventAction::HoleCardDealt { .. }))
        .collect();
    assert_eq!(hole_events.len(), 3);
    for event in hole_events {
        let json = serde_json::to_string(&event.payload).unwrap();
        assert!(!json.contains("As") && !json.contains("Ks") && !json.contains("Qs"));
    }
}
