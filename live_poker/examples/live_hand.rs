//! Live Hand Example
//!
//! Plays one heads-up hand on an in-memory table and prints the event log
//! the way a following client would receive it.

use live_poker::{
    MemoryTableStore, NoopNotifier, TableAction, TableConfig, TableError, TableManager,
    TableResult, TableView,
    game::entities::{Identity, Phase, TableId},
};
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> TableResult<()> {
    println!("=== Live Hand Example ===\n");

    let manager = TableManager::new(Arc::new(MemoryTableStore::new()), Arc::new(NoopNotifier));
    let table = manager.create_table(&TableConfig::default()).await?;
    let dealer = Identity::from("dealer");
    let players = [Identity::from("alice"), Identity::from("bob")];

    for (seat_number, player) in (0u8..).zip(&players) {
        manager
            .perform_action(table.id, player, &TableAction::JoinSeat { seat_number })
            .await?;
    }
    manager
        .perform_action(table.id, &dealer, &TableAction::StartGame)
        .await?;

    let mut view = deal(&manager, table.id, &dealer, &["As", "Kd", "Ah", "Kc"]).await?;
    for street in [&["7c", "8d", "2s"][..], &["Jh"], &["3d"]] {
        view = close_betting(&manager, table.id, &players, view).await?;
        view = deal(&manager, table.id, &dealer, street).await?;
    }
    close_betting(&manager, table.id, &players, view).await?;
    manager
        .perform_action(table.id, &dealer, &TableAction::EndHand)
        .await?;

    let delta = manager.fetch_delta(table.id, None).await?;
    for event in &delta.events {
        println!(
            "#{:<3} {:<16} {}",
            event.id,
            event.payload.phase.as_str(),
            serde_json::to_string(&event.payload.action).unwrap_or_default()
        );
    }
    println!("\nCursor after replay: {:?}", delta.cursor);

    Ok(())
}

async fn deal(
    manager: &TableManager,
    table_id: TableId,
    dealer: &Identity,
    codes: &[&str],
) -> TableResult<TableView> {
    let mut view = manager.table_view(table_id, Some(dealer)).await?;
    for code in codes {
        let card = code
            .parse()
            .map_err(|e| TableError::Validation(format!("{e}")))?;
        view = manager
            .perform_action(table_id, dealer, &TableAction::DealCard { card })
            .await?;
    }
    Ok(view)
}

/// Whoever holds the turn calls or checks until the round closes.
async fn close_betting(
    manager: &TableManager,
    table_id: TableId,
    players: &[Identity],
    mut view: TableView,
) -> TableResult<TableView> {
    while view.phase == Phase::Betting {
        let Some(game) = &view.game else { break };
        let Some(seat) = game.assigned_seat else { break };
        let owes = view
            .seats
            .iter()
            .find(|s| s.seat_number == seat)
            .is_some_and(|s| s.current_bet < game.max_bet);
        let action = if owes { TableAction::Call } else { TableAction::Check };
        view = manager
            .perform_action(table_id, &players[usize::from(seat)], &action)
            .await?;
    }
    Ok(view)
}
