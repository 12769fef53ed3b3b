//! WebSocket push feeds against a live listener.

use futures_util::StreamExt;
use live_poker::{
    BotRegistry, BroadcastNotifier, BroadcastSignaler, CameraSignaler, ChangeSignal,
    MemoryTableStore, PhysicalDevice, StreamCommand, TableAction, TableConfig, TableManager,
    TokenVerifier,
    device::DeviceType,
    game::entities::{Identity, TableId},
    video::StreamAction,
};
use lp_server::api::{AppState, create_router};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, time::timeout};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};

type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn spawn_server() -> (SocketAddr, AppState, TableId) {
    let notifier = BroadcastNotifier::default();
    let signaler = BroadcastSignaler::default();
    let table_manager = TableManager::new(
        Arc::new(MemoryTableStore::new()),
        Arc::new(notifier.clone()),
    );
    let table = table_manager
        .create_table(&TableConfig::default())
        .await
        .unwrap();

    let state = AppState {
        table_manager,
        tokens: TokenVerifier::new("test_secret_key_for_testing_only_0123456789", BotRegistry::default()),
        notifier,
        signaler,
        video: None,
        scheduler_token: None,
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state, table.id)
}

async fn next_text(client: &mut Client) -> String {
    loop {
        let message = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = message {
            return text.to_string();
        }
    }
}

async fn join(state: &AppState, table_id: TableId, name: &str, seat_number: u8) {
    state
        .table_manager
        .perform_action(
            table_id,
            &Identity::from(name),
            &TableAction::JoinSeat { seat_number },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_table_feed_signals_changes() {
    let (addr, state, table_id) = spawn_server().await;
    let (mut client, _) = connect_async(format!("ws://{addr}/ws/tables/{table_id}"))
        .await
        .unwrap();

    join(&state, table_id, "alice", 0).await;

    let signal: ChangeSignal = serde_json::from_str(&next_text(&mut client).await).unwrap();
    assert_eq!(signal.table_id, table_id);
}

#[tokio::test]
async fn test_table_feed_ignores_other_tables() {
    let (addr, state, table_id) = spawn_server().await;
    let other = state
        .table_manager
        .create_table(&TableConfig::default())
        .await
        .unwrap();
    let (mut client, _) = connect_async(format!("ws://{addr}/ws/tables/{table_id}"))
        .await
        .unwrap();

    join(&state, other.id, "bob", 0).await;
    join(&state, table_id, "alice", 0).await;

    let signal: ChangeSignal = serde_json::from_str(&next_text(&mut client).await).unwrap();
    assert_eq!(signal.table_id, table_id);
}

#[tokio::test]
async fn test_failed_action_sends_nothing() {
    let (addr, state, table_id) = spawn_server().await;
    let (mut client, _) = connect_async(format!("ws://{addr}/ws/tables/{table_id}"))
        .await
        .unwrap();

    // Not enough players: rejected, no signal.
    let err = state
        .table_manager
        .perform_action(table_id, &Identity::from("dealer"), &TableAction::StartGame)
        .await;
    assert!(err.is_err());

    let quiet = timeout(Duration::from_millis(200), client.next()).await;
    assert!(quiet.is_err());
}

#[tokio::test]
async fn test_unknown_table_is_refused() {
    let (addr, _, _) = spawn_server().await;
    assert!(connect_async(format!("ws://{addr}/ws/tables/999")).await.is_err());
}

#[tokio::test]
async fn test_device_feed_receives_own_commands() {
    let (addr, state, table_id) = spawn_server().await;
    state
        .table_manager
        .register_device(&PhysicalDevice {
            serial: "CAM-1".to_string(),
            device_type: DeviceType::Card,
            table_id,
            seat_number: Some(0),
            public_key: None,
            last_seen_at: None,
        })
        .await
        .unwrap();

    let (mut client, _) = connect_async(format!("ws://{addr}/ws/devices/CAM-1"))
        .await
        .unwrap();

    // Connecting counts as a heartbeat.
    let device = state
        .table_manager
        .store()
        .find_device("CAM-1")
        .await
        .unwrap()
        .unwrap();
    assert!(device.last_seen_at.is_some());

    state.signaler.signal(StreamCommand {
        serial: "CAM-2".to_string(),
        action: StreamAction::Start,
    });
    state.signaler.signal(StreamCommand {
        serial: "CAM-1".to_string(),
        action: StreamAction::Stop,
    });

    let command: StreamCommand = serde_json::from_str(&next_text(&mut client).await).unwrap();
    assert_eq!(command.serial, "CAM-1");
    assert_eq!(command.action, StreamAction::Stop);
}

#[tokio::test]
async fn test_unknown_device_is_refused() {
    let (addr, _, _) = spawn_server().await;
    assert!(
        connect_async(format!("ws://{addr}/ws/devices/NOPE"))
            .await
            .is_err()
    );
}
