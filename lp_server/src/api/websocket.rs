//! WebSocket push channels.
//!
//! Two one-way feeds, both server to client:
//!
//! - `GET /ws/tables/{table_id}` sends `{"table_id":1,"timestamp":"..."}`
//!   whenever the table commits a change. The signal carries no state;
//!   clients pull `/api/v1/tables/{id}/events?after_id=N` in response.
//! - `GET /ws/devices/{serial}` sends `{"serial":"CAM-1","action":"start"}`
//!   camera commands addressed to that device.
//!
//! Client frames other than close are ignored.
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:6969/ws/tables/1');
//! ws.onmessage = () => pullDelta();
//! ```

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use live_poker::{ChangeSignal, StreamCommand, game::entities::TableId};
use log::{info, warn};
use serde::Serialize;
use tokio::sync::broadcast::{Receiver, error::RecvError};

use super::{AppState, tables::api_error};
use crate::metrics;

/// Upgrade to a table change feed. Unknown tables get `404 Not Found`
/// before the upgrade.
pub async fn table_updates(
    ws: WebSocketUpgrade,
    Path(table_id): Path<TableId>,
    State(state): State<AppState>,
) -> Response {
    if let Err(e) = state.table_manager.store().load(table_id).await {
        return api_error(&e).into_response();
    }

    // Subscribe before upgrading so no commit between now and the first
    // poll is missed.
    let signals = state.notifier.subscribe();
    metrics::websocket_connections_total("table");
    ws.on_upgrade(move |socket| stream_table_signals(socket, table_id, signals))
}

/// Upgrade to a device command feed. Connecting counts as a heartbeat.
pub async fn device_commands(
    ws: WebSocketUpgrade,
    Path(serial): Path<String>,
    State(state): State<AppState>,
) -> Response {
    if let Err(e) = state.table_manager.identify_device(&serial).await {
        return api_error(&e).into_response();
    }

    let commands = state.signaler.subscribe();
    metrics::websocket_connections_total("device");
    ws.on_upgrade(move |socket| stream_device_commands(socket, serial, commands))
}

async fn stream_table_signals(
    socket: WebSocket,
    table_id: TableId,
    mut signals: Receiver<ChangeSignal>,
) {
    let (mut sender, mut receiver) = socket.split();
    info!("WebSocket connected: table={}", table_id);

    loop {
        tokio::select! {
            signal = signals.recv() => {
                let signal = match signal {
                    Ok(signal) if signal.table_id == table_id => signal,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        // Dropped signals only ever meant "pull again".
                        warn!("Table {} subscriber lagged by {} signals", table_id, skipped);
                        ChangeSignal {
                            table_id,
                            timestamp: Utc::now(),
                        }
                    }
                    Err(RecvError::Closed) => break,
                };
                if send_json(&mut sender, &signal).await.is_err() {
                    break;
                }
                metrics::websocket_messages_sent("table");
            }
            incoming = receiver.next() => {
                if !keep_open(incoming) {
                    break;
                }
            }
        }
    }

    info!("WebSocket disconnected: table={}", table_id);
}

async fn stream_device_commands(
    socket: WebSocket,
    serial: String,
    mut commands: Receiver<StreamCommand>,
) {
    let (mut sender, mut receiver) = socket.split();
    info!("Device connected: serial={}", serial);

    loop {
        tokio::select! {
            command = commands.recv() => {
                let command = match command {
                    Ok(command) if command.serial == serial => command,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Device {} lagged by {} commands", serial, skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if send_json(&mut sender, &command).await.is_err() {
                    break;
                }
                metrics::websocket_messages_sent("device");
            }
            incoming = receiver.next() => {
                if !keep_open(incoming) {
                    break;
                }
            }
        }
    }

    info!("Device disconnected: serial={}", serial);
}

fn keep_open(incoming: Option<Result<Message, axum::Error>>) -> bool {
    matches!(incoming, Some(Ok(message)) if !matches!(message, Message::Close(_)))
}

async fn send_json<T: Serialize>(
    sender: &mut SplitSink<WebSocket, Message>,
    value: &T,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(value).map_err(axum::Error::new)?;
    sender.send(Message::Text(text.into())).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_open() {
        assert!(keep_open(Some(Ok(Message::Text("hi".into())))));
        assert!(!keep_open(Some(Ok(Message::Close(None)))));
        assert!(!keep_open(None));
    }
}
