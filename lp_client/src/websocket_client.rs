//! WebSocket change feed plus an optional command prompt.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use live_poker::{ChangeSignal, game::entities::TableId};
use tokio::io::AsyncBufReadExt;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::{
    api_client::ApiClient,
    commands::{HELP_TEXT, parse_command},
    follower::{DeltaSource, TableFollower},
    render::{describe_event, render_view},
};

/// Follows one table and, with a session, forwards typed commands.
pub struct TableWatcher {
    api: ApiClient,
    table_id: TableId,
}

impl TableWatcher {
    pub fn new(api: ApiClient, table_id: TableId) -> Self {
        Self { api, table_id }
    }

    /// Connect to the feed and run until the server closes it or the user quits.
    pub async fn connect_and_follow(self) -> Result<()> {
        let ws_url = self.api.websocket_url(self.table_id);
        println!("Connecting to {}...", ws_url);

        let (ws_stream, _) = connect_async(&ws_url)
            .await
            .context("Failed to connect to WebSocket")?;
        println!("Connected! Following table {}...\n", self.table_id);

        let (mut write, mut read) = ws_stream.split();

        let mut follower = TableFollower::new(self.api.clone(), self.table_id);
        print_new_events(&mut follower).await;

        let read_handle = tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ChangeSignal>(&text) {
                        Ok(signal) if follower.is_for(&signal) => {
                            print_new_events(&mut follower).await;
                        }
                        Ok(_) => {}
                        Err(e) => eprintln!("Failed to parse change signal: {}", e),
                    },
                    Ok(Message::Close(_)) => {
                        println!("Server closed connection");
                        break;
                    }
                    Err(e) => {
                        eprintln!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
        });

        if self.api.has_session() {
            self.prompt_loop().await;
        } else {
            println!("No session token; watching only. Press Ctrl+C to stop.");
            let _ = tokio::signal::ctrl_c().await;
        }

        let _ = write.close().await;
        read_handle.abort();

        Ok(())
    }

    async fn prompt_loop(&self) {
        println!("{}\n", HELP_TEXT);

        let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut line = String::new();

        loop {
            line.clear();
            match stdin.read_line(&mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    let input = line.trim();
                    match input {
                        "" => continue,
                        "quit" | "exit" => {
                            println!("Disconnecting...");
                            break;
                        }
                        "help" | "?" => {
                            println!("{}", HELP_TEXT);
                            continue;
                        }
                        "view" => {
                            match self.api.table_view(self.table_id).await {
                                Ok(view) => print!("{}", render_view(&view)),
                                Err(e) => eprintln!("Error: {:#}", e),
                            }
                            continue;
                        }
                        _ => {}
                    }

                    let action = match parse_command(input) {
                        Ok(action) => action,
                        Err(e) => {
                            eprintln!("{}", e);
                            continue;
                        }
                    };
                    match self.api.perform_action(self.table_id, &action).await {
                        Ok(view) => print!("{}", render_view(&view)),
                        Err(e) => eprintln!("Error: {:#}", e),
                    }
                }
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    break;
                }
            }
        }
    }
}

async fn print_new_events<S: DeltaSource>(follower: &mut TableFollower<S>) {
    match follower.sync().await {
        Ok(events) => {
            for event in &events {
                println!("{}", describe_event(event));
            }
        }
        Err(e) => eprintln!("Failed to sync table {}: {:#}", follower.table_id(), e),
    }
}
