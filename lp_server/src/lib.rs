//! HTTP and WebSocket surface for live-dealer tables.
//!
//! [`build_state`] wires the engine from a [`config::ServerConfig`];
//! [`api::create_router`] turns that state into an axum router.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;

use anyhow::Context;
use live_poker::{
    BotRegistry, BroadcastNotifier, BroadcastSignaler, DeviceVerifier, MemoryTableStore,
    PgTableStore, TableManager, TableStore, TokenVerifier, VideoBridge, VideoWebhookVerifier,
    db::Database,
};
use log::{info, warn};
use std::sync::Arc;

use api::AppState;
use config::ServerConfig;

/// Connect the store, build the engine and provision the startup tables.
///
/// Without database settings the in-memory store is used, which loses
/// everything on restart.
pub async fn build_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn TableStore> = match &config.database {
        Some(db_config) => {
            let db = Database::new(db_config)
                .await
                .context("Failed to connect to database")?;
            db.migrate().await.context("Failed to run migrations")?;
            info!("Database connected and migrated");
            Arc::new(PgTableStore::new(db.pool().clone()))
        }
        None => {
            warn!("DATABASE_URL not set; using the in-memory table store");
            Arc::new(MemoryTableStore::new())
        }
    };

    let defaults = &config.table_defaults;
    let bots = BotRegistry::new(&defaults.bot_prefix, defaults.seat_count);
    let notifier = BroadcastNotifier::default();
    let signaler = BroadcastSignaler::default();

    let table_manager = TableManager::new(store, Arc::new(notifier.clone()))
        .with_bots(bots.clone())
        .with_verifier(DeviceVerifier::new(config.security.device_freshness_secs));

    for index in 0..config.num_tables {
        let table = table_manager
            .create_table(&defaults.table_config(index))
            .await
            .with_context(|| format!("Failed to create table {}", index + 1))?;
        info!(
            "Table {} ready (id {}, dealer {})",
            table.name, table.id, table.dealer_id
        );
    }

    let video = config.security.video_api_secret.as_ref().map(|secret| {
        let verifier = VideoWebhookVerifier::new(secret.clone())
            .with_leeway(config.security.video_leeway_secs);
        VideoBridge::new(table_manager.clone(), verifier, Arc::new(signaler.clone()))
    });

    Ok(AppState {
        table_manager,
        tokens: TokenVerifier::new(config.security.jwt_secret.clone(), bots),
        notifier,
        signaler,
        video,
        scheduler_token: config.security.scheduler_token.clone(),
    })
}
