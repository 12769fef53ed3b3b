//! In-process [`TableStore`] for tests and local development.
//!
//! A single async mutex stands in for the table row lock: a transition runs
//! against a clone of the table's rows and is only written back on success.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::repository::{Committed, TableStore, Transition};
use crate::{
    device::models::PhysicalDevice,
    errors::{TableError, TableResult},
    events::models::GameEvent,
    game::{
        entities::{EventId, GameId, Identity, Seat, SeatId, Table, TableId},
        state_machine::TableSnapshot,
    },
    table::config::TableConfig,
};

#[derive(Default)]
struct MemoryState {
    tables: HashMap<TableId, TableSnapshot>,
    events: Vec<GameEvent>,
    devices: HashMap<String, PhysicalDevice>,
    last_table_id: TableId,
    last_seat_id: SeatId,
    last_game_id: GameId,
    last_event_id: EventId,
}

#[derive(Default)]
pub struct MemoryTableStore {
    state: Mutex<MemoryState>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn create_table(&self, config: &TableConfig) -> TableResult<Table> {
        config.validate()?;
        let mut state = self.state.lock().await;

        state.last_table_id += 1;
        let table = Table {
            id: state.last_table_id,
            name: config.name.clone(),
            dealer_id: Identity::new(config.dealer_id.clone()),
            small_blind: config.small_blind,
            big_blind: config.big_blind,
            blind_step_seconds: config.blind_step_seconds,
            blind_timer_started_at: None,
            is_joinable: true,
            seat_count: config.seat_count,
        };

        let mut seats = Vec::with_capacity(usize::from(config.seat_count));
        for seat_number in 0..config.seat_count {
            state.last_seat_id += 1;
            seats.push(Seat::empty(state.last_seat_id, table.id, seat_number));
        }

        state.tables.insert(
            table.id,
            TableSnapshot {
                table: table.clone(),
                game: None,
                seats,
            },
        );
        Ok(table)
    }

    async fn load(&self, table_id: TableId) -> TableResult<TableSnapshot> {
        let state = self.state.lock().await;
        state
            .tables
            .get(&table_id)
            .cloned()
            .ok_or(TableError::TableNotFound(table_id))
    }

    async fn transact(
        &self,
        table_id: TableId,
        now: DateTime<Utc>,
        transition: &mut Transition<'_>,
    ) -> TableResult<Committed> {
        let mut state = self.state.lock().await;
        let mut snapshot = state
            .tables
            .get(&table_id)
            .cloned()
            .ok_or(TableError::TableNotFound(table_id))?;

        let payloads = transition(&mut snapshot)?;
        if payloads.is_empty() {
            return Ok(Committed {
                snapshot,
                events: Vec::new(),
            });
        }

        if let Some(game) = snapshot.game.as_mut().filter(|game| game.id.is_none()) {
            state.last_game_id += 1;
            game.id = Some(state.last_game_id);
        }
        let game_id = snapshot.game.as_ref().and_then(|game| game.id);

        let mut events = Vec::with_capacity(payloads.len());
        for payload in payloads {
            state.last_event_id += 1;
            events.push(GameEvent {
                id: state.last_event_id,
                table_id,
                game_id,
                payload,
                created_at: now,
            });
        }
        state.events.extend(events.iter().cloned());
        state.tables.insert(table_id, snapshot.clone());

        Ok(Committed { snapshot, events })
    }

    async fn fetch_events(
        &self,
        table_id: TableId,
        after: Option<EventId>,
    ) -> TableResult<Vec<GameEvent>> {
        let state = self.state.lock().await;
        Ok(state
            .events
            .iter()
            .filter(|event| event.table_id == table_id)
            .filter(|event| after.is_none_or(|after| event.id > after))
            .cloned()
            .collect())
    }

    async fn find_device(&self, serial: &str) -> TableResult<Option<PhysicalDevice>> {
        let state = self.state.lock().await;
        Ok(state.devices.get(serial).cloned())
    }

    async fn find_table_devices(&self, table_id: TableId) -> TableResult<Vec<PhysicalDevice>> {
        let state = self.state.lock().await;
        let mut devices: Vec<PhysicalDevice> = state
            .devices
            .values()
            .filter(|device| device.table_id == table_id)
            .cloned()
            .collect();
        devices.sort_by(|a, b| a.serial.cmp(&b.serial));
        Ok(devices)
    }

    async fn touch_device(&self, serial: &str, now: DateTime<Utc>) -> TableResult<()> {
        let mut state = self.state.lock().await;
        if let Some(device) = state.devices.get_mut(serial) {
            device.last_seen_at = Some(now);
        }
        Ok(())
    }

    async fn upsert_device(&self, device: &PhysicalDevice) -> TableResult<()> {
        let mut state = self.state.lock().await;
        if !state.tables.contains_key(&device.table_id) {
            return Err(TableError::TableNotFound(device.table_id));
        }
        let last_seen_at = state
            .devices
            .get(&device.serial)
            .and_then(|existing| existing.last_seen_at);
        state.devices.insert(
            device.serial.clone(),
            PhysicalDevice {
                last_seen_at,
                ..device.clone()
            },
        );
        Ok(())
    }

    async fn health_check(&self) -> TableResult<()> {
        Ok(())
    }
}
