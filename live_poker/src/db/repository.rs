//! Table store capability and its PostgreSQL implementation.
//!
//! Every state change goes through [`TableStore::transact`]: the store loads
//! the table's rows under an exclusive lock, hands them to the transition
//! closure, and persists the result together with the emitted events in one
//! transaction. A closure error discards everything.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow, types::Json};

use crate::{
    device::models::{DeviceType, PhysicalDevice},
    errors::{TableError, TableResult},
    events::models::{EventPayload, GameEvent},
    game::{
        entities::{
            Card, EventId, Game, Identity, Phase, QuickAction, Seat, SeatStatus, Table, TableId,
        },
        state_machine::TableSnapshot,
    },
    table::config::TableConfig,
};

/// Transition run inside a store transaction.
pub type Transition<'a> =
    dyn FnMut(&mut TableSnapshot) -> TableResult<Vec<EventPayload>> + Send + 'a;

/// Outcome of a committed transition.
#[derive(Clone, Debug)]
pub struct Committed {
    pub snapshot: TableSnapshot,
    /// Appended events, in id order. Empty when the transition changed nothing.
    pub events: Vec<GameEvent>,
}

#[async_trait]
pub trait TableStore: Send + Sync {
    /// Creates a table and provisions one seat row per seat number.
    async fn create_table(&self, config: &TableConfig) -> TableResult<Table>;

    /// Non-transactional read of a table's current rows.
    async fn load(&self, table_id: TableId) -> TableResult<TableSnapshot>;

    /// Runs `transition` against the locked rows of `table_id` and commits
    /// the mutated snapshot plus its events atomically.
    async fn transact(
        &self,
        table_id: TableId,
        now: DateTime<Utc>,
        transition: &mut Transition<'_>,
    ) -> TableResult<Committed>;

    /// Events with `id > after`, oldest first.
    async fn fetch_events(
        &self,
        table_id: TableId,
        after: Option<EventId>,
    ) -> TableResult<Vec<GameEvent>>;

    async fn find_device(&self, serial: &str) -> TableResult<Option<PhysicalDevice>>;

    async fn find_table_devices(&self, table_id: TableId) -> TableResult<Vec<PhysicalDevice>>;

    /// Heartbeat; outside any table transaction.
    async fn touch_device(&self, serial: &str, now: DateTime<Utc>) -> TableResult<()>;

    /// Provisioning hook for devices.
    async fn upsert_device(&self, device: &PhysicalDevice) -> TableResult<()>;

    async fn health_check(&self) -> TableResult<()>;
}

/// PostgreSQL implementation of [`TableStore`]
pub struct PgTableStore {
    pool: PgPool,
}

impl PgTableStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn corrupt(what: impl Into<String>) -> TableError {
    TableError::CorruptState(what.into())
}

fn small_to_u8(value: i16, column: &str) -> TableResult<u8> {
    u8::try_from(value).map_err(|_| corrupt(format!("{column} out of range: {value}")))
}

fn parse_cards(codes: Vec<String>) -> TableResult<Vec<Card>> {
    codes
        .iter()
        .map(|code| code.parse().map_err(|_| corrupt(format!("bad card code {code:?}"))))
        .collect()
}

fn card_codes(cards: &[Card]) -> Vec<String> {
    cards.iter().map(ToString::to_string).collect()
}

const TABLE_COLUMNS: &str = "id, name, dealer_id, small_blind, big_blind, blind_step_seconds,
    blind_timer_started_at, is_joinable, seat_count";

const SEAT_COLUMNS: &str = "id, table_id, seat_number, occupant, cards, current_bet, is_active,
    status, win_amount, is_showing, quick_action";

const GAME_COLUMNS: &str = "id, table_id, state, assigned_seat_id, dealer_button_seat_id,
    community_cards, bet_count, required_bet_count, pot, pot_awarded, created_at";

const DEVICE_COLUMNS: &str = "serial, device_type, table_id, seat_number, public_key, last_seen_at";

fn table_from_row(row: &PgRow) -> TableResult<Table> {
    Ok(Table {
        id: row.get("id"),
        name: row.get("name"),
        dealer_id: Identity::new(row.get::<String, _>("dealer_id")),
        small_blind: row.get("small_blind"),
        big_blind: row.get("big_blind"),
        blind_step_seconds: row.get("blind_step_seconds"),
        blind_timer_started_at: row.get("blind_timer_started_at"),
        is_joinable: row.get("is_joinable"),
        seat_count: small_to_u8(row.get("seat_count"), "seat_count")?,
    })
}

fn seat_from_row(row: &PgRow) -> TableResult<Seat> {
    let status: String = row.get("status");
    let quick_action: Option<String> = row.get("quick_action");
    Ok(Seat {
        id: row.get("id"),
        table_id: row.get("table_id"),
        seat_number: small_to_u8(row.get("seat_number"), "seat_number")?,
        occupant: row.get::<Option<String>, _>("occupant").map(Identity::new),
        cards: parse_cards(row.get("cards"))?,
        current_bet: row.get("current_bet"),
        is_active: row.get("is_active"),
        status: status.parse::<SeatStatus>().map_err(corrupt)?,
        win_amount: row.get("win_amount"),
        is_showing: row.get("is_showing"),
        quick_action: quick_action
            .map(|action| action.parse::<QuickAction>())
            .transpose()
            .map_err(corrupt)?,
    })
}

fn game_from_row(row: &PgRow) -> TableResult<Game> {
    let state: String = row.get("state");
    let bet_count: i32 = row.get("bet_count");
    let required_bet_count: i32 = row.get("required_bet_count");
    Ok(Game {
        id: Some(row.get("id")),
        table_id: row.get("table_id"),
        state: state.parse::<Phase>().map_err(corrupt)?,
        assigned_seat_id: row.get("assigned_seat_id"),
        dealer_button_seat_id: row.get("dealer_button_seat_id"),
        community_cards: parse_cards(row.get("community_cards"))?,
        bet_count: u32::try_from(bet_count).map_err(|_| corrupt("negative bet_count"))?,
        required_bet_count: u32::try_from(required_bet_count)
            .map_err(|_| corrupt("negative required_bet_count"))?,
        pot: row.get("pot"),
        pot_awarded: row.get("pot_awarded"),
        created_at: row.get("created_at"),
    })
}

fn device_from_row(row: &PgRow) -> TableResult<PhysicalDevice> {
    let device_type: String = row.get("device_type");
    Ok(PhysicalDevice {
        serial: row.get("serial"),
        device_type: device_type.parse::<DeviceType>().map_err(corrupt)?,
        table_id: row.get("table_id"),
        seat_number: row
            .get::<Option<i16>, _>("seat_number")
            .map(|n| small_to_u8(n, "seat_number"))
            .transpose()?,
        public_key: row.get("public_key"),
        last_seen_at: row.get("last_seen_at"),
    })
}

fn event_from_row(row: &PgRow) -> GameEvent {
    let Json(payload): Json<EventPayload> = row.get("payload");
    GameEvent {
        id: row.get("id"),
        table_id: row.get("table_id"),
        game_id: row.get("game_id"),
        payload,
        created_at: row.get("created_at"),
    }
}

async fn load_table(conn: &mut PgConnection, table_id: TableId, lock: bool) -> TableResult<Table> {
    let sql = format!(
        "SELECT {TABLE_COLUMNS} FROM poker_tables WHERE id = $1{}",
        if lock { " FOR UPDATE" } else { "" }
    );
    let row = sqlx::query(&sql)
        .bind(table_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(TableError::TableNotFound(table_id))?;
    table_from_row(&row)
}

async fn load_current_game(conn: &mut PgConnection, table_id: TableId) -> TableResult<Option<Game>> {
    let sql = format!(
        "SELECT {GAME_COLUMNS} FROM games WHERE table_id = $1
         ORDER BY created_at DESC, id DESC LIMIT 1"
    );
    let row = sqlx::query(&sql)
        .bind(table_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(game_from_row).transpose()
}

async fn load_seats(conn: &mut PgConnection, table_id: TableId) -> TableResult<Vec<Seat>> {
    let sql = format!("SELECT {SEAT_COLUMNS} FROM seats WHERE table_id = $1 ORDER BY seat_number");
    let rows = sqlx::query(&sql)
        .bind(table_id)
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(seat_from_row).collect()
}

async fn load_snapshot(
    conn: &mut PgConnection,
    table_id: TableId,
    lock: bool,
) -> TableResult<TableSnapshot> {
    let table = load_table(conn, table_id, lock).await?;
    let game = load_current_game(conn, table_id).await?;
    let seats = load_seats(conn, table_id).await?;
    Ok(TableSnapshot { table, game, seats })
}

async fn save_table(conn: &mut PgConnection, table: &Table) -> TableResult<()> {
    sqlx::query(
        "UPDATE poker_tables SET blind_timer_started_at = $2, is_joinable = $3 WHERE id = $1",
    )
    .bind(table.id)
    .bind(table.blind_timer_started_at)
    .bind(table.is_joinable)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn save_seats(conn: &mut PgConnection, seats: &[Seat]) -> TableResult<()> {
    for seat in seats {
        sqlx::query(
            "UPDATE seats SET occupant = $2, cards = $3, current_bet = $4, is_active = $5,
                status = $6, win_amount = $7, is_showing = $8, quick_action = $9
             WHERE id = $1",
        )
        .bind(seat.id)
        .bind(seat.occupant.as_ref().map(Identity::as_str))
        .bind(card_codes(&seat.cards))
        .bind(seat.current_bet)
        .bind(seat.is_active)
        .bind(seat.status.as_str())
        .bind(seat.win_amount)
        .bind(seat.is_showing)
        .bind(seat.quick_action.map(|action| action.as_str()))
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Inserts a freshly started hand, updates the current one, or deletes the
/// table's hands after a reset. Assigns the new id into the snapshot.
async fn save_game(
    conn: &mut PgConnection,
    snapshot: &mut TableSnapshot,
    had_game: bool,
) -> TableResult<()> {
    let table_id = snapshot.table.id;
    let Some(game) = snapshot.game.as_mut() else {
        if had_game {
            sqlx::query("DELETE FROM games WHERE table_id = $1")
                .bind(table_id)
                .execute(&mut *conn)
                .await?;
        }
        return Ok(());
    };

    let bet_count = i32::try_from(game.bet_count).map_err(|_| corrupt("bet_count overflow"))?;
    let required = i32::try_from(game.required_bet_count)
        .map_err(|_| corrupt("required_bet_count overflow"))?;

    match game.id {
        Some(id) => {
            sqlx::query(
                "UPDATE games SET state = $2, assigned_seat_id = $3, dealer_button_seat_id = $4,
                    community_cards = $5, bet_count = $6, required_bet_count = $7, pot = $8,
                    pot_awarded = $9
                 WHERE id = $1",
            )
            .bind(id)
            .bind(game.state.as_str())
            .bind(game.assigned_seat_id)
            .bind(game.dealer_button_seat_id)
            .bind(card_codes(&game.community_cards))
            .bind(bet_count)
            .bind(required)
            .bind(game.pot)
            .bind(game.pot_awarded)
            .execute(&mut *conn)
            .await?;
        }
        None => {
            let row = sqlx::query(
                "INSERT INTO games (table_id, state, assigned_seat_id, dealer_button_seat_id,
                    community_cards, bet_count, required_bet_count, pot, pot_awarded, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                 RETURNING id",
            )
            .bind(table_id)
            .bind(game.state.as_str())
            .bind(game.assigned_seat_id)
            .bind(game.dealer_button_seat_id)
            .bind(card_codes(&game.community_cards))
            .bind(bet_count)
            .bind(required)
            .bind(game.pot)
            .bind(game.pot_awarded)
            .bind(game.created_at)
            .fetch_one(&mut *conn)
            .await?;
            game.id = Some(row.get("id"));
        }
    }
    Ok(())
}

#[async_trait]
impl TableStore for PgTableStore {
    async fn create_table(&self, config: &TableConfig) -> TableResult<Table> {
        config.validate()?;
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO poker_tables (name, dealer_id, small_blind, big_blind, blind_step_seconds, seat_count)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {TABLE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&config.name)
            .bind(&config.dealer_id)
            .bind(config.small_blind)
            .bind(config.big_blind)
            .bind(config.blind_step_seconds)
            .bind(i16::from(config.seat_count))
            .fetch_one(&mut *tx)
            .await?;
        let table = table_from_row(&row)?;

        for seat_number in 0..config.seat_count {
            sqlx::query("INSERT INTO seats (table_id, seat_number) VALUES ($1, $2)")
                .bind(table.id)
                .bind(i16::from(seat_number))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!("Created table {} ({})", table.id, table.name);
        Ok(table)
    }

    async fn load(&self, table_id: TableId) -> TableResult<TableSnapshot> {
        let mut conn = self.pool.acquire().await?;
        load_snapshot(&mut conn, table_id, false).await
    }

    async fn transact(
        &self,
        table_id: TableId,
        now: DateTime<Utc>,
        transition: &mut Transition<'_>,
    ) -> TableResult<Committed> {
        let mut tx = self.pool.begin().await?;

        // Serializes every writer of this table until commit.
        let mut snapshot = load_snapshot(&mut tx, table_id, true).await?;
        let had_game = snapshot.game.is_some();

        // Dropping `tx` on any error below rolls everything back.
        let payloads = transition(&mut snapshot)?;
        if payloads.is_empty() {
            tx.rollback().await?;
            return Ok(Committed {
                snapshot,
                events: Vec::new(),
            });
        }

        save_table(&mut tx, &snapshot.table).await?;
        save_game(&mut tx, &mut snapshot, had_game).await?;
        save_seats(&mut tx, &snapshot.seats).await?;

        let game_id = snapshot.game.as_ref().and_then(|game| game.id);
        let mut events = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let row = sqlx::query(
                "INSERT INTO game_events (table_id, game_id, payload, created_at)
                 VALUES ($1, $2, $3, $4)
                 RETURNING id",
            )
            .bind(table_id)
            .bind(game_id)
            .bind(Json(&payload))
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            events.push(GameEvent {
                id: row.get("id"),
                table_id,
                game_id,
                payload,
                created_at: now,
            });
        }

        tx.commit().await?;
        Ok(Committed { snapshot, events })
    }

    async fn fetch_events(
        &self,
        table_id: TableId,
        after: Option<EventId>,
    ) -> TableResult<Vec<GameEvent>> {
        let rows = sqlx::query(
            "SELECT id, table_id, game_id, payload, created_at FROM game_events
             WHERE table_id = $1 AND ($2::BIGINT IS NULL OR id > $2)
             ORDER BY id",
        )
        .bind(table_id)
        .bind(after)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(event_from_row).collect())
    }

    async fn find_device(&self, serial: &str) -> TableResult<Option<PhysicalDevice>> {
        let sql = format!("SELECT {DEVICE_COLUMNS} FROM physical_devices WHERE serial = $1");
        let row = sqlx::query(&sql)
            .bind(serial)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(device_from_row).transpose()
    }

    async fn find_table_devices(&self, table_id: TableId) -> TableResult<Vec<PhysicalDevice>> {
        let sql = format!(
            "SELECT {DEVICE_COLUMNS} FROM physical_devices WHERE table_id = $1 ORDER BY serial"
        );
        let rows = sqlx::query(&sql)
            .bind(table_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(device_from_row).collect()
    }

    async fn touch_device(&self, serial: &str, now: DateTime<Utc>) -> TableResult<()> {
        sqlx::query("UPDATE physical_devices SET last_seen_at = $2 WHERE serial = $1")
            .bind(serial)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_device(&self, device: &PhysicalDevice) -> TableResult<()> {
        sqlx::query(
            "INSERT INTO physical_devices (serial, device_type, table_id, seat_number, public_key)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (serial) DO UPDATE SET device_type = EXCLUDED.device_type,
                table_id = EXCLUDED.table_id, seat_number = EXCLUDED.seat_number,
                public_key = EXCLUDED.public_key",
        )
        .bind(&device.serial)
        .bind(device.device_type.as_str())
        .bind(device.table_id)
        .bind(device.seat_number.map(i16::from))
        .bind(&device.public_key)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn health_check(&self) -> TableResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
