//! Cursor-based table follower.
//!
//! A change signal only says "pull again"; the follower remembers the last
//! event id it has seen and asks for everything after it.

use std::future::Future;

use anyhow::Result;
use live_poker::{
    ChangeSignal, EventDelta, GameEvent,
    game::entities::{EventId, TableId},
};

use crate::api_client::ApiClient;

/// Anything that can answer a cursor read.
pub trait DeltaSource {
    fn fetch_delta(
        &self,
        table_id: TableId,
        after_id: Option<EventId>,
    ) -> impl Future<Output = Result<EventDelta>> + Send;
}

impl DeltaSource for ApiClient {
    fn fetch_delta(
        &self,
        table_id: TableId,
        after_id: Option<EventId>,
    ) -> impl Future<Output = Result<EventDelta>> + Send {
        self.fetch_events(table_id, after_id)
    }
}

pub struct TableFollower<S> {
    source: S,
    table_id: TableId,
    cursor: Option<EventId>,
}

impl<S: DeltaSource> TableFollower<S> {
    /// Follows `table_id` from the start of its log.
    pub fn new(source: S, table_id: TableId) -> Self {
        Self {
            source,
            table_id,
            cursor: None,
        }
    }

    /// Resumes after an event the caller already applied.
    pub fn resume_from(source: S, table_id: TableId, cursor: Option<EventId>) -> Self {
        Self {
            source,
            table_id,
            cursor,
        }
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn cursor(&self) -> Option<EventId> {
        self.cursor
    }

    pub fn is_for(&self, signal: &ChangeSignal) -> bool {
        signal.table_id == self.table_id
    }

    /// Pulls everything newer than the cursor and advances it. On error the
    /// cursor is left alone so the next signal retries the same range.
    pub async fn sync(&mut self) -> Result<Vec<GameEvent>> {
        let delta = self.source.fetch_delta(self.table_id, self.cursor).await?;
        if delta.cursor.is_some() {
            self.cursor = delta.cursor;
        }
        Ok(delta.events)
    }
}
