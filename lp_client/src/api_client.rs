//! HTTP API client for the table server.

use anyhow::{Context, Result};
use live_poker::{
    EventDelta, TableAction, TableView,
    game::{
        blinds::BlindState,
        entities::{EventId, TableId},
    },
};
use serde::Deserialize;

/// Error body returned by the server for rejected requests.
#[derive(Debug, Deserialize)]
pub struct ServerError {
    pub error: String,
    pub code: String,
}

/// API client for communicating with the table server.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    access_token: Option<String>,
}

impl ApiClient {
    /// Create a new API client without a session.
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            access_token: None,
        }
    }

    /// Attach a session token issued by the identity provider.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn has_session(&self) -> bool {
        self.access_token.is_some()
    }

    /// Events after `after_id`, oldest first.
    pub async fn fetch_events(
        &self,
        table_id: TableId,
        after_id: Option<EventId>,
    ) -> Result<EventDelta> {
        let mut request = self
            .client
            .get(format!("{}/api/v1/tables/{}/events", self.base_url, table_id));
        if let Some(after_id) = after_id {
            request = request.query(&[("after_id", after_id)]);
        }

        let response = request
            .send()
            .await
            .context("Failed to send events request")?;
        let response = check_status(response, "Fetching events").await?;

        response
            .json()
            .await
            .context("Failed to parse events response")
    }

    /// Current blind level and timer.
    pub async fn blinds(&self, table_id: TableId) -> Result<BlindState> {
        let response = self
            .client
            .get(format!("{}/api/v1/tables/{}/blinds", self.base_url, table_id))
            .send()
            .await
            .context("Failed to send blinds request")?;
        let response = check_status(response, "Fetching blinds").await?;

        response
            .json()
            .await
            .context("Failed to parse blinds response")
    }

    /// The table as this session may see it.
    pub async fn table_view(&self, table_id: TableId) -> Result<TableView> {
        let token = self.access_token.as_ref().context("Not authenticated")?;

        let response = self
            .client
            .get(format!("{}/api/v1/tables/{}", self.base_url, table_id))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .context("Failed to send table request")?;
        let response = check_status(response, "Fetching table").await?;

        response
            .json()
            .await
            .context("Failed to parse table response")
    }

    /// Submit one action; returns the table after it was applied.
    pub async fn perform_action(&self, table_id: TableId, action: &TableAction) -> Result<TableView> {
        let token = self.access_token.as_ref().context("Not authenticated")?;

        let response = self
            .client
            .post(format!("{}/api/v1/tables/{}/actions", self.base_url, table_id))
            .header("Authorization", format!("Bearer {}", token))
            .json(action)
            .send()
            .await
            .context("Failed to send action request")?;
        let response = check_status(response, action.name()).await?;

        response
            .json()
            .await
            .context("Failed to parse action response")
    }

    /// WebSocket URL of a table's change feed.
    pub fn websocket_url(&self, table_id: TableId) -> String {
        let ws_url = self
            .base_url
            .replace("http://", "ws://")
            .replace("https://", "wss://");
        format!("{}/ws/tables/{}", ws_url, table_id)
    }
}

async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|e| format!("Failed to read error response: {}", e));
    match serde_json::from_str::<ServerError>(&error_text) {
        Ok(error) => anyhow::bail!("{} failed ({}): {} [{}]", what, status, error.error, error.code),
        Err(_) => anyhow::bail!("{} failed ({}): {}", what, status, error_text),
    }
}
