//! Terminal client for live-dealer poker tables.
//!
//! Follows a table's event log through the change feed and, given a
//! session token, submits player or dealer actions.

pub mod api_client;
pub mod commands;
pub mod follower;
pub mod render;
pub mod websocket_client;
