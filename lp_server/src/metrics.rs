//! Prometheus metrics for table and device traffic.
//!
//! Recording is always safe: without an installed exporter the `metrics`
//! macros are no-ops, which is how tests run.
//!
//! ```rust,no_run
//! use lp_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//! metrics::table_actions_total("deal_card", true);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter with a scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn http_request_duration_ms(method: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Table Metrics
// ============================================================================

/// Count a table action by name and outcome.
pub fn table_actions_total(action: &str, success: bool) {
    metrics::counter!("table_actions_total",
        "action" => action.to_string(),
        "success" => success.to_string()
    )
    .increment(1);
}

/// Count an event-log delta read and how many events it returned.
pub fn event_deltas_total(event_count: usize) {
    metrics::counter!("event_deltas_total").increment(1);
    metrics::counter!("event_delta_events_total").increment(event_count as u64);
}

pub fn bot_turns_total(acted: bool) {
    metrics::counter!("bot_turns_total", "acted" => acted.to_string()).increment(1);
}

// ============================================================================
// Device Metrics
// ============================================================================

pub fn card_submissions_accepted() {
    metrics::counter!("card_submissions_accepted_total").increment(1);
}

/// Count a refused scanner submission by rejection code.
pub fn device_rejections_total(code: &str) {
    metrics::counter!("device_rejections_total",
        "code" => code.to_string()
    )
    .increment(1);
}

pub fn camera_commands_total(count: usize) {
    metrics::counter!("camera_commands_total").increment(count as u64);
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

pub fn websocket_connections_total(kind: &'static str) {
    metrics::counter!("websocket_connections_total", "kind" => kind).increment(1);
}

pub fn websocket_messages_sent(kind: &'static str) {
    metrics::counter!("websocket_messages_sent", "kind" => kind).increment(1);
}
