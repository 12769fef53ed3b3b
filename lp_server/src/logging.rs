//! Structured logging setup and event helpers.
//!
//! The engine crate logs through the `log` facade; `tracing-subscriber`
//! picks those records up alongside the server's own `tracing` events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Operations slower than this are logged at warn level.
pub const SLOW_OPERATION_MS: u64 = 500;

/// Initialize structured logging
///
/// Log levels come from `RUST_LOG`, defaulting to `info,sqlx=warn,hyper=warn`.
///
/// # Example
///
/// ```no_run
/// use lp_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log security event with structured data
///
/// # Arguments
///
/// * `event_type` - Type of security event
/// * `subject` - Session subject or device serial, when known
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use lp_server::logging::log_security_event;
///
/// log_security_event("device_rejected", Some("SCN-001"), "bad_signature");
/// ```
pub fn log_security_event(event_type: &str, subject: Option<&str>, message: &str) {
    tracing::warn!(
        event_type = event_type,
        subject = subject,
        "SECURITY: {}",
        message
    );
}

/// Log how long an operation took; slow ones are raised to warn.
pub fn log_performance(operation: &str, duration_ms: u64, table_id: Option<i64>) {
    if duration_ms > SLOW_OPERATION_MS {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            table_id = table_id,
            "PERFORMANCE: Slow operation"
        );
    } else {
        tracing::debug!(
            operation = operation,
            duration_ms = duration_ms,
            table_id = table_id,
            "Performance metric"
        );
    }
}
