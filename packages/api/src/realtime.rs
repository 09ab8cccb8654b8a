//! Helpers for streaming notifications to observers.

use actors::Connection;
use monitor_core::MonitorEvent;

/// Format an event for SSE.
pub fn format_sse_event(event: &MonitorEvent) -> String {
    let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    format!("event: counts\ndata: {}\n\n", json)
}

/// Forward a connection's events as SSE frames until it closes or `sink` refuses one.
///
/// Consumes the connection, so its subscriptions end with the stream.
pub async fn stream_sse(mut connection: Connection, mut sink: impl FnMut(String) -> bool) {
    while let Some(event) = connection.recv().await {
        if !sink(format_sse_event(&event)) {
            tracing::debug!("SSE sink for connection {} closed", connection.id());
            break;
        }
    }
}
