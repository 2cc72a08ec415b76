//! Relays tool progress and log events to the client as MCP notifications.

use osmgeo_lib::Reporter;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::types::notification;

/// Logger name attached to `notifications/message`.
pub const LOGGER_NAME: &str = "osmgeo";

/// Per-invocation reporter. Progress is only sent when the request carried a
/// `progressToken`; log messages are always sent and mirrored to tracing.
pub struct McpReporter {
    outbound: UnboundedSender<Value>,
    progress_token: Option<Value>,
}

impl McpReporter {
    pub fn new(outbound: UnboundedSender<Value>, progress_token: Option<Value>) -> Self {
        Self {
            outbound,
            progress_token,
        }
    }

    fn send(&self, message: Value) {
        // The writer only goes away during shutdown.
        if self.outbound.send(message).is_err() {
            debug!("dropping notification; writer closed");
        }
    }

    fn log(&self, level: &str, message: &str) {
        self.send(notification(
            "notifications/message",
            json!({"level": level, "logger": LOGGER_NAME, "data": message}),
        ));
    }
}

impl Reporter for McpReporter {
    fn progress(&self, current: usize, total: usize) {
        if let Some(token) = &self.progress_token {
            self.send(notification(
                "notifications/progress",
                json!({"progressToken": token, "progress": current, "total": total}),
            ));
        }
    }

    fn info(&self, message: &str) {
        info!("{}", message);
        self.log("info", message);
    }

    fn warning(&self, message: &str) {
        warn!("{}", message);
        self.log("warning", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn progress_requires_token() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        McpReporter::new(tx, None).progress(1, 7);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn progress_and_messages_become_notifications() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = McpReporter::new(tx, Some(json!(42)));

        reporter.progress(3, 10);
        reporter.warning("Invalid mode 'teleport'. Using 'car' instead.");

        let progress = rx.try_recv().unwrap();
        assert_eq!(progress["method"], "notifications/progress");
        assert_eq!(progress["params"]["progressToken"], 42);
        assert_eq!(progress["params"]["progress"], 3);
        assert_eq!(progress["params"]["total"], 10);

        let message = rx.try_recv().unwrap();
        assert_eq!(message["method"], "notifications/message");
        assert_eq!(message["params"]["level"], "warning");
        assert_eq!(message["params"]["logger"], "osmgeo");
    }
}
