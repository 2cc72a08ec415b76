//! Progress and log events emitted while a tool runs.
//!
//! Aggregation tools report one progress event per unit of work plus any
//! warnings about degraded results. The hosting framework decides where these
//! go; [`TracingReporter`] simply logs them.

use std::sync::Mutex;

use tracing::{debug, info, warn};

/// Sink for per-invocation progress and log messages.
pub trait Reporter: Send + Sync {
    /// `current` units out of `total` are done.
    fn progress(&self, current: usize, total: usize);

    fn info(&self, message: &str);

    fn warning(&self, message: &str);
}

/// Reporter that only writes to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn progress(&self, current: usize, total: usize) {
        debug!(current, total, "progress");
    }

    fn info(&self, message: &str) {
        info!("{}", message);
    }

    fn warning(&self, message: &str) {
        warn!("{}", message);
    }
}

/// Event captured by [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Progress { current: usize, total: usize },
    Info(String),
    Warning(String),
}

/// Reporter that keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::Warning(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    pub fn progress_events(&self) -> Vec<(usize, usize)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::Progress { current, total } => Some((current, total)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ReportEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

impl Reporter for RecordingReporter {
    fn progress(&self, current: usize, total: usize) {
        self.push(ReportEvent::Progress { current, total });
    }

    fn info(&self, message: &str) {
        self.push(ReportEvent::Info(message.to_string()));
    }

    fn warning(&self, message: &str) {
        warn!("{}", message);
        self.push(ReportEvent::Warning(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_reporter_keeps_order() {
        let reporter = RecordingReporter::new();
        reporter.progress(0, 2);
        reporter.warning("first failed");
        reporter.progress(1, 2);
        reporter.info("done");

        assert_eq!(reporter.progress_events(), vec![(0, 2), (1, 2)]);
        assert_eq!(reporter.warnings(), vec!["first failed".to_string()]);
        assert_eq!(reporter.events().len(), 4);
    }
}
