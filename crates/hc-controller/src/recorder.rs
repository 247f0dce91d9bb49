//! Event recorder: a fire-and-forget sink for sync outcomes.
//!
//! Constructed once at startup and passed by value; there is no global
//! registration. Recording never blocks the reconcile path and silently
//! drops events when nobody is listening.

use hc_types::{Event, EventSeverity, HealthCheck};
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct Recorder {
    event_tx: broadcast::Sender<Event>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Recorder {
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity);
        Self { event_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Record an event against a HealthCheck. Best effort.
    pub fn record(
        &self,
        subject: &HealthCheck,
        severity: EventSeverity,
        reason: &str,
        message: &str,
    ) {
        let event = Event::new(subject.metadata.key(), severity, reason, message);
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hc_types::HealthCheckSpec;

    #[tokio::test]
    async fn delivers_events_to_subscribers() {
        let recorder = Recorder::default();
        let mut events = recorder.subscribe();

        let hc = HealthCheck::new(
            "default",
            "foo",
            HealthCheckSpec {
                image: "nginx".to_string(),
                frequency: None,
                cron_pattern: None,
                args: Vec::new(),
            },
        );
        recorder.record(&hc, EventSeverity::Normal, "Synced", "synced");

        let event = events.recv().await.unwrap();
        assert_eq!(event.subject.to_string(), "default/foo");
        assert_eq!(event.severity, EventSeverity::Normal);
        assert_eq!(event.reason, "Synced");
    }

    #[test]
    fn recording_without_subscribers_is_a_no_op() {
        let recorder = Recorder::default();
        let hc = HealthCheck::new(
            "default",
            "foo",
            HealthCheckSpec {
                image: "nginx".to_string(),
                frequency: None,
                cron_pattern: None,
                args: Vec::new(),
            },
        );
        recorder.record(&hc, EventSeverity::Warning, "ErrResourceExists", "conflict");
    }
}
