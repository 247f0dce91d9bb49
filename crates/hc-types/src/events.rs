//! Event envelope recorded against a HealthCheck.

use crate::object::ObjectKey;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fire-and-forget observability record. Events never influence the
/// reconcile path; they exist for operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// The HealthCheck the event is about.
    pub subject: ObjectKey,

    pub severity: EventSeverity,

    /// Short machine-readable reason, e.g. `"Synced"`.
    pub reason: String,

    /// Human-readable description.
    pub message: String,
}

impl Event {
    pub fn new(
        subject: ObjectKey,
        severity: EventSeverity,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            subject,
            severity,
            reason: reason.into(),
            message: message.into(),
        }
    }
}

/// Event severity. Mirrors the normal/warning split of cluster events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    Normal,
    Warning,
}
