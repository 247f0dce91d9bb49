//! The HealthCheck resource: a user-authored probe declaration.

use crate::object::ObjectMeta;
use serde::{Deserialize, Serialize};

/// Resource kind recorded in owner references.
pub const HEALTH_CHECK_KIND: &str = "HealthCheck";

/// A declarative health check. The spec belongs to the user; the status
/// belongs to the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub metadata: ObjectMeta,
    pub spec: HealthCheckSpec,
    #[serde(default)]
    pub status: HealthCheckStatus,
}

impl HealthCheck {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, spec: HealthCheckSpec) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec,
            status: HealthCheckStatus::default(),
        }
    }
}

/// What to run and how often. Immutable per generation from the
/// controller's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckSpec {
    /// Container image to run the probe with.
    pub image: String,

    /// Optional frequency shorthand, e.g. `"5m"`. Only consulted when no
    /// explicit cron pattern is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,

    /// Optional explicit cron schedule. Takes precedence over `frequency`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_pattern: Option<String>,

    /// Arguments passed to the probe container, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

/// Controller-owned outcome record. Only `cron_job_name` is written by the
/// reconcile path; the health fields belong to a separate evaluation path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckStatus {
    /// Name of the CronJob derived from this HealthCheck.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_job_name: Option<String>,

    #[serde(default)]
    pub healthy: bool,

    /// Outcomes of the ten most recent runs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub last10: Vec<bool>,

    #[serde(default)]
    pub average_healthiness: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_round_trip() {
        let hc = HealthCheck::new(
            "default",
            "foo",
            HealthCheckSpec {
                image: "nginx".to_string(),
                frequency: Some("5m".to_string()),
                cron_pattern: None,
                args: vec!["--verbose".to_string()],
            },
        );

        let json = serde_json::to_string(&hc).unwrap();
        let back: HealthCheck = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hc);
    }

    #[test]
    fn status_defaults_are_empty() {
        let status = HealthCheckStatus::default();
        assert_eq!(status.cron_job_name, None);
        assert!(!status.healthy);
        assert!(status.last10.is_empty());
    }
}
