//! The CronJob resource and the desired-state builder.

use crate::frequency::Frequency;
use crate::healthcheck::{HealthCheck, HealthCheckSpec, HEALTH_CHECK_KIND};
use crate::object::{ObjectMeta, OwnerReference};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Schedule used when a HealthCheck gives neither a usable frequency nor a
/// cron pattern: run every minute.
pub const DEFAULT_CRON_PATTERN: &str = "*/1 * * * *";

const CONTAINER_NAME: &str = "healthcheck";

/// A scheduled-execution resource derived from a HealthCheck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CronJob {
    pub metadata: ObjectMeta,
    pub spec: CronJobSpec,
}

/// The mutable run spec of a CronJob. This is the portion the reconciler
/// diffs against the desired state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CronJobSpec {
    pub schedule: String,
    pub concurrency_policy: ConcurrencyPolicy,
    pub successful_jobs_history_limit: u32,
    pub failed_jobs_history_limit: u32,
    pub starting_deadline_seconds: u64,
    /// In-place retries per scheduled run. Always zero: a failed probe is a
    /// result, not something to retry.
    pub backoff_limit: u32,
    pub suspend: bool,
    pub job_template: JobTemplate,
}

/// How overlapping scheduled runs are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConcurrencyPolicy {
    /// Skip a run while the previous one is still going.
    Forbid,
    Allow,
    Replace,
}

/// Template for the job a CronJob spawns each run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobTemplate {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    pub container: Container,
}

/// The single probe container of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

/// Build the desired CronJob for a HealthCheck.
///
/// Pure and deterministic: identical inputs produce identical output, which
/// is what makes the reconciler's spec diff meaningful. Ownership is
/// recorded as a controlling owner reference back to the HealthCheck.
pub fn new_cron_job(health_check: &HealthCheck, name: &str) -> CronJob {
    let mut metadata = ObjectMeta::new(health_check.metadata.namespace.clone(), name);
    metadata.owner_references = vec![OwnerReference::controller(
        HEALTH_CHECK_KIND,
        &health_check.metadata,
    )];

    let labels = HashMap::from([(
        "controller".to_string(),
        health_check.metadata.name.clone(),
    )]);

    CronJob {
        metadata,
        spec: CronJobSpec {
            schedule: resolve_schedule(&health_check.spec),
            concurrency_policy: ConcurrencyPolicy::Forbid,
            successful_jobs_history_limit: 10,
            failed_jobs_history_limit: 10,
            starting_deadline_seconds: 10,
            backoff_limit: 0,
            suspend: false,
            job_template: JobTemplate {
                labels,
                container: Container {
                    name: CONTAINER_NAME.to_string(),
                    image: health_check.spec.image.clone(),
                    args: health_check.spec.args.clone(),
                },
            },
        },
    }
}

/// Schedule precedence: an explicit cron pattern wins; otherwise a frequency
/// shorthand that parses and converts is used; otherwise the default. A bad
/// frequency is a validation problem, not a reconcile failure, so it falls
/// back instead of erroring.
fn resolve_schedule(spec: &HealthCheckSpec) -> String {
    if let Some(pattern) = spec.cron_pattern.as_deref().filter(|p| !p.is_empty()) {
        return pattern.to_string();
    }
    if let Some(shorthand) = spec.frequency.as_deref().filter(|f| !f.is_empty()) {
        if let Ok(expr) = Frequency::parse(shorthand).and_then(|f| f.to_cron_expr()) {
            return expr;
        }
    }
    DEFAULT_CRON_PATTERN.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn health_check(frequency: Option<&str>, cron_pattern: Option<&str>) -> HealthCheck {
        HealthCheck::new(
            "default",
            "foo",
            HealthCheckSpec {
                image: "nginx".to_string(),
                frequency: frequency.map(str::to_string),
                cron_pattern: cron_pattern.map(str::to_string),
                args: vec!["--ping".to_string()],
            },
        )
    }

    #[test]
    fn builds_fixed_policy_fields() {
        let hc = health_check(None, Some("* * * * *"));
        let cron_job = new_cron_job(&hc, "foo");

        assert_eq!(cron_job.spec.schedule, "* * * * *");
        assert_eq!(cron_job.spec.concurrency_policy, ConcurrencyPolicy::Forbid);
        assert_eq!(cron_job.spec.successful_jobs_history_limit, 10);
        assert_eq!(cron_job.spec.failed_jobs_history_limit, 10);
        assert_eq!(cron_job.spec.starting_deadline_seconds, 10);
        assert_eq!(cron_job.spec.backoff_limit, 0);
        assert!(!cron_job.spec.suspend);
        assert_eq!(cron_job.spec.job_template.container.name, "healthcheck");
        assert_eq!(cron_job.spec.job_template.container.image, "nginx");
        assert_eq!(cron_job.spec.job_template.container.args, vec!["--ping"]);
    }

    #[test]
    fn records_controlling_owner_reference() {
        let hc = health_check(None, None);
        let cron_job = new_cron_job(&hc, "foo");
        let owner = cron_job.metadata.controller_ref().unwrap();
        assert_eq!(owner.kind, HEALTH_CHECK_KIND);
        assert_eq!(owner.name, "foo");
        assert!(cron_job.metadata.controlled_by(HEALTH_CHECK_KIND, &hc.metadata));
    }

    #[test]
    fn cron_pattern_takes_precedence_over_frequency() {
        let hc = health_check(Some("5m"), Some("0 12 * * *"));
        assert_eq!(new_cron_job(&hc, "foo").spec.schedule, "0 12 * * *");
    }

    #[test]
    fn frequency_is_used_when_no_cron_pattern() {
        let hc = health_check(Some("5m"), None);
        assert_eq!(new_cron_job(&hc, "foo").spec.schedule, "*/5 * * * *");
    }

    #[test]
    fn unusable_frequency_falls_back_to_default() {
        // Unparsable and unconvertible shorthands fall back the same way.
        for freq in [Some("often"), Some("6h2m"), None] {
            let hc = health_check(freq, None);
            assert_eq!(new_cron_job(&hc, "foo").spec.schedule, DEFAULT_CRON_PATTERN);
        }
    }

    #[test]
    fn builder_is_deterministic() {
        let hc = health_check(Some("5m"), None);
        assert_eq!(new_cron_job(&hc, "foo"), new_cron_job(&hc, "foo"));
    }
}
