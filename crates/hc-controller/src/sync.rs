//! The reconcile algorithm: observe actual state, compute desired state,
//! correct the difference.

use crate::controller::Controller;
use crate::error::{ControllerError, ControllerResult};
use crate::store::Cluster;
use hc_types::{new_cron_job, CronJob, EventSeverity, HealthCheck, ObjectKey, HEALTH_CHECK_KIND};

/// Event reason for a successfully synced HealthCheck.
pub const REASON_SYNCED: &str = "Synced";
/// Event reason when the target CronJob exists but is foreign.
pub const REASON_RESOURCE_EXISTS: &str = "ErrResourceExists";

/// Event message for a successfully synced HealthCheck.
pub const MESSAGE_SYNCED: &str = "HealthCheck synced successfully";

fn message_resource_exists(name: &str) -> String {
    format!("Resource \"{name}\" already exists and is not managed by HealthCheck")
}

impl<C: Cluster + 'static> Controller<C> {
    /// Reconcile one HealthCheck identified by its `namespace/name` key.
    ///
    /// Idempotent: re-running with no external change issues zero writes.
    /// Terminal-benign conditions (malformed key, HealthCheck already gone)
    /// are logged and dropped rather than retried; everything returned as
    /// an error goes back on the queue under backoff.
    pub async fn sync_handler(&self, key: &str) -> ControllerResult<()> {
        let key = match ObjectKey::parse(key) {
            Ok(key) => key,
            Err(err) => {
                tracing::error!(error = %err, "dropping unparseable work item");
                return Ok(());
            }
        };

        let Some(health_check) = self
            .cluster()
            .get_health_check(&key.namespace, &key.name)
            .await?
        else {
            tracing::info!(key = %key, "HealthCheck in work queue no longer exists");
            return Ok(());
        };

        // Target name: what status says, or our own name on first sync.
        let cron_job_name = health_check
            .status
            .cron_job_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| health_check.metadata.name.clone());

        let desired = new_cron_job(&health_check, &cron_job_name);
        let observed = self
            .cluster()
            .get_cron_job(&key.namespace, &cron_job_name)
            .await?;

        let cron_job = match observed {
            None => self.cluster().create_cron_job(desired).await?,
            Some(observed) => {
                if !observed
                    .metadata
                    .controlled_by(HEALTH_CHECK_KIND, &health_check.metadata)
                {
                    let message = message_resource_exists(&observed.metadata.name);
                    self.recorder().record(
                        &health_check,
                        EventSeverity::Warning,
                        REASON_RESOURCE_EXISTS,
                        &message,
                    );
                    return Err(ControllerError::NotOwned {
                        name: observed.metadata.name.clone(),
                    });
                }

                if observed.spec != desired.spec {
                    tracing::debug!(
                        cron_job = %observed.metadata.name,
                        health_check = %health_check.metadata.name,
                        "updating CronJob to reflect HealthCheck changes"
                    );
                    let mut updated = observed;
                    updated.spec = desired.spec;
                    self.cluster().update_cron_job(updated).await?
                } else {
                    observed
                }
            }
        };

        self.update_status(&health_check, &cron_job).await?;
        self.recorder().record(
            &health_check,
            EventSeverity::Normal,
            REASON_SYNCED,
            MESSAGE_SYNCED,
        );
        Ok(())
    }

    /// Patch `status.cron_job_name` through the status subresource path.
    ///
    /// The cached object is shared and must never be mutated in place, so
    /// the write goes through a clone. A status that already points at the
    /// CronJob is left alone, keeping a no-op reconcile free of writes.
    async fn update_status(
        &self,
        health_check: &HealthCheck,
        cron_job: &CronJob,
    ) -> ControllerResult<()> {
        if health_check.status.cron_job_name.as_deref() == Some(&cron_job.metadata.name) {
            return Ok(());
        }

        let mut copy = health_check.clone();
        copy.status.cron_job_name = Some(cron_job.metadata.name.clone());
        self.cluster().update_health_check_status(copy).await?;
        Ok(())
    }
}
