//! Store trait definitions.

use crate::error::StoreError;
use async_trait::async_trait;
use hc_types::{CronJob, HealthCheck};
use tokio::sync::broadcast;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A change notification from the watch subscription.
///
/// A closed set of kinds: no runtime type inspection happens anywhere in
/// the dispatch path.
#[derive(Debug, Clone)]
pub enum WatchEvent<T> {
    Added(T),
    Updated(T),
    Deleted(T),
    /// The watch lost track of the object; only a possibly stale final
    /// state is known.
    DeletedUnknownLastState(T),
}

/// Eventually consistent read cache, populated by an out-of-scope watch
/// subscription. Reads may lag just-issued writes; the reconciler's
/// idempotent re-diff tolerates that.
#[async_trait]
pub trait ClusterCache: Send + Sync {
    /// Get a HealthCheck by namespace and name.
    async fn get_health_check(&self, namespace: &str, name: &str)
        -> StoreResult<Option<HealthCheck>>;

    /// Get a CronJob by namespace and name.
    async fn get_cron_job(&self, namespace: &str, name: &str) -> StoreResult<Option<CronJob>>;

    /// Whether the cache has completed its initial sync. Workers must not
    /// start before this reports true.
    fn has_synced(&self) -> bool;
}

/// Write client. Each call returns success or a typed failure.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Create a CronJob. Fails with `Conflict` if one already exists.
    async fn create_cron_job(&self, cron_job: CronJob) -> StoreResult<CronJob>;

    /// Replace an existing CronJob.
    async fn update_cron_job(&self, cron_job: CronJob) -> StoreResult<CronJob>;

    /// Delete a CronJob. Returns whether it existed.
    async fn delete_cron_job(&self, namespace: &str, name: &str) -> StoreResult<bool>;

    /// Write only the status sub-object of a HealthCheck.
    async fn update_health_check_status(&self, health_check: HealthCheck)
        -> StoreResult<HealthCheck>;
}

/// Watch subscription delivering change notifications.
pub trait WatchEvents: Send + Sync {
    fn subscribe_health_checks(&self) -> broadcast::Receiver<WatchEvent<HealthCheck>>;

    fn subscribe_cron_jobs(&self) -> broadcast::Receiver<WatchEvent<CronJob>>;
}

/// Combined cluster trait the controller is generic over.
pub trait Cluster: ClusterCache + ClusterClient + WatchEvents {}

impl<T: ClusterCache + ClusterClient + WatchEvents> Cluster for T {}
