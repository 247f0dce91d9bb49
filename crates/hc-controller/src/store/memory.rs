//! In-memory cluster backend for development and testing.

use super::traits::*;
use crate::error::StoreError;
use async_trait::async_trait;
use hc_types::{CronJob, HealthCheck, ObjectKey, ObjectMeta};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

const WATCH_CHANNEL_CAPACITY: usize = 256;

/// A client write observed by the backend, in order. Tests assert on the
/// exact sequence of writes a reconcile issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterAction {
    CreateCronJob(ObjectKey),
    UpdateCronJob(ObjectKey),
    DeleteCronJob(ObjectKey),
    UpdateHealthCheckStatus(ObjectKey),
}

/// In-memory implementation of the cache, client and watch seams.
///
/// The cache and the write path share one map, so reads are never stale
/// here; staleness tolerance is exercised by the reconciler's idempotence
/// rather than by this backend.
#[derive(Debug)]
pub struct InMemoryCluster {
    health_checks: RwLock<HashMap<ObjectKey, HealthCheck>>,
    cron_jobs: RwLock<HashMap<ObjectKey, CronJob>>,
    health_check_tx: broadcast::Sender<WatchEvent<HealthCheck>>,
    cron_job_tx: broadcast::Sender<WatchEvent<CronJob>>,
    actions: RwLock<Vec<ClusterAction>>,
    synced: AtomicBool,
}

impl Default for InMemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCluster {
    pub fn new() -> Self {
        let (health_check_tx, _) = broadcast::channel(WATCH_CHANNEL_CAPACITY);
        let (cron_job_tx, _) = broadcast::channel(WATCH_CHANNEL_CAPACITY);
        Self {
            health_checks: RwLock::new(HashMap::new()),
            cron_jobs: RwLock::new(HashMap::new()),
            health_check_tx,
            cron_job_tx,
            actions: RwLock::new(Vec::new()),
            synced: AtomicBool::new(true),
        }
    }

    /// Flip the initial-sync signal, for exercising startup behavior.
    pub fn set_synced(&self, synced: bool) {
        self.synced.store(synced, Ordering::SeqCst);
    }

    /// Store a HealthCheck as an external author would, emitting a watch
    /// event. Returns the stored copy with backend identity assigned.
    pub async fn upsert_health_check(&self, mut health_check: HealthCheck) -> HealthCheck {
        assign_identity(&mut health_check.metadata);
        let key = health_check.metadata.key();
        let replaced = {
            let mut health_checks = self.health_checks.write().await;
            health_checks
                .insert(key, health_check.clone())
                .is_some()
        };
        let event = if replaced {
            WatchEvent::Updated(health_check.clone())
        } else {
            WatchEvent::Added(health_check.clone())
        };
        let _ = self.health_check_tx.send(event);
        health_check
    }

    /// Remove a HealthCheck, emitting a deletion watch event.
    pub async fn delete_health_check(&self, namespace: &str, name: &str) -> Option<HealthCheck> {
        let key = ObjectKey::new(namespace, name);
        let removed = self.health_checks.write().await.remove(&key);
        if let Some(health_check) = &removed {
            let _ = self
                .health_check_tx
                .send(WatchEvent::Deleted(health_check.clone()));
        }
        removed
    }

    /// Seed a CronJob without going through the client write path. Test
    /// fixtures use this so seeded state does not show up as an action.
    pub async fn seed_cron_job(&self, mut cron_job: CronJob) -> CronJob {
        assign_identity(&mut cron_job.metadata);
        let key = cron_job.metadata.key();
        self.cron_jobs.write().await.insert(key, cron_job.clone());
        cron_job
    }

    /// Drain the recorded client writes.
    pub async fn take_actions(&self) -> Vec<ClusterAction> {
        std::mem::take(&mut *self.actions.write().await)
    }

    async fn record_action(&self, action: ClusterAction) {
        self.actions.write().await.push(action);
    }
}

/// Backend-assigned identity, set once on first persist.
fn assign_identity(metadata: &mut ObjectMeta) {
    if metadata.uid.is_none() {
        metadata.uid = Some(Uuid::new_v4());
    }
    if metadata.creation_timestamp.is_none() {
        metadata.creation_timestamp = Some(chrono::Utc::now());
    }
}

#[async_trait]
impl ClusterCache for InMemoryCluster {
    async fn get_health_check(
        &self,
        namespace: &str,
        name: &str,
    ) -> StoreResult<Option<HealthCheck>> {
        let health_checks = self.health_checks.read().await;
        Ok(health_checks.get(&ObjectKey::new(namespace, name)).cloned())
    }

    async fn get_cron_job(&self, namespace: &str, name: &str) -> StoreResult<Option<CronJob>> {
        let cron_jobs = self.cron_jobs.read().await;
        Ok(cron_jobs.get(&ObjectKey::new(namespace, name)).cloned())
    }

    fn has_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    async fn create_cron_job(&self, mut cron_job: CronJob) -> StoreResult<CronJob> {
        let key = cron_job.metadata.key();
        self.record_action(ClusterAction::CreateCronJob(key.clone()))
            .await;

        let mut cron_jobs = self.cron_jobs.write().await;
        if cron_jobs.contains_key(&key) {
            return Err(StoreError::Conflict {
                kind: "CronJob",
                key,
            });
        }
        assign_identity(&mut cron_job.metadata);
        cron_jobs.insert(key, cron_job.clone());
        drop(cron_jobs);

        let _ = self.cron_job_tx.send(WatchEvent::Added(cron_job.clone()));
        Ok(cron_job)
    }

    async fn update_cron_job(&self, cron_job: CronJob) -> StoreResult<CronJob> {
        let key = cron_job.metadata.key();
        self.record_action(ClusterAction::UpdateCronJob(key.clone()))
            .await;

        let mut cron_jobs = self.cron_jobs.write().await;
        if !cron_jobs.contains_key(&key) {
            return Err(StoreError::NotFound {
                kind: "CronJob",
                key,
            });
        }
        cron_jobs.insert(key, cron_job.clone());
        drop(cron_jobs);

        let _ = self.cron_job_tx.send(WatchEvent::Updated(cron_job.clone()));
        Ok(cron_job)
    }

    async fn delete_cron_job(&self, namespace: &str, name: &str) -> StoreResult<bool> {
        let key = ObjectKey::new(namespace, name);
        self.record_action(ClusterAction::DeleteCronJob(key.clone()))
            .await;

        let removed = self.cron_jobs.write().await.remove(&key);
        if let Some(cron_job) = removed {
            let _ = self.cron_job_tx.send(WatchEvent::Deleted(cron_job));
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn update_health_check_status(
        &self,
        health_check: HealthCheck,
    ) -> StoreResult<HealthCheck> {
        let key = health_check.metadata.key();
        self.record_action(ClusterAction::UpdateHealthCheckStatus(key.clone()))
            .await;

        let mut health_checks = self.health_checks.write().await;
        let Some(stored) = health_checks.get_mut(&key) else {
            return Err(StoreError::NotFound {
                kind: "HealthCheck",
                key,
            });
        };
        // Status subresource: nothing but the status changes.
        stored.status = health_check.status;
        let updated = stored.clone();
        drop(health_checks);

        let _ = self
            .health_check_tx
            .send(WatchEvent::Updated(updated.clone()));
        Ok(updated)
    }
}

impl WatchEvents for InMemoryCluster {
    fn subscribe_health_checks(&self) -> broadcast::Receiver<WatchEvent<HealthCheck>> {
        self.health_check_tx.subscribe()
    }

    fn subscribe_cron_jobs(&self) -> broadcast::Receiver<WatchEvent<CronJob>> {
        self.cron_job_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hc_types::{new_cron_job, HealthCheckSpec};

    fn health_check(name: &str) -> HealthCheck {
        HealthCheck::new(
            "default",
            name,
            HealthCheckSpec {
                image: "nginx".to_string(),
                frequency: None,
                cron_pattern: None,
                args: Vec::new(),
            },
        )
    }

    #[tokio::test]
    async fn upsert_assigns_identity_once() {
        let cluster = InMemoryCluster::new();
        let stored = cluster.upsert_health_check(health_check("foo")).await;
        assert!(stored.metadata.uid.is_some());

        let again = cluster.upsert_health_check(stored.clone()).await;
        assert_eq!(again.metadata.uid, stored.metadata.uid);
    }

    #[tokio::test]
    async fn create_conflicts_on_existing_cron_job() {
        let cluster = InMemoryCluster::new();
        let hc = cluster.upsert_health_check(health_check("foo")).await;
        let cron_job = new_cron_job(&hc, "foo");

        cluster.create_cron_job(cron_job.clone()).await.unwrap();
        assert!(matches!(
            cluster.create_cron_job(cron_job).await,
            Err(StoreError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn status_update_only_touches_status() {
        let cluster = InMemoryCluster::new();
        let hc = cluster.upsert_health_check(health_check("foo")).await;

        let mut copy = hc.clone();
        copy.spec.image = "busybox".to_string(); // must be ignored
        copy.status.cron_job_name = Some("foo".to_string());
        cluster.update_health_check_status(copy).await.unwrap();

        let stored = cluster
            .get_health_check("default", "foo")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.spec.image, "nginx");
        assert_eq!(stored.status.cron_job_name.as_deref(), Some("foo"));
    }

    #[tokio::test]
    async fn watch_events_are_delivered() {
        let cluster = InMemoryCluster::new();
        let mut events = cluster.subscribe_health_checks();

        cluster.upsert_health_check(health_check("foo")).await;
        assert!(matches!(events.recv().await.unwrap(), WatchEvent::Added(_)));

        cluster.delete_health_check("default", "foo").await.unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            WatchEvent::Deleted(_)
        ));
    }
}
