//! The controller: worker pool, watch-event dispatch, and lifecycle.

use crate::config::ControllerConfig;
use crate::error::ControllerResult;
use crate::queue::WorkQueue;
use crate::recorder::Recorder;
use crate::store::{Cluster, WatchEvent};
use hc_types::{CronJob, HealthCheck, HEALTH_CHECK_KIND};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;

/// Manages HealthCheck resources: keeps one CronJob per HealthCheck in
/// sync with its spec.
pub struct Controller<C: Cluster> {
    cluster: Arc<C>,
    queue: Arc<WorkQueue>,
    recorder: Recorder,
    config: ControllerConfig,
}

impl<C: Cluster + 'static> Controller<C> {
    pub fn new(cluster: Arc<C>, recorder: Recorder, config: ControllerConfig) -> Self {
        let queue = Arc::new(WorkQueue::new(&config.queue));
        Self {
            cluster,
            queue,
            recorder,
            config,
        }
    }

    pub(crate) fn cluster(&self) -> &C {
        &self.cluster
    }

    pub(crate) fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Run until `shutdown` resolves: wait for the cache to sync, dispatch
    /// watch events into the queue, and process the queue with a fixed pool
    /// of workers. In-flight reconciles finish before this returns.
    pub async fn run(
        self: Arc<Self>,
        shutdown: impl Future<Output = ()> + Send,
    ) -> ControllerResult<()> {
        tracing::info!("starting HealthCheck controller");
        tokio::pin!(shutdown);

        tracing::info!("waiting for caches to sync");
        while !self.cluster.has_synced() {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested before caches synced");
                    return Ok(());
                }
                _ = tokio::time::sleep(Duration::from_millis(50)) => {}
            }
        }

        let dispatcher = {
            let controller = Arc::clone(&self);
            tokio::spawn(async move { controller.dispatch_watch_events().await })
        };

        let mut workers = JoinSet::new();
        for worker in 0..self.config.workers {
            let controller = Arc::clone(&self);
            workers.spawn(async move { controller.worker_loop(worker).await });
        }
        tracing::info!(workers = self.config.workers, "started workers");

        shutdown.await;
        tracing::info!("shutting down, letting in-flight syncs finish");

        self.queue.shut_down();
        while workers.join_next().await.is_some() {}
        dispatcher.abort();

        Ok(())
    }

    /// Translate change notifications into queue work. The only decision
    /// made here is *which* HealthCheck a notification is about; all actual
    /// work happens in the reconcile path.
    async fn dispatch_watch_events(&self) {
        let mut health_checks = self.cluster.subscribe_health_checks();
        let mut cron_jobs = self.cluster.subscribe_cron_jobs();

        loop {
            tokio::select! {
                event = health_checks.recv() => match event {
                    Ok(WatchEvent::Added(hc)) | Ok(WatchEvent::Updated(hc)) => {
                        self.enqueue_health_check(&hc);
                    }
                    Ok(WatchEvent::Deleted(hc))
                    | Ok(WatchEvent::DeletedUnknownLastState(hc)) => {
                        self.handle_deleted_health_check(&hc).await;
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "HealthCheck watch lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                event = cron_jobs.recv() => match event {
                    Ok(WatchEvent::Added(cj))
                    | Ok(WatchEvent::Updated(cj))
                    | Ok(WatchEvent::Deleted(cj))
                    | Ok(WatchEvent::DeletedUnknownLastState(cj)) => {
                        self.handle_cron_job_event(&cj).await;
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "CronJob watch lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    }

    fn enqueue_health_check(&self, health_check: &HealthCheck) {
        self.queue.add(health_check.metadata.key().to_string());
    }

    /// A HealthCheck is gone; remove the CronJob its status points at.
    /// Normal reconciles never delete anything, this is the only deletion
    /// path in the controller.
    pub(crate) async fn handle_deleted_health_check(&self, health_check: &HealthCheck) {
        let Some(name) = health_check
            .status
            .cron_job_name
            .as_deref()
            .filter(|name| !name.is_empty())
        else {
            return;
        };
        let namespace = &health_check.metadata.namespace;

        match self.cluster.get_cron_job(namespace, name).await {
            Ok(Some(_)) => {
                if let Err(err) = self.cluster.delete_cron_job(namespace, name).await {
                    tracing::warn!(
                        cron_job = %name,
                        error = %err,
                        "failed to delete CronJob of removed HealthCheck"
                    );
                }
            }
            Ok(None) => {} // already gone, nothing to do
            Err(err) => {
                tracing::warn!(cron_job = %name, error = %err, "CronJob lookup failed");
            }
        }
    }

    /// Route a CronJob notification to the owning HealthCheck, if any.
    /// Foreign and orphaned CronJobs are ignored.
    async fn handle_cron_job_event(&self, cron_job: &CronJob) {
        let Some(owner) = cron_job.metadata.controller_ref() else {
            return;
        };
        if owner.kind != HEALTH_CHECK_KIND {
            return;
        }

        match self
            .cluster
            .get_health_check(&cron_job.metadata.namespace, &owner.name)
            .await
        {
            Ok(Some(health_check)) => self.enqueue_health_check(&health_check),
            Ok(None) => {
                tracing::debug!(
                    cron_job = %cron_job.metadata.name,
                    owner = %owner.name,
                    "ignoring orphaned CronJob"
                );
            }
            Err(err) => {
                tracing::warn!(owner = %owner.name, error = %err, "owner lookup failed");
            }
        }
    }

    async fn worker_loop(&self, worker: usize) {
        while self.process_next_work_item().await {}
        tracing::debug!(worker, "worker stopped");
    }

    /// One queue round-trip: get, sync, forget-or-requeue, done.
    async fn process_next_work_item(&self) -> bool {
        let Some(key) = self.queue.get().await else {
            return false;
        };

        match self.sync_handler(&key).await {
            Ok(()) => {
                self.queue.forget(&key);
                tracing::info!(key = %key, "successfully synced");
            }
            Err(err) => {
                Arc::clone(&self.queue).add_rate_limited(key.clone());
                tracing::warn!(key = %key, error = %err, "error syncing, requeuing");
            }
        }
        self.queue.done(&key);
        true
    }

    #[cfg(test)]
    pub(crate) fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }
}
