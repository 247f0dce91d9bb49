//! Deduplicating, rate-limited work queue of resource keys.
//!
//! Semantics: a key added while already pending is dropped; a key added
//! while being processed is marked dirty and re-delivered once the worker
//! calls [`WorkQueue::done`]. The processing marker is what guarantees at
//! most one in-flight reconcile per key, no matter how many workers pull
//! from the queue.

use crate::config::QueueConfig;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub struct WorkQueue {
    state: Mutex<State>,
    notify: Notify,
    base_delay: Duration,
    max_delay: Duration,
}

struct State {
    /// Delivery order of pending keys.
    queue: VecDeque<String>,
    /// Keys needing processing: everything queued, plus keys re-added while
    /// in flight.
    dirty: HashSet<String>,
    /// Keys currently held by a worker.
    processing: HashSet<String>,
    /// Consecutive failures per key, cleared by `forget`.
    failures: HashMap<String, u32>,
    shutting_down: bool,
}

impl WorkQueue {
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                dirty: HashSet::new(),
                processing: HashSet::new(),
                failures: HashMap::new(),
                shutting_down: false,
            }),
            notify: Notify::new(),
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
        }
    }

    /// Add a key for processing. No-op if the key is already pending or in
    /// flight (the dirty marker re-delivers it after `done`).
    pub fn add(&self, key: impl Into<String>) {
        let key = key.into();
        let mut state = self.state.lock().expect("work queue lock poisoned");
        if state.shutting_down || state.dirty.contains(&key) {
            return;
        }
        state.dirty.insert(key.clone());
        if state.processing.contains(&key) {
            return;
        }
        state.queue.push_back(key);
        drop(state);
        self.notify.notify_one();
    }

    /// Wait for the next key, marking it in flight. Returns `None` once the
    /// queue is shut down and drained.
    pub async fn get(&self) -> Option<String> {
        loop {
            {
                let mut state = self.state.lock().expect("work queue lock poisoned");
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    if !state.queue.is_empty() {
                        // Pass the wakeup on to the next waiting worker.
                        self.notify.notify_one();
                    }
                    return Some(key);
                }
                if state.shutting_down {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Clear the in-flight marker. A key re-added while processing becomes
    /// pending again.
    pub fn done(&self, key: &str) {
        let mut state = self.state.lock().expect("work queue lock poisoned");
        state.processing.remove(key);
        if state.dirty.contains(key) {
            state.queue.push_back(key.to_string());
            drop(state);
            self.notify.notify_one();
        }
    }

    /// Clear backoff state for a key. Call on successful processing.
    pub fn forget(&self, key: &str) {
        let mut state = self.state.lock().expect("work queue lock poisoned");
        state.failures.remove(key);
    }

    /// Re-queue a key after an exponentially increasing delay. Call on
    /// failed processing.
    pub fn add_rate_limited(self: Arc<Self>, key: impl Into<String>) {
        let key = key.into();
        let delay = self.next_delay(&key);
        let queue = self;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(key);
        });
    }

    /// Stop delivery: pending keys are still handed out, then `get` returns
    /// `None`. In-flight keys may finish.
    pub fn shut_down(&self) {
        let mut state = self.state.lock().expect("work queue lock poisoned");
        state.shutting_down = true;
        drop(state);
        self.notify.notify_waiters();
    }

    pub fn shutting_down(&self) -> bool {
        self.state
            .lock()
            .expect("work queue lock poisoned")
            .shutting_down
    }

    /// Number of pending (not in-flight) keys.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .expect("work queue lock poisoned")
            .queue
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record a failure for the key and return the capped backoff delay:
    /// base doubled per consecutive failure.
    fn next_delay(&self, key: &str) -> Duration {
        let mut state = self.state.lock().expect("work queue lock poisoned");
        let failures = state.failures.entry(key.to_string()).or_insert(0);
        let exponent = *failures;
        *failures += 1;

        let delay = self
            .base_delay
            .checked_mul(2u32.saturating_pow(exponent.min(31)))
            .unwrap_or(self.max_delay);
        delay.min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    fn queue() -> Arc<WorkQueue> {
        Arc::new(WorkQueue::new(&QueueConfig::default()))
    }

    #[tokio::test]
    async fn delivers_added_key() {
        let queue = queue();
        queue.add("default/foo");
        assert_eq!(queue.get().await.as_deref(), Some("default/foo"));
    }

    #[tokio::test]
    async fn deduplicates_pending_keys() {
        let queue = queue();
        queue.add("default/foo");
        queue.add("default/foo");
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.get().await.as_deref(), Some("default/foo"));
        queue.done("default/foo");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn key_added_while_processing_is_redelivered_after_done() {
        let queue = queue();
        queue.add("default/foo");
        let key = queue.get().await.unwrap();

        // Re-add while in flight: nothing is queued yet.
        queue.add("default/foo");
        assert!(queue.is_empty());

        queue.done(&key);
        assert_eq!(queue.get().await.as_deref(), Some("default/foo"));
    }

    #[tokio::test]
    async fn get_blocks_until_add() {
        let queue = queue();
        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.get().await })
        };
        tokio::task::yield_now().await;
        queue.add("default/foo");

        let key = timeout(Duration::from_secs(5), waiter).await.unwrap().unwrap();
        assert_eq!(key.as_deref(), Some("default/foo"));
    }

    #[tokio::test]
    async fn shutdown_drains_then_stops_delivery() {
        let queue = queue();
        queue.add("default/foo");
        queue.shut_down();

        // Pending work is still handed out before delivery stops.
        assert_eq!(queue.get().await.as_deref(), Some("default/foo"));
        assert_eq!(queue.get().await, None);
        assert!(queue.shutting_down());
    }

    #[tokio::test]
    async fn shutdown_wakes_blocked_getters() {
        let queue = queue();
        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.get().await })
        };
        tokio::task::yield_now().await;
        queue.shut_down();
        assert_eq!(timeout(Duration::from_secs(5), waiter).await.unwrap().unwrap(), None);
    }

    #[tokio::test]
    async fn backoff_doubles_up_to_cap() {
        let config = QueueConfig {
            base_delay_ms: 5,
            max_delay_secs: 1000,
        };
        let queue = Arc::new(WorkQueue::new(&config));

        let mut last = Duration::ZERO;
        for i in 0..25 {
            let delay = queue.next_delay("default/foo");
            assert!(delay >= last, "delay shrank on failure {i}");
            assert!(delay <= Duration::from_secs(1000));
            last = delay;
        }
        assert_eq!(last, Duration::from_secs(1000));
    }

    #[tokio::test]
    async fn forget_resets_backoff() {
        let queue = queue();
        queue.next_delay("default/foo");
        queue.next_delay("default/foo");
        queue.forget("default/foo");
        assert_eq!(queue.next_delay("default/foo"), Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_add_is_delayed() {
        let queue = queue();
        Arc::clone(&queue).add_rate_limited("default/foo");
        // Paused time auto-advances once all tasks are idle.
        assert_eq!(queue.get().await.as_deref(), Some("default/foo"));
    }
}
