//! healthwatch controller library
//!
//! This crate provides the control loop that keeps derived CronJobs in sync
//! with user-authored HealthChecks:
//! - Deduplicating retry queue with exponential backoff
//! - Reconciler and status updater
//! - Store trait seams (read cache, write client, watch subscription)
//! - Event recorder

pub mod config;
pub mod controller;
pub mod error;
pub mod queue;
pub mod recorder;
pub mod store;
mod sync;

pub use config::{ControllerConfig, QueueConfig};
pub use controller::Controller;
pub use error::{ControllerError, ControllerResult, StoreError};
pub use queue::WorkQueue;
pub use recorder::Recorder;
pub use store::{
    Cluster, ClusterAction, ClusterCache, ClusterClient, InMemoryCluster, WatchEvent, WatchEvents,
};
pub use sync::{MESSAGE_SYNCED, REASON_RESOURCE_EXISTS, REASON_SYNCED};
