//! Store seams for the controller.
//!
//! The reconciler only ever sees these traits: an eventually consistent
//! read cache, a typed write client, and a watch subscription. The shipped
//! backend is in-memory; a real cluster backend would implement the same
//! traits.

mod memory;
mod traits;

pub use memory::{ClusterAction, InMemoryCluster};
pub use traits::{
    Cluster, ClusterCache, ClusterClient, StoreResult, WatchEvent, WatchEvents,
};
