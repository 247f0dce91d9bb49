//! Core types for the healthwatch controller.
//!
//! A `HealthCheck` is a user-authored declaration of a containerized probe
//! and how often it should run. The controller derives a `CronJob` from it
//! and keeps the two in sync. This crate holds the resource model, the
//! desired-state builder, and the frequency shorthand parser; it carries no
//! runtime machinery of its own.
//!
//! ## Key concepts
//!
//! - **HealthCheck**: what to run and how often (user-owned spec, controller-owned status)
//! - **CronJob**: the derived scheduled-execution resource (controller-owned)
//! - **Frequency**: shorthand duration expressions such as `"6h2m"`
//! - **OwnerReference**: back-pointer from a CronJob to its HealthCheck,
//!   used to detect foreign objects

#![deny(unsafe_code)]

pub mod cronjob;
pub mod events;
pub mod frequency;
pub mod healthcheck;
pub mod object;

// Re-export main types
pub use cronjob::{
    new_cron_job, ConcurrencyPolicy, Container, CronJob, CronJobSpec, JobTemplate,
    DEFAULT_CRON_PATTERN,
};
pub use events::{Event, EventSeverity};
pub use frequency::{Frequency, FrequencyComponent, FrequencyError, Unit};
pub use healthcheck::{HealthCheck, HealthCheckSpec, HealthCheckStatus, HEALTH_CHECK_KIND};
pub use object::{InvalidKey, ObjectKey, ObjectMeta, OwnerReference};
