//! Lifecycle Scheduler (spec.md §4.C): drives `scheduled -> active -> ended`
//! transitions on a bounded-interval poll loop, restart-safe because every
//! step is idempotent by status check.

mod lifecycle;

pub use lifecycle::LifecycleScheduler;
