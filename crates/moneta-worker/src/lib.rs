//! # moneta-worker
//!
//! Cron-scheduled maintenance for the token-lifecycle core. The only
//! long-lived background work the core needs is the periodic sweep of
//! expired and stale token records.

pub mod scheduler;

pub use scheduler::MaintenanceScheduler;
