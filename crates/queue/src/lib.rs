//! Background jobs for huddle.
//!
//! The [`scheduler`] runs the hot-ranking recompute jobs on fixed intervals.
//! Each job drains its counters, so a run that overlaps a restart or a manual
//! trigger never counts the same activity twice.

pub mod scheduler;

pub use scheduler::{JobExecutor, ScheduledJob, SchedulerConfig, run_job, run_scheduler};
