//! Crawl task state machine
//!
//! One persisted task per domain moves through
//! ACTIVE → TAKEN → FINISHED | FAILED and back to ACTIVE through the sweeps.
//! This module holds the task record, the adapter that performs every
//! transition, the periodic sweeps and the launcher that runs claimed tasks.

mod adapter;
mod launcher;
mod status;
mod sweeper;
mod task;

pub use adapter::CrawlTaskAdapter;
pub use launcher::Launcher;
pub use status::TaskStatus;
pub use sweeper::{SweepReport, Sweeper};
pub use task::{CrawlTask, DEFAULT_FREQUENCY, DEFAULT_IMPORTANCE};
