//! Applying updates to the local content tree.
//!
//! The batch pipeline runs fetch-then-install over many descriptors
//! under bounded parallelism and aggregates the outcome; single catalog
//! items install and uninstall under one process-wide lock.

mod check;
mod error;
mod report;
mod updater;

pub use check::check_for_updates;
pub use error::{Result, UpdateError};
pub use report::{BatchOptions, BatchReport, FailedUpdate};
pub use updater::Updater;
