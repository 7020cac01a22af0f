//! HTTP fetching with mirror fallback, bounded retries, and cooperative
//! cancellation.
//!
//! The crate splits the way the rest of the workspace does: `data` holds
//! immutable configuration values, `core` the pure decisions, and
//! `effects` the I/O behind the [`HttpClient`] seam.

mod core;
mod data;
mod effects;
mod error;

pub use self::core::mirror_urls;
pub use data::{RetryPolicy, Timeouts};
pub use effects::{Fetcher, HttpClient, ReqwestClient};
pub use error::{FetchError, Result};
