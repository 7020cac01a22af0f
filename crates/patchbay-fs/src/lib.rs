//! Atomic file placement for downloaded content.
//!
//! Installs never expose a partially written file: bytes land in a
//! uniquely named temporary file inside the target directory, the handle
//! is closed, and the temporary file is renamed onto the final path.
//! Readers of the final path see the old content or the new content,
//! nothing in between.

mod error;
mod install;

pub use error::{Error, Result};
pub use install::{install_bytes, remove_existing};
