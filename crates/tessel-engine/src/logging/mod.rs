//! Logger initialization.
//!
//! Everything in the workspace logs through the `log` facade; binaries call
//! `init_logging` once before creating a window.

mod init;

pub use init::{init_logging, LoggingConfig};
