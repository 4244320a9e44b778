//! Library half of the `folio` binary: configuration, logging setup and
//! subcommand bodies.

pub mod commands;
pub mod config;
pub mod logging;

pub use config::{Config, StorageMode};
