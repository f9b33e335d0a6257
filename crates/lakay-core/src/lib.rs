//! Lakay core — shared error type, configuration, data directory layout.

pub mod config;
pub mod error;

pub use config::{DataPaths, LakayConfig};
pub use error::{Error, Result};
