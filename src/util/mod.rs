//! Utility modules for devstack

pub mod logging;

pub use logging::{init_logging, LoggingConfig};
