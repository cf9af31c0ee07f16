//! Logging utilities.
//!
//! Centralizes logger initialization. Engine code only talks to the `log`
//! facade; `env_logger` is the backend installed by `init_logging`.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
