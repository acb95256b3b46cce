//! Process-level environment for binaries driving the engine.

pub mod logging;

pub use self::logging::{init_logger, LogFormat, LogLevel, OutputLocation};
