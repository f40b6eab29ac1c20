//! Utility modules: logging setup, file system helpers, subprocess execution

pub mod fs;
pub mod logging;
pub mod process;

pub use logging::{init_default, init_from_env, init_logging, LoggingConfig};
pub use process::{Subprocess, SubprocessOutput};
