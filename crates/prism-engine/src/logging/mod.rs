//! Logging utilities.
//!
//! Two layers:
//! - `init_logging` installs `env_logger` behind the `log` facade, once per process
//! - `Diagnostics` is the handle components receive at construction; it tags each
//!   line with the component scope and writes to an injectable `LogSink`

mod diagnostics;
mod init;

pub use diagnostics::{Diagnostics, FacadeSink, LogRecord, LogSink, MemorySink};
pub use init::{init_logging, LoggingConfig};
