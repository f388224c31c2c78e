//! Tracing/logging setup shared by the brewery binaries.

/// Log output format and subscriber initialization.
pub mod logging;

pub use logging::{LogFormat, ParseLogFormatError};

/// Initialize process-wide logging.
///
/// Format comes from `BREWERY_LOG_FORMAT` (`json` by default), filtering from
/// `RUST_LOG` (`info` by default). Safe to call multiple times; subsequent
/// calls are no-ops.
pub fn init() {
    logging::init(LogFormat::from_env());
}
