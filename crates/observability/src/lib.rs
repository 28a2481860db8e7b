//! Tracing/logging setup shared by the binaries.

/// Initialize process-wide tracing with the given output format.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init(format: LogFormat) {
    tracing::init(format);
}

/// Tracing configuration (filters, formats).
pub mod tracing;

pub use tracing::{LogFormat, ParseLogFormatError};
