//! Tracing/logging setup shared by fiskal hosts and tests.

/// Tracing configuration (filters, formatting).
pub mod tracing;

/// Initialize process-wide logging.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}
