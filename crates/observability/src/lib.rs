//! Process-wide tracing setup shared by warden binaries.

/// Install the JSON tracing subscriber.
///
/// Calling this more than once is harmless; later calls are no-ops.
pub fn init() {
    tracing::init(tracing::DEFAULT_DIRECTIVES);
}

pub mod tracing;
