//! Thin logging seam over `tracing` (spec ambient stack).
//!
//! `ArmController` logs through a [`LogSink`] rather than calling `tracing`
//! macros directly, so an integrator embedding this in a process with its
//! own subscriber conventions can redirect output without us dictating
//! target names. [`TracingSink`], the default, just forwards to `tracing`.

/// One severity level the controller ever logs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// Where `ArmController` sends its log output.
///
/// Implementations are called with the port lock held in some cases (arming
/// transitions) and not held in others (burst publication) — they must not
/// block, since `tracing`'s own subscribers are expected to be non-blocking
/// and this crate makes the same assumption of whatever is plugged in here.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, target: &str, message: &str);
}

/// Forwards every call to the `tracing` macros under the `trc_core` target
/// prefix. Installed by default; pair with `tracing-subscriber` to see
/// output.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, target: &str, message: &str) {
        match level {
            Level::Debug => tracing::debug!(target: "trc_core", subtarget = target, "{message}"),
            Level::Info => tracing::info!(target: "trc_core", subtarget = target, "{message}"),
            Level::Warn => tracing::warn!(target: "trc_core", subtarget = target, "{message}"),
            Level::Error => tracing::error!(target: "trc_core", subtarget = target, "{message}"),
        }
    }
}

/// A sink that drops everything. Useful for tests that want a quiet
/// controller without pulling in `tracing-subscriber`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _level: Level, _target: &str, _message: &str) {}
}
