//! `TestingSleep` (spec §2 C8, §4.2 `maybe_sleep_for_testing`).
//!
//! An optional post-burst delay, tunable via the `SLEEP_AFTER_BURST`
//! parameter, that exists purely to widen the window in which a test
//! harness can inject an overflow or a disarm between bursts.

use std::thread;
use std::time::Duration;

/// Sleeps for `seconds` if positive. Must be called with the controller
/// mutex NOT held (spec §4.2) — callers pass the already-read value rather
/// than a reference into locked state.
pub(crate) fn maybe_sleep(seconds: f64) {
    if seconds > 0.0 && seconds.is_finite() {
        thread::sleep(Duration::from_secs_f64(seconds));
    }
}
