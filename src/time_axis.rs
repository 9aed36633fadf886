//! `TimeAxisPort` (spec §4.4 step 5, §6.4, component C9).
//!
//! Unlike [`crate::bus::ParamBus`] and [`crate::channels::ChannelsPort`],
//! this one is fully specified behaviour rather than a collaborator seam —
//! it's implemented directly, and consumers just read from it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, Default)]
struct Axis {
    unit: f64,
    num_pre: i64,
    num_post: i64,
}

/// Regenerates a relative time array on demand from the `(unit, num_pre,
/// num_post)` triple the controller programs at arm time.
///
/// `((i - num_pre) * unit)` for `i` in `[0, num_pre + num_post)`, truncated
/// to the caller's requested element count. An `update` counter increments
/// every time the triple changes, letting consumers detect staleness
/// without re-reading the whole array.
#[derive(Debug, Default)]
pub struct TimeAxisPort {
    axis: Mutex<Axis>,
    update: AtomicU64,
}

impl TimeAxisPort {
    pub fn new() -> Self {
        TimeAxisPort {
            axis: Mutex::new(Axis::default()),
            update: AtomicU64::new(0),
        }
    }

    /// Called by the acquisition thread once per arming (spec §4.4 step 5).
    pub fn configure(&self, unit: f64, num_pre: i64, num_post: i64) {
        let mut axis = self.axis.lock().expect("time axis mutex poisoned");
        *axis = Axis {
            unit,
            num_pre,
            num_post,
        };
        self.update.fetch_add(1, Ordering::Release);
    }

    /// Regenerates up to `max_len` elements of the relative time array.
    pub fn read(&self, max_len: usize) -> Vec<f64> {
        let axis = *self.axis.lock().expect("time axis mutex poisoned");
        let total = (axis.num_pre + axis.num_post).max(0) as usize;
        let len = total.min(max_len);
        (0..len)
            .map(|i| (i as i64 - axis.num_pre) as f64 * axis.unit)
            .collect()
    }

    /// Toggle consumers can poll to detect that `configure` ran again.
    pub fn update_counter(&self) -> u64 {
        self.update.load(Ordering::Acquire)
    }
}
