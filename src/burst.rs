//! `BurstMetaPublisher` (spec §3.5, §4.7, component C6).

use crate::bus::ParamBus;
use crate::param::ParamId;

/// One burst's metadata, as reported to the adapter's `process_burst_data`
/// and then handed to [`BurstMetaPublisher::publish`].
///
/// NaN in a real field means "not reported". `burst_id` wraps on overflow —
/// it is a running count, not an index the adapter can rely on staying
/// below any bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurstMeta {
    pub burst_id: i32,
    pub t_burst: f64,
    pub t_read: f64,
    pub t_process: f64,
}

impl BurstMeta {
    pub fn unreported(burst_id: i32) -> Self {
        BurstMeta {
            burst_id,
            t_burst: f64::NAN,
            t_read: f64::NAN,
            t_process: f64::NAN,
        }
    }
}

pub(crate) struct BurstMetaIds {
    pub burst_id: ParamId,
    pub t_burst: ParamId,
    pub t_read: ParamId,
    pub t_process: ParamId,
}

/// Writes the four burst-meta fields to the bus as one unit and flushes.
///
/// Ordering relative to array submission for the same burst is the
/// adapter's concern (spec §4.7): this publisher only guarantees the four
/// fields land together.
pub struct BurstMetaPublisher<'a> {
    bus: &'a dyn ParamBus,
    ids: &'a BurstMetaIds,
}

impl<'a> BurstMetaPublisher<'a> {
    pub(crate) fn new(bus: &'a dyn ParamBus, ids: &'a BurstMetaIds) -> Self {
        BurstMetaPublisher { bus, ids }
    }

    pub fn publish(&self, meta: BurstMeta) {
        self.bus.publish_i32(self.ids.burst_id, meta.burst_id);
        self.bus.publish_f64(self.ids.t_burst, meta.t_burst);
        self.bus.publish_f64(self.ids.t_read, meta.t_read);
        self.bus.publish_f64(self.ids.t_process, meta.t_process);
        self.bus.flush();
    }
}
