//! The parameter-bus seam (spec §6.1).
//!
//! The control-system bus wrapping itself is out of scope — what's defined
//! here is the minimal shape `ArmController` needs to publish readbacks and
//! accept writes. A real integrator backs this with whatever record/IOC
//! layer their control system provides; the demo binary backs it with an
//! in-memory map.

use crate::param::ParamId;

/// A named, externally-visible scalar slot.
///
/// `ArmController` calls `register` once per parameter at construction and
/// `publish_*`/`flush` whenever a readback changes. It never calls anything
/// else on this trait — external writes arrive the other way, through
/// whatever mechanism the bus uses to call into `ArmController`'s own write
/// handlers.
pub trait ParamBus: Send + Sync {
    /// Associates `id` with its bus-visible `name` (e.g. `"DESIRED_NUM_BURSTS"`).
    fn register(&self, id: ParamId, name: &'static str);

    fn publish_i32(&self, id: ParamId, value: i32);

    fn publish_f64(&self, id: ParamId, value: f64);

    fn publish_str(&self, id: ParamId, value: &str);

    /// Makes prior `publish_*` calls visible to readers. Bus implementations
    /// that publish synchronously may no-op this.
    fn flush(&self);
}
