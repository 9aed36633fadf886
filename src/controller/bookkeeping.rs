//! Everything the port lock protects.

use crate::channels::AllowingData;
use crate::param::{ParamId, ParamRegistry, ProtectedParamGate};

use super::base::BaseParams;
use super::state::ArmState;

/// The plain (non-TypedParam) scalars fixed by spec §6.1: readback-only
/// identifiers and the two externally-writable knobs that aren't part of a
/// desired/effective pair.
#[derive(Debug, Clone, Copy)]
pub struct PlainParamIds {
    pub arm_request: ParamId,
    pub arm_state: ParamId,
    pub effective_sample_rate: ParamId,
    pub burst_id: ParamId,
    pub burst_t_burst: ParamId,
    pub burst_t_read: ParamId,
    pub burst_t_process: ParamId,
    pub sleep_after_burst: ParamId,
    pub digitizer_name: ParamId,
    pub time_array_unit_inv: ParamId,
}

/// What to do once the current arming's cleanup finishes (spec §4.4, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingRearm {
    None,
    Disarm,
    Arm(ArmState),
}

/// Flags read and written under the port lock by both T-ctrl and T-acq
/// (spec §5 "Shared resource policy").
#[derive(Debug, Clone, Copy, Default)]
pub struct Flags {
    pub disarm_requested: bool,
    pub in_read_loop: bool,
    pub allowing_data: bool,
    pub start_acquisition_attempted: bool,
    pub interrupt_reading_called: bool,
    /// True from the start of `wait_for_preconditions` until
    /// `stop_acquisition` returns, or an early-stage error is observed
    /// (spec §4.2 `is_armed`) — broader than `ArmState::is_armed_state`,
    /// which only covers the post-settings window.
    pub armed: bool,
}

/// The controller's entire mutable state, held behind one `Mutex` (the
/// "port lock" of spec §5).
pub struct Bookkeeping {
    pub registry: ParamRegistry,
    pub base: BaseParams,
    pub plain: PlainParamIds,
    pub gate: ProtectedParamGate,
    pub state: ArmState,
    pub flags: Flags,
    pub pending_rearm: PendingRearm,
    pub sleep_after_burst: f64,
    /// Mirrored to `allowing_data_external` on every change under the lock.
    pub(crate) allowing_data_external: AllowingData,
    pub rate_for_display: f64,
}

impl Bookkeeping {
    pub(crate) fn set_allowing_data(&mut self, value: bool) {
        self.flags.allowing_data = value;
        self.allowing_data_external.set(value);
    }
}
