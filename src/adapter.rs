//! `DigitizerAdapter` (spec §2 C4, §4.4, §5, §6.2).
//!
//! The hardware-specific half of the contract. An integrator implements
//! this trait once per digitizer family; `ArmController` drives it through
//! the arming sequence and the burst read loop.
//!
//! Every method documents the mutex discipline spec §5's table assigns it.
//! "Held"/"not held" callbacks take [`HeldCtx`]/[`UnlockedCtx`] respectively
//! — the type itself enforces which operations are reachable from which
//! callback, since only `HeldCtx` exposes the registry and only
//! `UnlockedCtx` exposes publishing and the testing sleep.

use std::sync::Arc;

use crate::channels::{AllowingData, ChannelsPort};
use crate::controller::{HeldCtx, UnlockedCtx};
use crate::param::ParamRegistry;

/// Filled in by `check_settings` (spec §4.4 step 4).
#[derive(Debug, Clone, Copy)]
pub struct ArmInfo {
    /// Mandatory; must be finite. Published as `EFFECTIVE_SAMPLE_RATE`.
    pub rate_for_display: f64,
    /// `None` means "use the snapshot values as-is".
    pub custom_num_pre: Option<i64>,
    pub custom_num_post: Option<i64>,
}

impl ArmInfo {
    pub(crate) fn new() -> Self {
        ArmInfo {
            rate_for_display: f64::NAN,
            custom_num_pre: None,
            custom_num_post: None,
        }
    }
}

/// Result of `check_overflow` (spec §4.4 burst loop).
#[derive(Debug, Clone, Copy, Default)]
pub struct OverflowStatus {
    pub had_overflow: bool,
    /// Bursts remaining in the hardware FIFO, including the one just read.
    /// Only meaningful if `had_overflow`.
    pub num_buffer_bursts: i64,
}

/// The hardware-facing half of the arming sequence.
///
/// `Send + Sync` because `requested_sample_rate_changed` is invoked from
/// whatever thread handles the external parameter write, while every other
/// callback runs on the controller's single acquisition thread — an
/// adapter implementation is responsible for its own internal
/// synchronisation between those two call sites.
pub trait DigitizerAdapter: Send + Sync {
    /// Whether this hardware can deliver pre-trigger samples at all
    /// (gates `PrePostTrigger`, spec §4.5).
    fn supports_pre_samples(&self) -> bool {
        false
    }

    fn num_channels(&self) -> usize;

    /// Produces the channels port this adapter instance submits through.
    /// Called once, at controller construction.
    ///
    /// `allowing_data` is a clone of the controller's own lock-free
    /// `allowing_data` mirror (spec §5, §6.3) — the returned
    /// [`ChannelsPort`]'s `submit` and any completion callback it runs
    /// should consult it and silently drop work once it reads `false`,
    /// since by the time a submission or its callback runs, the window may
    /// have already closed.
    fn make_channels_port(&self, allowing_data: AllowingData) -> Arc<dyn ChannelsPort>;

    /// Registers any hardware-specific `TypedParam`s this adapter needs
    /// (e.g. a gain or trigger-level knob) via [`ParamRegistry::register`].
    /// Called once, at controller construction, after the five base params
    /// are registered and before any of them are wired onto the bus — so
    /// adapter-supplied params get `DESIRED_*`/`EFFECTIVE_*` bus names, gate
    /// protection, and capture/push-effective treatment exactly like the
    /// base params (spec §3.3: "presented alongside adapter-supplied
    /// params"). The default implementation registers nothing.
    fn register_params(&self, registry: &mut ParamRegistry) {
        let _ = registry;
    }

    /// Mutex held on entry; may drop and retake internally via
    /// [`HeldCtx::unlock_while`]. Must leave the mutex held on return.
    /// Returning `false` aborts arming before any hardware call is made.
    fn wait_for_preconditions(&self, ctx: &mut HeldCtx<'_>) -> bool;

    /// Mutex held throughout; MUST NOT release. Fill in `arm_info`.
    fn check_settings(&self, ctx: &mut HeldCtx<'_>, arm_info: &mut ArmInfo) -> bool;

    /// Mutex not held. `overflow` is true when this call is an overflow
    /// recovery restart rather than a fresh arm.
    fn start_acquisition(&self, overflow: bool) -> bool;

    /// Mutex not held. Must return promptly once interrupted, and must
    /// return `true` in that case — it does not distinguish interruption
    /// from a genuine successful read.
    ///
    /// The default implementation is for adapters with no blocking read of
    /// their own: it blocks on `disarm_requested_event` and always returns
    /// `true`, relying entirely on the controller to wake it.
    fn read_burst(&self, ctx: &UnlockedCtx<'_>) -> bool {
        ctx.wait_for_disarm_signal();
        true
    }

    /// Mutex not held.
    fn check_overflow(&self, ctx: &UnlockedCtx<'_>) -> Option<OverflowStatus> {
        let _ = ctx;
        Some(OverflowStatus::default())
    }

    /// Mutex not held. Push per-channel arrays through the channels port
    /// and call [`UnlockedCtx::publish_burst_meta`].
    fn process_burst_data(&self, ctx: &UnlockedCtx<'_>) -> bool;

    /// Mutex held; MUST NOT release; MUST NOT block. Make any ongoing and
    /// future `read_burst` return promptly. Called at most once per arming.
    fn interrupt_reading(&self, ctx: &mut HeldCtx<'_>) {
        let _ = ctx;
    }

    /// Mutex not held.
    fn stop_acquisition(&self) {}

    /// Mutex held; MUST NOT release; MUST NOT block.
    fn on_disarmed(&self, ctx: &mut HeldCtx<'_>) {
        let _ = ctx;
    }

    /// Mutex held; MUST NOT release. Default implementation echoes the
    /// desired rate straight through to `achievable_sample_rate` (spec
    /// §4.3).
    fn requested_sample_rate_changed(&self, ctx: &mut HeldCtx<'_>, requested: f64) {
        ctx.set_achievable_sample_rate(requested);
    }
}
