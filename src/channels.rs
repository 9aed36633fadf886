//! Downstream data submission (spec §6.3, interface-only).
//!
//! The array-distribution plumbing itself is a collaborator's problem; this
//! module only defines the shape `process_burst_data` pushes through and
//! the lock-free mirror of `allowing_data` that lets a collaborator's
//! completion callback (running on its own thread, under its own lock)
//! decide whether a late submission still counts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Element type of a channel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleDtype {
    I16,
    I32,
    F32,
    F64,
}

/// An opaque allocation returned by [`ChannelsPort::allocate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Metadata a completion callback may inspect or mutate.
#[derive(Debug, Clone, Copy)]
pub struct SubmitMeta {
    pub channel: usize,
    pub unique_id: u64,
    pub t_burst: f64,
    pub wall_clock_ts: f64,
    /// Set to `false` by the callback to inhibit delivery after the fact.
    pub deliver: bool,
}

pub type CompletionCallback = Box<dyn FnOnce(&mut SubmitMeta) + Send>;

/// The per-channel submission primitive the adapter's channels factory
/// (spec §6.2) produces one of, per digitizer instance.
///
/// Implementations guarantee at most one concurrent submission per channel
/// arriving from the core's own call paths; onward distribution to
/// consumers is the implementation's responsibility.
pub trait ChannelsPort: Send + Sync {
    fn allocate(&self, num_samples: usize, dtype: SampleDtype) -> BufferHandle;

    /// Submits a filled buffer. Implementations should check
    /// [`AllowingData::get`] before doing real distribution work and
    /// silently drop the submission if it reads `false` — the core does
    /// not gate this call itself, since by the time a completion callback
    /// runs, the window may have already closed.
    fn submit(
        &self,
        handle: BufferHandle,
        channel: usize,
        unique_id: u64,
        t_burst: f64,
        wall_clock_ts: f64,
        on_complete: Option<CompletionCallback>,
    );
}

/// A lock-free mirror of the controller's `allowing_data` flag.
///
/// The authoritative flag lives inside the controller's mutex; this atomic
/// is updated at the same points so a channels-port implementation (running
/// on its own thread, potentially well after the port lock was released)
/// can make the "discard silently" check from spec §6.3 without contending
/// for the controller's lock. `ArmController` hands a clone of its own
/// instance to [`crate::adapter::DigitizerAdapter::make_channels_port`] at
/// construction, so a real `ChannelsPort` can actually reach it.
#[derive(Debug, Clone, Default)]
pub struct AllowingData(Arc<AtomicBool>);

impl AllowingData {
    pub fn new() -> Self {
        AllowingData(Arc::new(AtomicBool::new(false)))
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn set(&self, value: bool) {
        self.0.store(value, Ordering::Release);
    }
}
