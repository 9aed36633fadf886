//! The two views a [`crate::adapter::DigitizerAdapter`] callback gets of the
//! controller, one per half of spec §5's lock-discipline table.

use std::sync::MutexGuard;

use crate::burst::{BurstMeta, BurstMetaPublisher};
use crate::channels::ChannelsPort;
use crate::param::Scalar;

use super::bookkeeping::Bookkeeping;
use super::Inner;

/// Passed to callbacks the port lock is held for
/// (`wait_for_preconditions`, `check_settings`, `interrupt_reading`,
/// `on_disarmed`, `requested_sample_rate_changed`).
///
/// Only this type exposes the registry and the disarm-from-driver request —
/// both spec-required to run with the lock held.
pub struct HeldCtx<'a> {
    inner: &'a Inner,
    guard: Option<MutexGuard<'a, Bookkeeping>>,
}

impl<'a> HeldCtx<'a> {
    pub(crate) fn new(inner: &'a Inner, guard: MutexGuard<'a, Bookkeeping>) -> Self {
        HeldCtx {
            inner,
            guard: Some(guard),
        }
    }

    /// Hands the guard back to the caller, e.g. to resume the acquisition
    /// thread's own sequencing once a callback returns.
    pub(crate) fn into_guard(mut self) -> MutexGuard<'a, Bookkeeping> {
        self.guard.take().expect("HeldCtx guard missing on return")
    }

    fn guard(&self) -> &MutexGuard<'a, Bookkeeping> {
        self.guard.as_ref().expect("HeldCtx used while unlocked")
    }

    fn guard_mut(&mut self) -> &mut MutexGuard<'a, Bookkeeping> {
        self.guard.as_mut().expect("HeldCtx used while unlocked")
    }

    pub fn bookkeeping(&self) -> &Bookkeeping {
        self.guard()
    }

    pub fn bookkeeping_mut(&mut self) -> &mut Bookkeeping {
        self.guard_mut()
    }

    /// Drops the port lock for the duration of `f`, then retakes it.
    ///
    /// Only `wait_for_preconditions` is specified to use this (spec §5): a
    /// precondition wait that would otherwise hold the lock across an
    /// indefinite block.
    pub fn unlock_while<R>(&mut self, f: impl FnOnce() -> R) -> R {
        let guard = self.guard.take().expect("HeldCtx used while unlocked");
        drop(guard);
        let result = f();
        self.guard = Some(self.inner.bookkeeping.lock().expect("port lock poisoned"));
        result
    }

    /// Requests disarm from within a held callback (spec §4.2). No-op if
    /// already disarmed. Must not be called from inside `interrupt_reading`
    /// — re-entering the controller from that callback is undefined (spec
    /// §9 Open Questions).
    pub fn request_disarm_from_driver(&mut self) {
        let inner = self.inner;
        super::arming::handle_disarm_request(inner, self, super::bookkeeping::PendingRearm::Disarm);
    }

    /// Adapter-only write used by the default `requested_sample_rate_changed`.
    pub fn set_achievable_sample_rate(&mut self, rate: f64) {
        let bk = self.guard_mut();
        let base = bk.base;
        base.set_achievable_sample_rate(&mut bk.registry, rate);
    }
}

/// Passed to callbacks the port lock is NOT held for (`start_acquisition`,
/// `read_burst`, `check_overflow`, `process_burst_data`, `stop_acquisition`).
pub struct UnlockedCtx<'a> {
    inner: &'a Inner,
}

impl<'a> UnlockedCtx<'a> {
    pub(crate) fn new(inner: &'a Inner) -> Self {
        UnlockedCtx { inner }
    }

    pub fn channels(&self) -> &dyn ChannelsPort {
        self.inner.channels.as_ref()
    }

    /// Mutex not held (spec §4.2). Atomically writes the four burst-meta
    /// fields.
    pub fn publish_burst_meta(&self, meta: BurstMeta) {
        BurstMetaPublisher::new(self.inner.bus.as_ref(), &self.inner.burst_ids).publish(meta);
    }

    /// Mutex not held (spec §4.2). Sleeps for the current
    /// `SLEEP_AFTER_BURST` value if positive.
    pub fn maybe_sleep_for_testing(&self) {
        let seconds = {
            let bk = self.inner.bookkeeping.lock().expect("port lock poisoned");
            bk.sleep_after_burst
        };
        crate::testing::maybe_sleep(seconds);
    }

    /// True from the start of `wait_for_preconditions` until
    /// `stop_acquisition` has returned, or until an early-stage error is
    /// observed (spec §4.2).
    pub fn is_armed(&self) -> bool {
        let bk = self.inner.bookkeeping.lock().expect("port lock poisoned");
        bk.flags.armed
    }

    /// Blocks until disarm is first requested. Used by the default
    /// `read_burst` for adapters with no blocking call of their own.
    pub fn wait_for_disarm_signal(&self) {
        self.inner.disarm_requested_event.wait();
    }

    pub fn get_desired(&self, handle: crate::param::TypedParamHandle) -> Scalar {
        let bk = self.inner.bookkeeping.lock().expect("port lock poisoned");
        bk.registry.get(handle).get_desired()
    }
}
