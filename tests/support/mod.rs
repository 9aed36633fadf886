//! Shared test scaffolding: an in-memory `ParamBus` and a scriptable
//! `DigitizerAdapter`, standing in for the real control-system bus and
//! real hardware (both out of scope per spec §1).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use trc_core::adapter::{ArmInfo, DigitizerAdapter, OverflowStatus};
use trc_core::bus::ParamBus;
use trc_core::channels::{AllowingData, BufferHandle, ChannelsPort, CompletionCallback, SampleDtype};
use trc_core::controller::{HeldCtx, UnlockedCtx};
use trc_core::param::{ParamId, ParamKind, ParamRegistry, Scalar, TypedParamHandle};

#[derive(Debug, Clone, Copy)]
enum BusValue {
    I32(i32),
    F64(f64),
}

/// Records every `register`/`publish_*` call so a test can read back
/// readbacks by name, the way a real control-system bus would let a client
/// subscribe by record name.
#[derive(Default)]
pub struct InMemoryBus {
    names: Mutex<HashMap<ParamId, &'static str>>,
    ids: Mutex<HashMap<&'static str, ParamId>>,
    values: Mutex<HashMap<ParamId, BusValue>>,
    strings: Mutex<HashMap<ParamId, String>>,
}

impl ParamBus for InMemoryBus {
    fn register(&self, id: ParamId, name: &'static str) {
        self.names.lock().unwrap().insert(id, name);
        self.ids.lock().unwrap().insert(name, id);
    }

    fn publish_i32(&self, id: ParamId, value: i32) {
        self.values.lock().unwrap().insert(id, BusValue::I32(value));
    }

    fn publish_f64(&self, id: ParamId, value: f64) {
        self.values.lock().unwrap().insert(id, BusValue::F64(value));
    }

    fn publish_str(&self, id: ParamId, value: &str) {
        self.strings.lock().unwrap().insert(id, value.to_string());
    }

    fn flush(&self) {}
}

impl InMemoryBus {
    pub fn id_by_name(&self, name: &str) -> ParamId {
        *self
            .ids
            .lock()
            .unwrap()
            .get(name)
            .unwrap_or_else(|| panic!("no param registered under {name:?}"))
    }

    pub fn i32_by_name(&self, name: &str) -> i32 {
        let id = self.id_by_name(name);
        match self.values.lock().unwrap().get(&id) {
            Some(BusValue::I32(v)) => *v,
            other => panic!("{name:?} is not an i32 value: {other:?}"),
        }
    }

    pub fn f64_by_name(&self, name: &str) -> f64 {
        let id = self.id_by_name(name);
        match self.values.lock().unwrap().get(&id) {
            Some(BusValue::F64(v)) => *v,
            other => panic!("{name:?} is not an f64 value: {other:?}"),
        }
    }
}

/// Drops every submission; only counts them. Checks `allowing_data` before
/// counting, same as a real `ChannelsPort` should (spec §6.3) — wired up by
/// [`ScriptedAdapter::make_channels_port`] once the controller hands it the
/// real flag, so `allowed()` reports `true` unconditionally until then.
#[derive(Default)]
pub struct CountingChannels {
    pub allocations: AtomicUsize,
    pub submissions: AtomicUsize,
    allowing_data: Mutex<Option<AllowingData>>,
}

impl CountingChannels {
    fn set_allowing_data(&self, allowing_data: AllowingData) {
        *self.allowing_data.lock().unwrap() = Some(allowing_data);
    }

    fn allowed(&self) -> bool {
        self.allowing_data
            .lock()
            .unwrap()
            .as_ref()
            .map_or(true, AllowingData::get)
    }
}

impl ChannelsPort for CountingChannels {
    fn allocate(&self, _num_samples: usize, _dtype: SampleDtype) -> BufferHandle {
        let n = self.allocations.fetch_add(1, Ordering::SeqCst) as u64;
        BufferHandle(n)
    }

    fn submit(
        &self,
        _handle: BufferHandle,
        _channel: usize,
        _unique_id: u64,
        _t_burst: f64,
        _wall_clock_ts: f64,
        on_complete: Option<CompletionCallback>,
    ) {
        if !self.allowed() {
            return;
        }
        self.submissions.fetch_add(1, Ordering::SeqCst);
        if let Some(cb) = on_complete {
            let mut meta = trc_core::channels::SubmitMeta {
                channel: 0,
                unique_id: 0,
                t_burst: 0.0,
                wall_clock_ts: 0.0,
                deliver: true,
            };
            cb(&mut meta);
        }
    }
}

/// A fully scriptable [`DigitizerAdapter`] for exercising the arming
/// sequence's stages and error paths without real hardware.
#[derive(Default)]
pub struct ScriptedAdapter {
    pub preconditions_ok: AtomicBool,
    pub supports_pre: AtomicBool,
    pub settings_ok: AtomicBool,
    pub rate_for_display: Mutex<f64>,
    pub start_ok: AtomicBool,
    pub process_ok: AtomicBool,

    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub interrupt_calls: AtomicUsize,
    pub read_burst_calls: AtomicUsize,
    pub processed: AtomicI64,

    /// When set, `read_burst` blocks in a poll loop until `interrupted`
    /// flips, then returns `true` without having been "woken" by anything
    /// but this adapter's own `interrupt_reading`.
    pub block_until_interrupted: AtomicBool,
    pub interrupted: AtomicBool,

    /// Burst count (already processed, before this read) at which
    /// `check_overflow` should report an overflow. -1 disables.
    pub overflow_at: AtomicI64,
    pub overflow_num_buffer_bursts: AtomicI64,
    pub overflow_triggered: AtomicBool,

    /// When set, `register_params` adds one extra `TypedParam` ("GAIN") to
    /// prove adapter-supplied params get the same bus wiring and
    /// capture/push-effective treatment as the controller's own base params
    /// (spec §3.3: "presented alongside adapter-supplied params").
    pub register_gain_param: AtomicBool,
    pub gain_handle: Mutex<Option<TypedParamHandle>>,

    /// When set, `register_params` additionally registers a param under
    /// this name — used to exercise the duplicate-name rejection at
    /// construction (spec §7 "Fatal init failure").
    pub duplicate_name: Mutex<Option<&'static str>>,

    pub channels: Arc<CountingChannels>,
}

impl ScriptedAdapter {
    pub fn new() -> Arc<Self> {
        let a = ScriptedAdapter {
            channels: Arc::new(CountingChannels::default()),
            overflow_at: AtomicI64::new(-1),
            ..Default::default()
        };
        a.preconditions_ok.store(true, Ordering::SeqCst);
        a.settings_ok.store(true, Ordering::SeqCst);
        a.start_ok.store(true, Ordering::SeqCst);
        a.process_ok.store(true, Ordering::SeqCst);
        *a.rate_for_display.lock().unwrap() = 1_000_000.0;
        Arc::new(a)
    }

    /// The gain handle registered by `register_params`, once a controller
    /// backed by this adapter has been constructed with
    /// `register_gain_param` set beforehand.
    pub fn gain_handle(&self) -> TypedParamHandle {
        self.gain_handle
            .lock()
            .unwrap()
            .expect("register_gain_param must be set before controller construction")
    }
}

impl DigitizerAdapter for ScriptedAdapter {
    fn supports_pre_samples(&self) -> bool {
        self.supports_pre.load(Ordering::SeqCst)
    }

    fn num_channels(&self) -> usize {
        1
    }

    fn make_channels_port(&self, allowing_data: AllowingData) -> Arc<dyn ChannelsPort> {
        self.channels.set_allowing_data(allowing_data);
        self.channels.clone() as Arc<dyn ChannelsPort>
    }

    fn register_params(&self, registry: &mut ParamRegistry) {
        if self.register_gain_param.load(Ordering::SeqCst) {
            let handle = registry.register(ParamKind::RealReal, "GAIN", Scalar::Real(f64::NAN), false);
            *self.gain_handle.lock().unwrap() = Some(handle);
        }
        if let Some(name) = *self.duplicate_name.lock().unwrap() {
            registry.register(ParamKind::RealReal, name, Scalar::Real(f64::NAN), false);
        }
    }

    fn wait_for_preconditions(&self, _ctx: &mut HeldCtx<'_>) -> bool {
        self.preconditions_ok.load(Ordering::SeqCst)
    }

    fn check_settings(&self, _ctx: &mut HeldCtx<'_>, arm_info: &mut ArmInfo) -> bool {
        arm_info.rate_for_display = *self.rate_for_display.lock().unwrap();
        self.settings_ok.load(Ordering::SeqCst)
    }

    fn start_acquisition(&self, _overflow: bool) -> bool {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.start_ok.load(Ordering::SeqCst)
    }

    fn read_burst(&self, _ctx: &UnlockedCtx<'_>) -> bool {
        self.read_burst_calls.fetch_add(1, Ordering::SeqCst);
        if self.block_until_interrupted.load(Ordering::SeqCst) {
            while !self.interrupted.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(2));
            }
            self.interrupted.store(false, Ordering::SeqCst);
        }
        true
    }

    fn check_overflow(&self, _ctx: &UnlockedCtx<'_>) -> Option<OverflowStatus> {
        let at = self.overflow_at.load(Ordering::SeqCst);
        if at >= 0
            && self.processed.load(Ordering::SeqCst) == at
            && !self.overflow_triggered.swap(true, Ordering::SeqCst)
        {
            Some(OverflowStatus {
                had_overflow: true,
                num_buffer_bursts: self.overflow_num_buffer_bursts.load(Ordering::SeqCst),
            })
        } else {
            Some(OverflowStatus::default())
        }
    }

    fn process_burst_data(&self, ctx: &UnlockedCtx<'_>) -> bool {
        self.processed.fetch_add(1, Ordering::SeqCst);
        let handle = ctx.channels().allocate(8, SampleDtype::F32);
        ctx.channels().submit(handle, 0, 0, 0.0, 0.0, None);
        self.process_ok.load(Ordering::SeqCst)
    }

    fn interrupt_reading(&self, _ctx: &mut HeldCtx<'_>) {
        self.interrupt_calls.fetch_add(1, Ordering::SeqCst);
        self.interrupted.store(true, Ordering::SeqCst);
    }

    fn stop_acquisition(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Polls `f` until it returns `true` or `timeout` elapses, panicking on
/// timeout. Used instead of a fixed sleep to wait for the acquisition
/// thread to reach a state a test wants to act on.
pub fn wait_until(timeout: Duration, mut f: impl FnMut() -> bool) {
    let start = std::time::Instant::now();
    while !f() {
        if start.elapsed() > timeout {
            panic!("condition not met within {timeout:?}");
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}
