//! `ArmController` (spec §2 C5, §4.2–§4.6): the arming-sequence state
//! machine and the single thread that runs it.

mod arming;
mod base;
mod bookkeeping;
mod ctx;
mod state;

pub use base::BaseParams;
pub use bookkeeping::{Bookkeeping, Flags, PendingRearm, PlainParamIds};
pub use ctx::{HeldCtx, UnlockedCtx};
pub use state::{ArmState, UnknownArmState};

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use trc_sync::CancelToken;

use crate::adapter::DigitizerAdapter;
use crate::burst::BurstMetaIds;
use crate::bus::ParamBus;
use crate::channels::{AllowingData, ChannelsPort};
use crate::error::{ArmRequestError, GateError};
use crate::logging::{Level, LogSink, TracingSink};
use crate::param::{ParamId, ParamRegistry, ProtectedParamGate, Scalar};
use crate::time_axis::TimeAxisPort;

/// Initial desired values seeded at construction (spec §4.1: "external
/// records may carry their own initial value at bring-up" — this crate has
/// no record/template layer, so a config struct is the stand-in).
#[derive(Debug, Clone, Copy)]
pub struct ArmControllerConfig {
    pub digitizer_name: &'static str,
    pub num_bursts: i32,
    pub num_post_samples: i32,
    pub num_pre_post_samples: i32,
    pub requested_sample_rate: f64,
    pub sleep_after_burst: f64,
}

impl Default for ArmControllerConfig {
    fn default() -> Self {
        ArmControllerConfig {
            digitizer_name: "unnamed",
            num_bursts: 1,
            num_post_samples: 1,
            num_pre_post_samples: 0,
            requested_sample_rate: 0.0,
            sleep_after_burst: 0.0,
        }
    }
}

pub(crate) struct Inner {
    pub(crate) bookkeeping: Mutex<Bookkeeping>,
    pub(crate) bus: Arc<dyn ParamBus>,
    pub(crate) adapter: Arc<dyn DigitizerAdapter>,
    pub(crate) channels: Arc<dyn ChannelsPort>,
    pub(crate) time_axis: TimeAxisPort,
    pub(crate) log: Arc<dyn LogSink>,
    pub(crate) burst_ids: BurstMetaIds,
    pub(crate) start_arming: CancelToken,
    pub(crate) disarm_requested_event: CancelToken,
    pub(crate) shutdown: CancelToken,
}

/// The arming-sequence controller. Owns the acquisition thread for as long
/// as it's alive; dropping it requests shutdown and joins the thread.
pub struct ArmController {
    inner: Arc<Inner>,
    worker: Option<JoinHandle<()>>,
}

impl ArmController {
    /// Fatal per spec §7: construction failure has no recoverable path —
    /// callers are expected to log and exit rather than retry or continue.
    pub fn new(
        bus: Arc<dyn ParamBus>,
        adapter: Arc<dyn DigitizerAdapter>,
        config: ArmControllerConfig,
    ) -> Result<Self, crate::error::ParamError> {
        Self::with_log_sink(bus, adapter, config, Arc::new(TracingSink))
    }

    pub fn with_log_sink(
        bus: Arc<dyn ParamBus>,
        adapter: Arc<dyn DigitizerAdapter>,
        config: ArmControllerConfig,
        log: Arc<dyn LogSink>,
    ) -> Result<Self, crate::error::ParamError> {
        let allowing_data = AllowingData::new();
        let channels = adapter.make_channels_port(allowing_data.clone());

        let mut registry = ParamRegistry::new();
        let base = base::BaseParams::register(&mut registry);
        adapter.register_params(&mut registry);

        if let Some(dup) = registry.find_duplicate_base_name() {
            return Err(crate::error::ParamError::AlreadyInitialised(dup));
        }

        let mut next_plain = registry_next_id(&registry);
        let mut alloc = move || {
            let id = ParamId::new(next_plain);
            next_plain += 1;
            id
        };
        let plain = PlainParamIds {
            arm_request: alloc(),
            arm_state: alloc(),
            effective_sample_rate: alloc(),
            burst_id: alloc(),
            burst_t_burst: alloc(),
            burst_t_read: alloc(),
            burst_t_process: alloc(),
            sleep_after_burst: alloc(),
            digitizer_name: alloc(),
            time_array_unit_inv: alloc(),
        };

        let mut gate = ProtectedParamGate::new();
        gate.absorb_registry(&registry);
        gate.protect(plain.arm_state);
        gate.protect(plain.effective_sample_rate);
        gate.protect(plain.burst_id);
        gate.protect(plain.burst_t_burst);
        gate.protect(plain.burst_t_read);
        gate.protect(plain.burst_t_process);
        gate.protect(plain.digitizer_name);

        for param in registry.iter() {
            bus.register(param.desired_id(), leak_name("DESIRED_", param.base_name()));
            bus.register(param.effective_id(), leak_name("EFFECTIVE_", param.base_name()));
        }
        bus.register(plain.arm_request, "ARM_REQUEST");
        bus.register(plain.arm_state, "ARM_STATE");
        bus.register(plain.effective_sample_rate, "EFFECTIVE_SAMPLE_RATE");
        bus.register(plain.burst_id, "BURST_ID");
        bus.register(plain.burst_t_burst, "BURST_TIME_BURST");
        bus.register(plain.burst_t_read, "BURST_TIME_READ");
        bus.register(plain.burst_t_process, "BURST_TIME_PROCESS");
        bus.register(plain.sleep_after_burst, "SLEEP_AFTER_BURST");
        bus.register(plain.digitizer_name, "DIGITIZER_NAME");
        bus.register(plain.time_array_unit_inv, "TIME_ARRAY_UNIT_INV");

        registry
            .get_mut(base.num_bursts)
            .write_desired_from_bus(Scalar::Int(config.num_bursts));
        registry
            .get_mut(base.num_post_samples)
            .write_desired_from_bus(Scalar::Int(config.num_post_samples));
        registry
            .get_mut(base.num_pre_post_samples)
            .write_desired_from_bus(Scalar::Int(config.num_pre_post_samples));
        registry
            .get_mut(base.requested_sample_rate)
            .write_desired_from_bus(Scalar::Real(config.requested_sample_rate));

        let burst_ids = BurstMetaIds {
            burst_id: plain.burst_id,
            t_burst: plain.burst_t_burst,
            t_read: plain.burst_t_read,
            t_process: plain.burst_t_process,
        };

        let bookkeeping = Bookkeeping {
            registry,
            base,
            plain,
            gate,
            state: ArmState::Disarm,
            flags: Flags::default(),
            pending_rearm: PendingRearm::None,
            sleep_after_burst: config.sleep_after_burst,
            allowing_data_external: allowing_data,
            rate_for_display: f64::NAN,
        };

        let inner = Arc::new(Inner {
            bookkeeping: Mutex::new(bookkeeping),
            bus,
            adapter,
            channels,
            time_axis: TimeAxisPort::new(),
            log,
            burst_ids,
            start_arming: CancelToken::new(),
            disarm_requested_event: CancelToken::new(),
            shutdown: CancelToken::new(),
        });

        inner.bus.publish_str(plain.digitizer_name, config.digitizer_name);
        inner.bus.publish_i32(plain.arm_state, ArmState::Disarm.into());
        {
            let guard = inner.bookkeeping.lock().expect("port lock poisoned");
            arming::publish_all_effective(&inner, &guard);
        }
        inner.bus.flush();

        let worker = {
            let inner = Arc::clone(&inner);
            thread::Builder::new()
                .name("trc-acquisition".into())
                .spawn(move || arming::acquisition_thread(inner))
                .expect("failed to spawn acquisition thread")
        };

        Ok(ArmController {
            inner,
            worker: Some(worker),
        })
    }

    /// Write to `ARM_REQUEST` (spec §4.3). Only `Disarm`/`PostTrigger`/
    /// `PrePostTrigger` are accepted.
    pub fn write_arm_request(&self, value: i32) -> Result<(), ArmRequestError> {
        let requested = match value {
            0 => ArmState::Disarm,
            1 => ArmState::PostTrigger,
            2 => ArmState::PrePostTrigger,
            other => return Err(ArmRequestError::InvalidValue(other)),
        };

        let guard = self.inner.bookkeeping.lock().expect("port lock poisoned");
        let mut ctx = HeldCtx::new(&self.inner, guard);
        let current = ctx.bookkeeping().state;

        if current == ArmState::Disarm {
            if requested != ArmState::Disarm {
                arming::start_arming(&self.inner, &mut ctx, requested);
            }
        } else {
            let target = if requested == ArmState::Disarm {
                PendingRearm::Disarm
            } else {
                PendingRearm::Arm(requested)
            };
            arming::handle_disarm_request(&self.inner, &mut ctx, target);
        }

        Ok(())
    }

    /// Write to `DESIRED_REQUESTED_SAMPLE_RATE` (spec §4.3): accept, then
    /// invoke `requested_sample_rate_changed`.
    pub fn write_requested_sample_rate(&self, value: f64) -> Result<(), GateError> {
        let guard = self.inner.bookkeeping.lock().expect("port lock poisoned");
        let mut ctx = HeldCtx::new(&self.inner, guard);
        let handle = ctx.bookkeeping().base.requested_sample_rate;
        ctx.bookkeeping_mut()
            .registry
            .get_mut(handle)
            .write_desired_from_bus(Scalar::Real(value));
        self.inner.adapter.requested_sample_rate_changed(&mut ctx, value);
        Ok(())
    }

    /// Write to `SLEEP_AFTER_BURST`.
    pub fn write_sleep_after_burst(&self, seconds: f64) -> Result<(), GateError> {
        let mut bk = self.inner.bookkeeping.lock().expect("port lock poisoned");
        bk.sleep_after_burst = seconds;
        Ok(())
    }

    /// Write to the desired half of any registered `TypedParam` by id (spec
    /// §3.3 base params `NUM_BURSTS`/`NUM_POST_SAMPLES`/
    /// `NUM_PRE_POST_SAMPLES`, and any adapter-registered param). Rejected
    /// if `id` is in the [`ProtectedParamGate`](crate::param::ProtectedParamGate)
    /// (e.g. it names an internal param's desired id, or isn't a desired id
    /// at all).
    pub fn write_desired_i32(&self, id: ParamId, value: i32) -> Result<(), GateError> {
        self.write_desired_scalar(id, Scalar::Int(value))
    }

    /// As [`Self::write_desired_i32`], for real-valued desired params.
    pub fn write_desired_f64(&self, id: ParamId, value: f64) -> Result<(), GateError> {
        self.write_desired_scalar(id, Scalar::Real(value))
    }

    fn write_desired_scalar(&self, id: ParamId, value: Scalar) -> Result<(), GateError> {
        let mut bk = self.inner.bookkeeping.lock().expect("port lock poisoned");
        if let Err(e) = bk.gate.check_write(id) {
            self.inner.log.log(Level::Error, "write", &e.to_string());
            return Err(e);
        }
        bk.registry.write_desired_by_id(id, value);
        Ok(())
    }

    /// Generic write-protect check for any other write an integrator routes
    /// through this controller (spec §4.3 "any write whose target is in
    /// the ProtectedParamGate is rejected").
    pub fn check_write_allowed(&self, id: ParamId) -> Result<(), GateError> {
        let bk = self.inner.bookkeeping.lock().expect("port lock poisoned");
        let result = bk.gate.check_write(id);
        if let Err(ref e) = result {
            self.inner.log.log(Level::Error, "write", &e.to_string());
        }
        result
    }

    pub fn is_armed(&self) -> bool {
        let bk = self.inner.bookkeeping.lock().expect("port lock poisoned");
        bk.flags.armed
    }

    pub fn arm_state(&self) -> ArmState {
        self.inner.bookkeeping.lock().expect("port lock poisoned").state
    }

    pub fn time_axis(&self) -> &TimeAxisPort {
        &self.inner.time_axis
    }
}

impl Drop for ArmController {
    fn drop(&mut self) {
        self.inner.shutdown.signal();
        self.inner.start_arming.signal();
        self.inner.disarm_requested_event.signal();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn registry_next_id(registry: &ParamRegistry) -> u32 {
    registry.iter().count() as u32 * 2
}

/// `ParamBus::register` wants a `&'static str`; base names are all known at
/// compile time but built by concatenation, so this leaks a small, bounded
/// number of strings (one pair per registered parameter, for the lifetime
/// of the process) rather than threading lifetimes through `ParamBus`.
fn leak_name(prefix: &str, base: &str) -> &'static str {
    Box::leak(format!("{prefix}{base}").into_boxed_str())
}
