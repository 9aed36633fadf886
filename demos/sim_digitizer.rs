//! Drives [`trc_core::controller::ArmController`] against an in-process
//! simulated digitizer: no real hardware, just a timer-free loop that
//! manufactures bursts as fast as the read loop asks for them.
//!
//! ```text
//! cargo run --example sim-digitizer -- --num-bursts 5 --num-post-samples 256 --rate 1e6
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;

use trc_core::adapter::{ArmInfo, DigitizerAdapter, OverflowStatus};
use trc_core::burst::BurstMeta;
use trc_core::bus::ParamBus;
use trc_core::channels::{AllowingData, BufferHandle, ChannelsPort, CompletionCallback, SampleDtype};
use trc_core::controller::{ArmController, ArmControllerConfig, HeldCtx, UnlockedCtx};
use trc_core::param::ParamId;

#[derive(Parser, Debug)]
#[command(about = "Exercises the arming sequence against a simulated digitizer")]
struct Args {
    #[arg(long, default_value_t = 5)]
    num_bursts: i32,

    #[arg(long, default_value_t = 256)]
    num_post_samples: i32,

    #[arg(long, default_value_t = 1_000_000.0)]
    rate: f64,

    /// Arm with pre+post triggering instead of post-only.
    #[arg(long)]
    pre_post: bool,

    #[arg(long, default_value_t = 64)]
    num_pre_samples: i32,
}

/// The minimal `ParamBus` a demo needs: a name<->id map plus a value store,
/// printed to stdout on every publish so the arming sequence is visible on
/// the console.
#[derive(Default)]
struct ConsoleBus {
    names: Mutex<HashMap<ParamId, &'static str>>,
}

impl ParamBus for ConsoleBus {
    fn register(&self, id: ParamId, name: &'static str) {
        self.names.lock().expect("bus mutex poisoned").insert(id, name);
    }

    fn publish_i32(&self, id: ParamId, value: i32) {
        println!("  {} = {value}", self.name_of(id));
    }

    fn publish_f64(&self, id: ParamId, value: f64) {
        println!("  {} = {value}", self.name_of(id));
    }

    fn publish_str(&self, id: ParamId, value: &str) {
        println!("  {} = {value}", self.name_of(id));
    }

    fn flush(&self) {}
}

impl ConsoleBus {
    fn name_of(&self, id: ParamId) -> &'static str {
        self.names
            .lock()
            .expect("bus mutex poisoned")
            .get(&id)
            .copied()
            .unwrap_or("<unregistered>")
    }
}

/// Drops every submitted buffer on the floor after logging its shape —
/// a stand-in for the array-distribution collaborator (spec §6.3, out of
/// scope for this core). Honours `allowing_data` the way spec §6.3 asks any
/// real `ChannelsPort` to: a submission arriving after the window closed is
/// dropped silently instead of printed.
struct DiscardingChannels {
    allowing_data: AllowingData,
}

impl ChannelsPort for DiscardingChannels {
    fn allocate(&self, num_samples: usize, dtype: SampleDtype) -> BufferHandle {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let handle = BufferHandle(NEXT.fetch_add(1, Ordering::Relaxed));
        println!("    allocate {num_samples} samples ({dtype:?}) -> {handle:?}");
        handle
    }

    fn submit(
        &self,
        handle: BufferHandle,
        channel: usize,
        unique_id: u64,
        t_burst: f64,
        wall_clock_ts: f64,
        on_complete: Option<CompletionCallback>,
    ) {
        if !self.allowing_data.get() {
            return;
        }
        println!("    submit {handle:?} channel={channel} unique_id={unique_id} t_burst={t_burst:.6} wall={wall_clock_ts:.3}");
        if let Some(cb) = on_complete {
            let mut meta = trc_core::channels::SubmitMeta {
                channel,
                unique_id,
                t_burst,
                wall_clock_ts,
                deliver: true,
            };
            cb(&mut meta);
        }
    }
}

/// A digitizer that never touches real hardware: `start_acquisition` and
/// `read_burst` return immediately, `process_burst_data` manufactures one
/// flat buffer per channel.
struct SimulatedAdapter {
    num_channels: usize,
    burst_counter: AtomicI64,
}

impl SimulatedAdapter {
    fn new(num_channels: usize) -> Self {
        SimulatedAdapter {
            num_channels,
            burst_counter: AtomicI64::new(0),
        }
    }
}

impl DigitizerAdapter for SimulatedAdapter {
    fn supports_pre_samples(&self) -> bool {
        true
    }

    fn num_channels(&self) -> usize {
        self.num_channels
    }

    fn make_channels_port(&self, allowing_data: AllowingData) -> Arc<dyn ChannelsPort> {
        Arc::new(DiscardingChannels { allowing_data })
    }

    fn wait_for_preconditions(&self, _ctx: &mut HeldCtx<'_>) -> bool {
        // A real adapter would wait on e.g. a PLL-locked status here.
        true
    }

    fn check_settings(&self, _ctx: &mut HeldCtx<'_>, arm_info: &mut ArmInfo) -> bool {
        arm_info.rate_for_display = 1_000_000.0;
        true
    }

    fn start_acquisition(&self, overflow: bool) -> bool {
        println!("  start_acquisition(overflow={overflow})");
        true
    }

    fn read_burst(&self, _ctx: &UnlockedCtx<'_>) -> bool {
        // A real adapter blocks here on a trigger or a hardware FIFO. This
        // one manufactures triggers on demand.
        std::thread::sleep(Duration::from_millis(5));
        true
    }

    fn check_overflow(&self, _ctx: &UnlockedCtx<'_>) -> Option<OverflowStatus> {
        Some(OverflowStatus::default())
    }

    fn process_burst_data(&self, ctx: &UnlockedCtx<'_>) -> bool {
        let id = self.burst_counter.fetch_add(1, Ordering::Relaxed) as i32;
        for channel in 0..self.num_channels {
            let handle = ctx.channels().allocate(64, SampleDtype::F32);
            ctx.channels()
                .submit(handle, channel, id as u64, id as f64 * 1e-3, id as f64, None);
        }
        ctx.publish_burst_meta(BurstMeta {
            burst_id: id,
            t_burst: id as f64 * 1e-3,
            t_read: id as f64 * 1e-3 + 1e-4,
            t_process: id as f64 * 1e-3 + 2e-4,
        });
        true
    }

    fn stop_acquisition(&self) {
        println!("  stop_acquisition");
    }

    fn on_disarmed(&self, _ctx: &mut HeldCtx<'_>) {
        println!("  on_disarmed");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("TRC_LOG")
                .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let bus: Arc<dyn ParamBus> = Arc::new(ConsoleBus::default());
    let adapter: Arc<dyn DigitizerAdapter> = Arc::new(SimulatedAdapter::new(2));

    let config = ArmControllerConfig {
        digitizer_name: "sim-digitizer",
        num_bursts: args.num_bursts,
        num_post_samples: args.num_post_samples,
        num_pre_post_samples: args.num_pre_samples + args.num_post_samples,
        requested_sample_rate: args.rate,
        sleep_after_burst: 0.0,
    };

    let controller = ArmController::new(bus, adapter, config).unwrap_or_else(|e| {
        eprintln!("fatal: failed to construct ArmController: {e}");
        std::process::exit(1);
    });

    println!("arming ({})...", if args.pre_post { "pre+post" } else { "post-only" });
    controller
        .write_arm_request(if args.pre_post { 2 } else { 1 })
        .expect("valid arm request");

    while controller.is_armed() {
        std::thread::sleep(Duration::from_millis(20));
    }

    println!("final state: {:?}", controller.arm_state());
}
