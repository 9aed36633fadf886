//! The acquisition thread: arming sequence, burst read loop, overflow
//! recovery, and the shared cleanup path (spec §4.4–§4.6).

use std::sync::Arc;

use crate::adapter::ArmInfo;
use crate::error::ArmError;
use crate::param::Scalar;

use super::bookkeeping::PendingRearm;
use super::ctx::{HeldCtx, UnlockedCtx};
use super::state::ArmState;
use super::Inner;

enum AttemptOutcome {
    Clean,
    Error(ArmError),
}

/// Runs forever until the controller is dropped. Blocks on `start_arming`
/// between armings.
pub(crate) fn acquisition_thread(inner: Arc<Inner>) {
    loop {
        inner.start_arming.wait();
        inner.start_arming.reset();

        if inner.shutdown.is_signalled() {
            return;
        }

        let requested = {
            let mut bk = inner.bookkeeping.lock().expect("port lock poisoned");
            match bk.pending_rearm {
                PendingRearm::Arm(state) => {
                    bk.pending_rearm = PendingRearm::None;
                    state
                }
                _ => continue,
            }
        };

        run_sequence(&inner, requested);
    }
}

/// Called by the `ARM_REQUEST` write handler on a disarmed→arm transition
/// (spec §4.3, §4.4): makes the transition visible immediately and wakes
/// the acquisition thread.
pub(crate) fn start_arming(inner: &Inner, ctx: &mut HeldCtx<'_>, requested: ArmState) {
    {
        let bk = ctx.bookkeeping_mut();
        bk.pending_rearm = PendingRearm::Arm(requested);
        bk.state = ArmState::Busy;
    }
    publish_arm_state(inner, ctx.bookkeeping());
    inner.start_arming.signal();
}

/// Spec §4.6: observed while non-`Disarm`, from either an external
/// `ARM_REQUEST` write or `request_disarm_from_driver`.
pub(crate) fn handle_disarm_request(inner: &Inner, ctx: &mut HeldCtx<'_>, target: PendingRearm) {
    if ctx.bookkeeping().state == ArmState::Disarm {
        return;
    }

    let first_request = !ctx.bookkeeping().flags.disarm_requested;
    if first_request {
        let was_in_read_loop = ctx.bookkeeping().flags.in_read_loop;
        {
            let bk = ctx.bookkeeping_mut();
            bk.flags.disarm_requested = true;
            bk.set_allowing_data(false);
            bk.state = ArmState::Busy;
        }
        publish_arm_state(inner, ctx.bookkeeping());
        inner.disarm_requested_event.signal();

        if was_in_read_loop {
            inner.adapter.interrupt_reading(ctx);
            ctx.bookkeeping_mut().flags.interrupt_reading_called = true;
        }
    }

    ctx.bookkeeping_mut().pending_rearm = target;
}

fn publish_arm_state(inner: &Inner, bk: &super::Bookkeeping) {
    inner.bus.publish_i32(bk.plain.arm_state, bk.state.into());
    inner.bus.flush();
}

/// Loops across pending re-arms (spec §4.4 cleanup: "if a pending re-arm
/// was recorded, loop back to step 1") until the controller lands back in
/// `Disarm`.
fn run_sequence(inner: &Arc<Inner>, mut requested: ArmState) {
    loop {
        let outcome = run_one_arming(inner, requested);
        requested = match cleanup(inner, outcome) {
            Some(next) => next,
            None => return,
        };
    }
}

/// Runs the shared cleanup path (spec §4.4 "Cleanup path"). Returns
/// `Some(next_requested_state)` if a pending re-arm should start
/// immediately, `None` once the controller has settled in `Disarm`.
fn cleanup(inner: &Arc<Inner>, outcome: AttemptOutcome) -> Option<ArmState> {
    let mut guard = inner.bookkeeping.lock().expect("port lock poisoned");
    guard.flags.in_read_loop = false;

    if let AttemptOutcome::Error(stage) = outcome {
        inner.log.log(
            crate::logging::Level::Error,
            "arming",
            &format!("arming failed: {stage}"),
        );
        if !guard.flags.disarm_requested {
            guard.state = ArmState::Error;
            // spec §4.2: is_armed() goes false "until stop_acquisition has
            // returned, or until an early-stage error is observed" — if
            // start_acquisition was never even attempted, this latch into
            // Error *is* that early-stage error, and is_armed() must not
            // stay true for the entire sticky-Error wait below.
            if !guard.flags.start_acquisition_attempted {
                guard.flags.armed = false;
            }
            publish_arm_state(inner, &guard);
            drop(guard);
            inner.disarm_requested_event.wait();
            guard = inner.bookkeeping.lock().expect("port lock poisoned");
        }
    }

    guard.set_allowing_data(false);

    if guard.flags.start_acquisition_attempted {
        drop(guard);
        inner.adapter.stop_acquisition();
        guard = inner.bookkeeping.lock().expect("port lock poisoned");
    }

    guard.registry.push_effective_invalid_all();
    publish_all_effective(inner, &guard);
    inner.bus.flush();
    guard.flags.disarm_requested = false;
    guard.flags.start_acquisition_attempted = false;
    guard.flags.interrupt_reading_called = false;
    guard.flags.armed = false;
    inner.disarm_requested_event.reset();

    let pending = guard.pending_rearm;
    guard.pending_rearm = PendingRearm::None;

    match pending {
        PendingRearm::Arm(state) => Some(state),
        _ => {
            guard.state = ArmState::Disarm;
            let mut ctx = HeldCtx::new(inner, guard);
            inner.adapter.on_disarmed(&mut ctx);
            let guard = ctx.into_guard();
            publish_arm_state(inner, &guard);
            None
        }
    }
}

/// Spec §4.4 steps 1–6 plus the outer acquire/read loop. Runs to
/// completion (clean stop, interrupted-disarm stop, or the first error)
/// and always returns with the port lock released.
fn run_one_arming(inner: &Arc<Inner>, requested: ArmState) -> AttemptOutcome {
    let guard = inner.bookkeeping.lock().expect("port lock poisoned");
    let mut ctx = HeldCtx::new(inner, guard);

    if !inner.adapter.wait_for_preconditions(&mut ctx) {
        ctx.into_guard();
        return AttemptOutcome::Error(ArmError::Precondition);
    }

    ctx.bookkeeping_mut().flags.armed = true;
    ctx.bookkeeping_mut().registry.capture_all();

    if let Err(e) = check_basic_settings(inner, &mut ctx, requested) {
        ctx.into_guard();
        return AttemptOutcome::Error(e);
    }

    let mut arm_info = ArmInfo::new();
    let settings_ok = inner.adapter.check_settings(&mut ctx, &mut arm_info);
    if !settings_ok || !arm_info.rate_for_display.is_finite() {
        ctx.into_guard();
        return AttemptOutcome::Error(ArmError::Settings);
    }

    apply_settled_arm_info(inner, &mut ctx, &arm_info);

    let mut guard = ctx.into_guard();
    let remaining_bursts_initial = {
        let base = guard.base;
        let n = base.num_bursts_snapshot(&guard.registry);
        if n == 0 {
            -1
        } else {
            n as i64
        }
    };
    let mut remaining_bursts = remaining_bursts_initial;
    let mut overflow = false;

    loop {
        if guard.flags.disarm_requested {
            drop(guard);
            return AttemptOutcome::Clean;
        }

        guard.set_allowing_data(true);
        drop(guard);

        let start_ok = inner.adapter.start_acquisition(overflow);

        guard = inner.bookkeeping.lock().expect("port lock poisoned");
        guard.flags.start_acquisition_attempted = true;

        if !start_ok {
            drop(guard);
            return AttemptOutcome::Error(ArmError::StartAcquisition);
        }

        if guard.flags.disarm_requested {
            drop(guard);
            return AttemptOutcome::Clean;
        }

        if !overflow {
            guard.state = requested;
            publish_arm_state(inner, &guard);
        }
        guard.flags.in_read_loop = true;
        drop(guard);

        let mut current_remaining = remaining_bursts;
        overflow = false;

        let unlocked = UnlockedCtx::new(inner);
        let outcome = run_burst_loop(
            inner,
            &unlocked,
            &mut current_remaining,
            &mut remaining_bursts,
            &mut overflow,
        );

        match outcome {
            BurstLoopOutcome::Clean => return AttemptOutcome::Clean,
            BurstLoopOutcome::Error(e) => return AttemptOutcome::Error(e),
            BurstLoopOutcome::RestartForOverflow => {
                let mut g = inner.bookkeeping.lock().expect("port lock poisoned");
                g.flags.in_read_loop = false;
                inner.log.log(
                    crate::logging::Level::Warn,
                    "arming",
                    "overflow detected, restarting acquisition",
                );
                guard = g;
                continue;
            }
        }
    }
}

fn check_basic_settings(
    inner: &Inner,
    ctx: &mut HeldCtx<'_>,
    requested: ArmState,
) -> Result<(), ArmError> {
    let bk = ctx.bookkeeping_mut();
    let base = bk.base;

    if base.num_bursts_snapshot(&bk.registry) < 0 {
        return Err(ArmError::BasicSettings("num_bursts snapshot is negative"));
    }
    if base.num_post_samples_snapshot(&bk.registry) <= 0 {
        return Err(ArmError::BasicSettings("num_post_samples snapshot is not positive"));
    }

    if requested == ArmState::PrePostTrigger {
        if !inner.adapter.supports_pre_samples() {
            return Err(ArmError::PrePostUnsupported);
        }
        let num_post = base.num_post_samples_snapshot(&bk.registry);
        let num_pre_post = base.num_pre_post_samples_snapshot(&bk.registry);
        if num_pre_post <= num_post {
            return Err(ArmError::BasicSettings(
                "num_pre_post_samples must exceed num_post_samples",
            ));
        }
    } else {
        bk.registry.get_mut(base.num_pre_post_samples).set_irrelevant();
        bk.registry
            .get_mut(base.num_pre_post_samples)
            .set_snapshot(Scalar::Int(0));
    }

    Ok(())
}

/// Publishes every registered `TypedParam`'s current effective value to the
/// bus (spec §8.1: effective values must be externally observable, not just
/// held in the registry).
pub(crate) fn publish_all_effective(inner: &Inner, bk: &super::Bookkeeping) {
    for p in bk.registry.iter() {
        match p.kind() {
            crate::param::ParamKind::IntInt => {
                inner.bus.publish_i32(p.effective_id(), p.get_effective().as_i32())
            }
            crate::param::ParamKind::IntReal | crate::param::ParamKind::RealReal => {
                inner.bus.publish_f64(p.effective_id(), p.get_effective().as_f64())
            }
        }
    }
}

fn apply_settled_arm_info(inner: &Inner, ctx: &mut HeldCtx<'_>, arm_info: &ArmInfo) {
    let bk = ctx.bookkeeping_mut();
    bk.rate_for_display = arm_info.rate_for_display;
    bk.registry.push_effective_from_snapshot_all();
    publish_all_effective(inner, bk);

    let base = bk.base;
    let num_pre = arm_info
        .custom_num_pre
        .unwrap_or_else(|| base.num_pre_post_samples_snapshot(&bk.registry) as i64);
    let num_post = arm_info
        .custom_num_post
        .unwrap_or_else(|| base.num_post_samples_snapshot(&bk.registry) as i64);

    inner
        .time_axis
        .configure(1.0 / arm_info.rate_for_display, num_pre, num_post);

    inner.bus.publish_f64(bk.plain.effective_sample_rate, arm_info.rate_for_display);
    inner.bus.publish_f64(bk.plain.time_array_unit_inv, arm_info.rate_for_display);
    inner.bus.flush();
}

enum BurstLoopOutcome {
    Clean,
    Error(ArmError),
    RestartForOverflow,
}

/// Spec §4.4 "Burst loop" plus "End-of-burst-loop disposition". Mutex is
/// not held across hardware calls; only re-taken for the brief disarm
/// re-check after each `read_burst`.
fn run_burst_loop(
    inner: &Arc<Inner>,
    unlocked: &UnlockedCtx<'_>,
    current_remaining: &mut i64,
    remaining_bursts: &mut i64,
    overflow: &mut bool,
) -> BurstLoopOutcome {
    loop {
        if !inner.adapter.read_burst(unlocked) {
            return BurstLoopOutcome::Error(ArmError::ReadBurst);
        }

        {
            let guard = inner.bookkeeping.lock().expect("port lock poisoned");
            if guard.flags.disarm_requested {
                return BurstLoopOutcome::Clean;
            }
        }

        if !*overflow {
            match inner.adapter.check_overflow(unlocked) {
                Some(status) if status.had_overflow => {
                    if status.num_buffer_bursts <= 0 {
                        return BurstLoopOutcome::Error(ArmError::Overflow);
                    }
                    *overflow = true;
                    *current_remaining = status.num_buffer_bursts;
                    inner.log.log(
                        crate::logging::Level::Warn,
                        "arming",
                        "hardware buffer overflow detected",
                    );
                }
                Some(_) => {}
                None => return BurstLoopOutcome::Error(ArmError::Overflow),
            }
        }

        if !inner.adapter.process_burst_data(unlocked) {
            return BurstLoopOutcome::Error(ArmError::ProcessBurst);
        }

        if *current_remaining > 0 {
            *current_remaining -= 1;
        }
        if *remaining_bursts > 0 {
            *remaining_bursts -= 1;
        }

        unlocked.maybe_sleep_for_testing();

        if *remaining_bursts == 0 {
            return BurstLoopOutcome::Clean;
        }
        if *current_remaining == 0 {
            if *overflow {
                return BurstLoopOutcome::RestartForOverflow;
            }
            // Unreachable per spec §4.4: current_remaining only diverges
            // from remaining_bursts via an overflow clamp.
        }
    }
}
