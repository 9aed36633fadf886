//! `trc-core`: the arming-sequence controller framework for
//! transient-recorder (waveform digitizer) hardware.
//!
//! This crate owns the hardest part of a transient-recorder integration —
//! the single-threaded state machine that drives a digitizer through
//! wait-for-preconditions -> validate -> start -> read-loop -> stop — and
//! stays agnostic of the parameter bus, the downstream array distribution,
//! and the hardware itself. An integrator plugs in:
//!
//! - a [`bus::ParamBus`] (the control-system parameter wrapping),
//! - an [`adapter::DigitizerAdapter`] (the hardware-specific callbacks),
//! - a [`channels::ChannelsPort`] (per-channel sample delivery), produced
//!   by the adapter.
//!
//! [`controller::ArmController`] is the entry point: construct one with a
//! bus, an adapter, and an [`controller::ArmControllerConfig`], then route
//! external parameter writes to its `write_*` methods.
//!
//! See `demos/sim_digitizer.rs` for a runnable end-to-end example against
//! an in-process simulated digitizer.

pub mod adapter;
pub mod burst;
pub mod bus;
pub mod channels;
pub mod controller;
pub mod error;
pub mod logging;
pub mod param;
mod testing;
pub mod time_axis;

pub use controller::{ArmController, ArmControllerConfig, ArmState};
