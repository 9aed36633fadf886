//! Error kinds surfaced by the core (spec §7).
//!
//! No error type ever crosses the adapter boundary: adapter callbacks
//! return plain `bool`/structured status values, and the adapter is
//! expected to log its own detail. These types are for the controller's
//! own fallible operations and for the external parameter-bus handlers.

use thiserror::Error;

use crate::param::ParamId;

/// Raised during [`crate::controller::ArmController::new`] (spec §7 "Fatal
/// init failure"): a base param and an adapter-supplied param (or two
/// adapter-supplied params) were registered under the same name, which
/// would silently double up a bus record. Per spec §7 this is
/// non-recoverable — the process has no other way to express it and must
/// terminate rather than continue with an ambiguous parameter surface.
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("parameter {0:?} was already initialised under a name already in use")]
    AlreadyInitialised(ParamId),
}

/// Errors surfaced by [`crate::param::ProtectedParamGate`].
#[derive(Debug, Error)]
pub enum GateError {
    /// The write targeted a parameter the gate protects.
    #[error("write to {0:?} rejected: parameter is read-only")]
    Protected(ParamId),
}

/// Errors surfaced while handling a write to `ARM_REQUEST`.
#[derive(Debug, Error)]
pub enum ArmRequestError {
    /// The writer supplied a value other than Disarm/PostTrigger/PrePostTrigger.
    #[error("{0} is not a writable ARM_REQUEST value (only Disarm/PostTrigger/PrePostTrigger are)")]
    InvalidValue(i32),
}

/// The stage an arming attempt failed at, driving the controller into
/// `ArmState::Error` (spec §7 "Propagation").
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ArmError {
    #[error("wait_for_preconditions returned false")]
    Precondition,

    #[error("basic settings validation failed: {0}")]
    BasicSettings(&'static str),

    #[error("check_settings returned false, or rate_for_display was non-finite")]
    Settings,

    #[error("start_acquisition returned false")]
    StartAcquisition,

    #[error("read_burst returned false")]
    ReadBurst,

    #[error("check_overflow returned false, or reported num_buffer_bursts <= 0")]
    Overflow,

    #[error("process_burst_data returned false")]
    ProcessBurst,

    #[error("PrePostTrigger requested but the adapter does not support pre-trigger samples")]
    PrePostUnsupported,
}
