//! Small concurrency primitives shared by `trc-core`.
//!
//! Kept in its own crate, dependency-free, the same way the rest of this
//! family keeps generic sync helpers out of the domain-specific core.

mod cancel;
mod worker_queue;

pub use cancel::CancelToken;
pub use worker_queue::{Task, WorkerQueue};
