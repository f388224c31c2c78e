//! Batch jobs over stock: the expiry sweep and its scheduled runner.
//!
//! ## Components
//!
//! - `ExpirySweep`: one pass that clears expired stock and reports what is about to expire
//! - `ExpirySweepRunner`: background thread running the sweep on a schedule or on demand
//! - `SweepReportSink`: where finished reports go

pub mod expiry_runner;
pub mod expiry_sweep;

pub use expiry_runner::{
    ExpirySweepRunner, ExpirySweepRunnerHandle, InMemorySweepReportSink, MAX_SWEEP_INTERVAL,
    SweepJob, SweepReportSink,
};
pub use expiry_sweep::{
    ClearedItem, ExpiringItem, ExpirySweep, SweepError, SweepFailure, SweepReport,
};
