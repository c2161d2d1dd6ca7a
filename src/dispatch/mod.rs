//! Dispatch loop and latency bookkeeping
//!
//! The [`Dispatcher`] is a typestate machine:
//!
//! ```text
//! Init ──start()──► Running ──run()──► Draining ──drain()──► Stopped
//!                     │ tick()                               (report)
//!                     └─ pull ─► normalize ─► encode ─► send ─► record
//! ```
//!
//! Only `Running` can record latencies, so the summary built while draining is
//! final.

pub mod dispatcher;
pub mod latency;

pub use dispatcher::{
    run_dispatcher, DispatchError, DispatchSettings, DispatchState, Dispatcher, ShutdownReason,
    TickOutcome,
};
pub use latency::{CategorySummary, LatencyAggregator, LatencyReport};
