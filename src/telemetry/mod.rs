//! Telemetry for the admission gate.
//!
//! The gate and the document client emit [`GateEvent`]s describing what happened to each
//! caller. Events flow through `TelemetrySink` implementations, which are plain
//! `tower::Service<GateEvent>`s, so sinks compose like any other tower service.
//!
//! # Event Types
//!
//! - **Gate**: `Admitted`, `Waiting`, `Abandoned`
//! - **Client**: `Submission(Success | Failure)`
//!
//! Emission is best effort: a failing sink never blocks or fails an admission. The gate and the
//! client emit on spawned tasks, so a slow sink never holds up a caller.

pub mod events;
pub mod sinks;

pub use events::{GateEvent, SubmissionOutcome};
pub use sinks::{
    emit_best_effort, emit_detached, ComposedSinkError, LogSink, MemorySink, MulticastSink,
    NullSink, StreamingSink, TelemetrySink,
};
