//! Convenient re-exports for common docgate types.
pub use crate::{
    client::DocumentClient,
    config::{ConfigError, GateConfig, SenderConfig},
    document::{Description, Document, Product},
    error::{AdmissionError, GateError},
    gate::{Admission, RateGate},
    middleware::RateGateLayer,
    sender::{HttpSender, SendError, SubmissionSender},
    telemetry::{GateEvent, LogSink, MemorySink, NullSink, TelemetrySink},
};
