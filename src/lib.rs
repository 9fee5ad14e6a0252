#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # docgate
//!
//! Rolling-window admission control for a rate-limited document-submission endpoint.
//!
//! ## Features
//!
//! - **Rate gate**: at most `max_admissions` submissions in any trailing window; callers past
//!   the limit suspend instead of being rejected
//! - **Rolling window**: admissions age out one by one, no fixed-bucket resets
//! - **Cancellation** by deadline or by any future, with no slot consumed
//! - **Document client** that serializes, acquires, then submits exactly once
//! - **Tower layer** for gating arbitrary services
//! - **Telemetry** events through composable `tower::Service` sinks
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docgate::{DocumentClient, Document, HttpSender, RateGate, SenderConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gate = RateGate::new(Duration::from_secs(60), 8)?;
//!     let sender = HttpSender::new(SenderConfig::from_env())?;
//!     let client = DocumentClient::new(gate, sender);
//!
//!     let body = client.create_document(&Document::default(), "signature").await?;
//!     println!("{}", body);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod gate;
pub mod middleware;
pub mod prelude;
pub mod sender;
pub mod telemetry;
pub mod window;

// Re-exports
pub use client::DocumentClient;
pub use config::{ConfigError, GateConfig, GateConfigBuilder, SenderConfig};
pub use document::{Description, Document, Product};
pub use error::{AdmissionError, GateError};
pub use gate::{Admission, RateGate};
pub use middleware::{RateGateLayer, RateGateService};
pub use sender::{HttpSender, SendError, SubmissionSender};
pub use window::WindowTracker;
