use std::fmt;
use std::time::Duration;

#[cfg(feature = "telemetry-json")]
use serde_json::json;

/// Events emitted by the gate and the document client.
///
/// Events describe admission behavior after the fact; sinks can log, aggregate, or forward
/// them. Nothing a sink does feeds back into admission decisions.
#[derive(Debug, Clone, PartialEq)]
pub enum GateEvent {
    /// A caller was admitted and its timestamp recorded.
    Admitted {
        /// Admissions inside the window, this one included
        in_window: usize,
        /// Time spent suspended before admission
        waited: Duration,
    },
    /// A caller found the window full and is about to suspend.
    ///
    /// Emitted once per suspension, so a caller woken early and sent back to wait emits
    /// again.
    Waiting {
        /// Admissions inside the window at the time of the check
        in_window: usize,
        /// Time until the oldest admission ages out
        retry_in: Duration,
    },
    /// A waiting caller gave up without being admitted.
    Abandoned {
        /// Time spent waiting
        waited: Duration,
        /// `true` for a deadline, `false` for an external cancellation
        timed_out: bool,
    },
    /// Outcome of a downstream submission made after admission
    Submission(SubmissionOutcome),
}

/// Result of one submission call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The endpoint accepted the document.
    Success {
        /// Round-trip time of the call
        duration: Duration,
    },
    /// The sender returned an error after admission.
    ///
    /// Documents rejected before admission because they cannot be serialized emit nothing.
    Failure {
        /// Time spent before failure
        duration: Duration,
    },
}

impl fmt::Display for GateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateEvent::Admitted { in_window, waited } => {
                write!(f, "Admitted(in_window={}, waited={:?})", in_window, waited)
            }
            GateEvent::Waiting { in_window, retry_in } => {
                write!(f, "Waiting(in_window={}, retry_in={:?})", in_window, retry_in)
            }
            GateEvent::Abandoned { waited, timed_out } => {
                let cause = if *timed_out { "timeout" } else { "cancelled" };
                write!(f, "Abandoned({}, waited={:?})", cause, waited)
            }
            GateEvent::Submission(outcome) => write!(f, "Submission::{}", outcome),
        }
    }
}

impl fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionOutcome::Success { duration } => write!(f, "Success({:?})", duration),
            SubmissionOutcome::Failure { duration } => write!(f, "Failure({:?})", duration),
        }
    }
}

// Saturates instead of truncating the high bits of very long durations.
#[cfg(feature = "telemetry-json")]
fn millis(d: &Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl GateEvent {
    /// Flat JSON form with a `kind` discriminator and millisecond durations.
    #[cfg(feature = "telemetry-json")]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            GateEvent::Admitted { in_window, waited } => {
                json!({ "kind": "admitted", "in_window": in_window, "waited_ms": millis(waited) })
            }
            GateEvent::Waiting { in_window, retry_in } => {
                json!({ "kind": "waiting", "in_window": in_window, "retry_in_ms": millis(retry_in) })
            }
            GateEvent::Abandoned { waited, timed_out } => {
                json!({ "kind": "abandoned", "timed_out": timed_out, "waited_ms": millis(waited) })
            }
            GateEvent::Submission(SubmissionOutcome::Success { duration }) => {
                json!({ "kind": "submission_success", "duration_ms": millis(duration) })
            }
            GateEvent::Submission(SubmissionOutcome::Failure { duration }) => {
                json!({ "kind": "submission_failure", "duration_ms": millis(duration) })
            }
        }
    }
}
