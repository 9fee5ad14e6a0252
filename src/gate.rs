//! Rolling-window admission gate.
//!
//! Every submission passes through [`RateGate::acquire`] first. The gate admits at most
//! `max_admissions` callers inside any trailing `window`; anyone past the limit suspends until
//! the oldest admission ages out.
//!
//! Semantics:
//! - The capacity check and the recording of the admission happen under one lock, so two
//!   callers can never both take the last free slot.
//! - Each successful admission broadcasts a wake to all suspended callers; every woken caller
//!   re-checks before it records anything.
//! - A suspended caller also wakes on its own when the oldest record ages out, so a full gate
//!   drains even if no new caller ever arrives.
//! - The lock covers only prune + count + record, never the downstream call.
//! - Telemetry is emitted on spawned tasks. Nothing is awaited between recording an admission
//!   and handing it to the caller, so dropping an `acquire` future never leaks a slot.
//! - Wake order is unspecified; callers are not served strictly FIFO.
//!
//! Cancellation:
//! - [`RateGate::acquire_until`] and [`RateGate::acquire_timeout`] let a caller stop waiting.
//!   An abandoned waiter records nothing and leaves other waiters untouched.
//!
//! Example
//! ```rust
//! use docgate::RateGate;
//! use std::time::Duration;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let gate = RateGate::new(Duration::from_secs(60), 8).unwrap();
//! let admission = gate.acquire().await;
//! assert_eq!(admission.in_window, 1);
//! // ...submit exactly one document here, outside the gate...
//! # });
//! ```

use crate::config::{ConfigError, GateConfig};
use crate::error::AdmissionError;
use crate::telemetry::{emit_detached, GateEvent, NullSink};
use crate::window::WindowTracker;
use std::convert::Infallible;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tower_service::Service;

// Upper bound on the tracker's up-front allocation; larger limits grow on demand.
const PREALLOCATED_RECORDS: usize = 1024;

/// Receipt for one admission through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Timestamp recorded in the window.
    pub admitted_at: Instant,
    /// Time spent suspended before admission.
    pub waited: Duration,
    /// Admissions inside the window right after this one, itself included.
    pub in_window: usize,
}

#[derive(Debug)]
struct Shared {
    config: GateConfig,
    tracker: Mutex<WindowTracker>,
    notify: Notify,
}

enum Check {
    Admitted { at: Instant, in_window: usize },
    Full { in_window: usize, retry_at: Instant },
}

/// Shared, in-process admission gate.
///
/// Clones share the same window, so every handle counts against the same limit.
#[derive(Clone)]
pub struct RateGate<K = NullSink> {
    shared: Arc<Shared>,
    sink: K,
}

impl<K> std::fmt::Debug for RateGate<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGate")
            .field("window", &self.shared.config.window())
            .field("max_admissions", &self.shared.config.max_admissions())
            .field("sink", &"<sink>")
            .finish()
    }
}

impl RateGate<NullSink> {
    /// Create a gate admitting `max_admissions` per rolling `window`.
    ///
    /// Fails if either value is zero.
    pub fn new(window: Duration, max_admissions: usize) -> Result<Self, ConfigError> {
        GateConfig::new(window, max_admissions).map(Self::from_config)
    }

    /// Create a gate from an already validated config.
    pub fn from_config(config: GateConfig) -> Self {
        let tracker = WindowTracker::with_capacity(
            config.window(),
            config.max_admissions().min(PREALLOCATED_RECORDS),
        );
        Self {
            shared: Arc::new(Shared { config, tracker: Mutex::new(tracker), notify: Notify::new() }),
            sink: NullSink,
        }
    }
}

impl<K> RateGate<K> {
    /// Attach a telemetry sink. The returned gate shares this gate's window.
    pub fn with_sink<K2>(self, sink: K2) -> RateGate<K2> {
        RateGate { shared: self.shared, sink }
    }

    pub(crate) fn sink(&self) -> &K {
        &self.sink
    }

    /// Configuration fixed at construction.
    pub fn config(&self) -> GateConfig {
        self.shared.config
    }

    /// Admissions inside the window as of now.
    pub fn in_window(&self) -> usize {
        let mut tracker = self.tracker();
        tracker.prune(Instant::now());
        tracker.count()
    }

    /// Slots free as of now. Another caller may take them before you do.
    pub fn available(&self) -> usize {
        self.shared.config.max_admissions().saturating_sub(self.in_window())
    }

    /// Single non-blocking check-and-record.
    ///
    /// Emits no telemetry; use the async methods when events matter.
    pub fn try_acquire(&self) -> Option<Admission> {
        match self.check() {
            Check::Admitted { at, in_window } => {
                self.shared.notify.notify_waiters();
                tracing::trace!(in_window, "admitted without waiting");
                Some(Admission { admitted_at: at, waited: Duration::ZERO, in_window })
            }
            Check::Full { .. } => None,
        }
    }

    // The tracker has no invariant a panicking holder could break, so poison is ignored.
    fn tracker(&self) -> MutexGuard<'_, WindowTracker> {
        self.shared.tracker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self) -> Check {
        let max = self.shared.config.max_admissions();
        let mut tracker = self.tracker();
        let now = Instant::now();
        tracker.prune(now);
        let count = tracker.count();
        if count < max {
            tracker.record(now);
            Check::Admitted { at: now, in_window: count + 1 }
        } else {
            // count >= max > 0, so the front record exists
            let retry_at = tracker.next_expiry().unwrap_or(now);
            Check::Full { in_window: count, retry_at }
        }
    }
}

impl<K> RateGate<K>
where
    K: Service<GateEvent, Response = ()> + Clone + Send + Sync + 'static,
    K::Error: std::error::Error + Send + 'static,
    K::Future: Send + 'static,
{
    /// Wait for a slot and record an admission.
    ///
    /// Never fails; it returns once capacity frees, which takes at most one window after the
    /// caller reaches the front of the contention.
    pub async fn acquire(&self) -> Admission {
        match self.admit(Instant::now(), std::future::pending::<Infallible>()).await {
            Ok(admission) => admission,
            Err(never) => match never {},
        }
    }

    /// Like [`acquire`](Self::acquire), but give up once `cancel` resolves.
    ///
    /// A cancelled caller records nothing.
    pub async fn acquire_until<F>(&self, cancel: F) -> Result<Admission, AdmissionError>
    where
        F: Future,
    {
        let started = Instant::now();
        let cancelled = async move {
            cancel.await;
            AdmissionError::Cancelled { waited: started.elapsed() }
        };
        match self.admit(started, cancelled).await {
            Ok(admission) => Ok(admission),
            Err(e) => Err(self.abandoned(e)),
        }
    }

    /// Like [`acquire`](Self::acquire), but give up after `timeout`.
    ///
    /// A zero timeout still gets one capacity check.
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<Admission, AdmissionError> {
        let started = Instant::now();
        let Some(deadline) = started.checked_add(timeout) else {
            return Ok(self.acquire().await);
        };
        let expired = async move {
            tokio::time::sleep_until(deadline).await;
            AdmissionError::TimedOut { waited: started.elapsed(), timeout }
        };
        match self.admit(started, expired).await {
            Ok(admission) => Ok(admission),
            Err(e) => Err(self.abandoned(e)),
        }
    }

    async fn admit<C, E>(&self, started: Instant, cancel: C) -> Result<Admission, E>
    where
        C: Future<Output = E>,
    {
        tokio::pin!(cancel);
        loop {
            // Register for the broadcast before checking so a wake sent between the check
            // and the await below is not lost.
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.check() {
                Check::Admitted { at, in_window } => {
                    self.shared.notify.notify_waiters();
                    let waited = at.saturating_duration_since(started);
                    tracing::trace!(in_window, ?waited, "admitted");
                    // Nothing may be awaited between recording and returning, or a dropped
                    // caller would hold a slot it never received.
                    emit_detached(self.sink.clone(), GateEvent::Admitted { in_window, waited });
                    return Ok(Admission { admitted_at: at, waited, in_window });
                }
                Check::Full { in_window, retry_at } => {
                    let retry_in = retry_at.saturating_duration_since(Instant::now());
                    tracing::debug!(
                        in_window,
                        max = self.shared.config.max_admissions(),
                        ?retry_in,
                        "window full; waiting"
                    );
                    emit_detached(self.sink.clone(), GateEvent::Waiting { in_window, retry_in });

                    tokio::select! {
                        biased;
                        err = &mut cancel => return Err(err),
                        _ = &mut notified => {}
                        _ = tokio::time::sleep_until(retry_at) => {}
                    }
                }
            }
        }
    }

    fn abandoned(&self, err: AdmissionError) -> AdmissionError {
        let timed_out = matches!(err, AdmissionError::TimedOut { .. });
        tracing::debug!(waited = ?err.waited(), timed_out, "gave up waiting for admission");
        emit_detached(self.sink.clone(), GateEvent::Abandoned { waited: err.waited(), timed_out });
        err
    }
}
