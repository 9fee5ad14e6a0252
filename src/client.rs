//! Rate-limited document submission.
//!
//! [`DocumentClient`] is the gate and a [`SubmissionSender`] wired together in the required
//! order: serialize, acquire admission, then submit exactly once outside the gate's lock.
//!
//! Errors are never swallowed. Admission failures surface as [`GateError::NotAdmitted`] and
//! sender failures as [`GateError::Inner`], so callers can always tell whether a document
//! left the process.

use crate::document::Document;
use crate::error::GateError;
use crate::gate::RateGate;
use crate::sender::{SendError, SubmissionSender};
use crate::telemetry::{emit_detached, GateEvent, NullSink, SubmissionOutcome};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tower_service::Service;

/// Submits documents through a shared [`RateGate`].
#[derive(Clone, Debug)]
pub struct DocumentClient<S, K = NullSink> {
    gate: RateGate<K>,
    sender: S,
}

impl<S, K> DocumentClient<S, K> {
    /// Pair `gate` with `sender`. Telemetry goes to the gate's sink.
    pub fn new(gate: RateGate<K>, sender: S) -> Self {
        Self { gate, sender }
    }

    /// The gate every submission passes through.
    pub fn gate(&self) -> &RateGate<K> {
        &self.gate
    }

    /// The downstream sender.
    pub fn sender(&self) -> &S {
        &self.sender
    }
}

impl<S, K> DocumentClient<S, K>
where
    S: SubmissionSender,
    K: Service<GateEvent, Response = ()> + Clone + Send + Sync + 'static,
    K::Error: std::error::Error + Send + 'static,
    K::Future: Send + 'static,
{
    /// Create `document`, waiting as long as it takes for admission.
    ///
    /// A document that fails to serialize is rejected with
    /// `GateError::Inner(SendError::Serialize)` before it consumes a slot; the sender is not
    /// called and no submission outcome is emitted.
    pub async fn create_document(
        &self,
        document: &Document,
        signature: &str,
    ) -> Result<String, GateError<SendError>> {
        let payload = serialize(document)?;
        self.gate.acquire().await;
        self.send(payload, signature).await
    }

    /// Like [`create_document`](Self::create_document), but give up waiting after `timeout`.
    pub async fn create_document_timeout(
        &self,
        document: &Document,
        signature: &str,
        timeout: Duration,
    ) -> Result<String, GateError<SendError>> {
        let payload = serialize(document)?;
        self.gate.acquire_timeout(timeout).await?;
        self.send(payload, signature).await
    }

    /// Like [`create_document`](Self::create_document), but give up waiting when `cancel`
    /// resolves.
    pub async fn create_document_until<F>(
        &self,
        document: &Document,
        signature: &str,
        cancel: F,
    ) -> Result<String, GateError<SendError>>
    where
        F: Future,
    {
        let payload = serialize(document)?;
        self.gate.acquire_until(cancel).await?;
        self.send(payload, signature).await
    }

    /// Submit a payload that is already serialized.
    pub async fn submit_raw(
        &self,
        payload: String,
        signature: &str,
    ) -> Result<String, GateError<SendError>> {
        self.gate.acquire().await;
        self.send(payload, signature).await
    }

    async fn send(&self, payload: String, signature: &str) -> Result<String, GateError<SendError>> {
        let started = Instant::now();
        let result = self.sender.submit(payload, signature).await;
        let duration = started.elapsed();

        let outcome = match &result {
            Ok(_) => SubmissionOutcome::Success { duration },
            Err(e) => {
                tracing::warn!(error = %e, ?duration, "document submission failed");
                SubmissionOutcome::Failure { duration }
            }
        };
        emit_detached(self.gate.sink().clone(), GateEvent::Submission(outcome));

        result.map_err(GateError::Inner)
    }
}

// Runs before admission; a failure here never reaches the sender or the sink.
fn serialize(document: &Document) -> Result<String, GateError<SendError>> {
    document.to_json().map_err(serialize_failed)
}

fn serialize_failed(err: serde_json::Error) -> GateError<SendError> {
    tracing::debug!(error = %err, "document rejected before admission");
    GateError::Inner(SendError::Serialize(err))
}
