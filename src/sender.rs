//! The downstream submission call.
//!
//! [`SubmissionSender`] is the seam between admission control and I/O: the gate decides
//! *when* a submission may happen, a sender decides *how*. [`HttpSender`] is the production
//! implementation, a single JSON POST per call with no retries.

use crate::config::SenderConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use std::sync::Arc;

/// Header carrying the detached document signature.
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Failures on the submission path, after admission.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The document could not be turned into a request body.
    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The signature cannot be sent as an HTTP header value.
    #[error("signature is not a valid header value")]
    InvalidSignature,
    /// Connection, TLS, timeout, or body read failure.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    /// The endpoint answered with a non-2xx status.
    #[error("unexpected response status: {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },
}

impl SendError {
    /// HTTP status for `Status` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Performs one submission of an already serialized document.
///
/// Implementations must not retry on their own; each call is one admitted submission.
#[async_trait]
pub trait SubmissionSender: Send + Sync {
    /// Send `payload` with `signature`; returns the response body on success.
    async fn submit(&self, payload: String, signature: &str) -> Result<String, SendError>;
}

#[async_trait]
impl<T> SubmissionSender for Arc<T>
where
    T: SubmissionSender + ?Sized,
{
    async fn submit(&self, payload: String, signature: &str) -> Result<String, SendError> {
        (**self).submit(payload, signature).await
    }
}

/// JSON-over-HTTP sender backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpSender {
    client: reqwest::Client,
    config: SenderConfig,
}

impl HttpSender {
    /// Build a client from `config`.
    pub fn new(config: SenderConfig) -> Result<Self, SendError> {
        let mut builder = reqwest::Client::builder().timeout(config.timeout);
        if let Some(ua) = &config.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        let client = builder.build().map_err(SendError::Transport)?;
        Ok(Self { client, config })
    }

    /// Reuse an existing client. `config.timeout` and `user_agent` are ignored.
    pub fn with_client(client: reqwest::Client, config: SenderConfig) -> Self {
        Self { client, config }
    }

    /// Target URL.
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl SubmissionSender for HttpSender {
    async fn submit(&self, payload: String, signature: &str) -> Result<String, SendError> {
        let signature = HeaderValue::from_str(signature).map_err(|_| SendError::InvalidSignature)?;

        let response = self
            .client
            .post(&self.config.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(payload)
            .send()
            .await
            .map_err(SendError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(SendError::Transport)?;
        tracing::debug!(status = status.as_u16(), endpoint = %self.config.endpoint, "submission response");

        if status.is_success() {
            Ok(body)
        } else {
            Err(SendError::Status { status: status.as_u16(), body })
        }
    }
}
