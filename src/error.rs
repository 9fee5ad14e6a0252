//! Error types for admission and gated operations
use std::fmt;
use std::time::Duration;

/// Why a caller left the gate without an admission.
///
/// No admission is recorded in either case, so the caller must not submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    /// The caller's cancellation signal fired while it was waiting.
    #[error("admission cancelled after waiting {waited:?}")]
    Cancelled { waited: Duration },
    /// The caller's deadline passed before capacity freed up.
    #[error("admission timed out after {waited:?} (limit: {timeout:?})")]
    TimedOut { waited: Duration, timeout: Duration },
}

impl AdmissionError {
    /// Time spent waiting before giving up.
    pub fn waited(&self) -> Duration {
        match self {
            Self::Cancelled { waited } | Self::TimedOut { waited, .. } => *waited,
        }
    }
}

/// Error for an operation run behind the gate.
///
/// Keeps "never admitted" apart from "the operation failed".
#[derive(Debug, Clone)]
pub enum GateError<E> {
    /// The caller gave up waiting; the downstream operation never ran
    NotAdmitted(AdmissionError),
    /// The operation itself failed.
    ///
    /// Usually the downstream call ran and failed after admission. `DocumentClient` also uses
    /// it for a document that cannot be serialized; that check runs before admission, so no
    /// slot is taken and nothing is sent.
    Inner(E),
}
impl<E: fmt::Display> fmt::Display for GateError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAdmitted(e) => write!(f, "not admitted: {}", e),
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}
impl<E: std::error::Error + 'static> std::error::Error for GateError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotAdmitted(e) => Some(e),
            Self::Inner(e) => Some(e),
        }
    }
}
impl<E> From<AdmissionError> for GateError<E> {
    fn from(e: AdmissionError) -> Self {
        Self::NotAdmitted(e)
    }
}
impl<E> GateError<E> {
    /// Check if the caller was never admitted
    pub fn is_not_admitted(&self) -> bool {
        matches!(self, Self::NotAdmitted(_))
    }
    /// Check if admission was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::NotAdmitted(AdmissionError::Cancelled { .. }))
    }
    /// Check if admission timed out
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::NotAdmitted(AdmissionError::TimedOut { .. }))
    }
    /// Check if this error wraps a downstream error.
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }
    /// Get the inner error if this is an Inner variant
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
    /// Borrow the inner error if present.
    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
    /// Access the admission failure if present.
    pub fn admission_error(&self) -> Option<&AdmissionError> {
        match self {
            Self::NotAdmitted(e) => Some(e),
            _ => None,
        }
    }
    /// Map the inner error, leaving admission failures untouched.
    pub fn map_inner<F, E2>(self, f: F) -> GateError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Self::NotAdmitted(e) => GateError::NotAdmitted(e),
            Self::Inner(e) => GateError::Inner(f(e)),
        }
    }
}
