//! Construction-time configuration for the gate and the submission sender.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Production endpoint for document creation.
pub const DEFAULT_ENDPOINT: &str = "https://ismp.crpt.ru/api/v3/lk/documents/create";
/// Default per-request timeout for the HTTP sender.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors produced when validating gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `max_admissions` must be > 0.
    #[error("max_admissions must be > 0 (got {provided})")]
    InvalidMaxAdmissions {
        /// Value provided by caller.
        provided: usize,
    },
    /// Window must be non-zero and finite.
    #[error("window must be non-zero and finite (got {0:?})")]
    InvalidWindow(Duration),
}

/// Validated `(window, max_admissions)` pair.
///
/// Both values are fixed for the lifetime of any gate built from this config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGateConfig", into = "RawGateConfig")]
pub struct GateConfig {
    window: Duration,
    max_admissions: usize,
}

impl GateConfig {
    /// Create a config, rejecting a zero/infinite window or a zero admission limit.
    ///
    /// # Examples
    /// ```
    /// use docgate::GateConfig;
    /// use std::time::Duration;
    /// let cfg = GateConfig::new(Duration::from_secs(60), 8).unwrap();
    /// assert_eq!(cfg.max_admissions(), 8);
    /// assert!(GateConfig::new(Duration::ZERO, 8).is_err());
    /// ```
    pub fn new(window: Duration, max_admissions: usize) -> Result<Self, ConfigError> {
        let cfg = Self { window, max_admissions };
        cfg.validate()?;
        Ok(cfg)
    }

    /// `max_admissions` per rolling second.
    pub fn per_second(max_admissions: usize) -> Result<Self, ConfigError> {
        Self::new(Duration::from_secs(1), max_admissions)
    }

    /// `max_admissions` per rolling minute.
    pub fn per_minute(max_admissions: usize) -> Result<Self, ConfigError> {
        Self::new(Duration::from_secs(60), max_admissions)
    }

    /// Start a builder.
    pub fn builder() -> GateConfigBuilder {
        GateConfigBuilder::default()
    }

    /// Rolling window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Maximum admissions inside any one window.
    pub fn max_admissions(&self) -> usize {
        self.max_admissions
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_admissions == 0 {
            return Err(ConfigError::InvalidMaxAdmissions { provided: self.max_admissions });
        }
        // Instant + window must not overflow when computing the next expiry.
        if self.window.is_zero() || self.window >= Duration::from_secs(u64::MAX / 4) {
            return Err(ConfigError::InvalidWindow(self.window));
        }
        Ok(())
    }
}

/// Builder for [`GateConfig`].
#[derive(Debug, Clone, Default)]
pub struct GateConfigBuilder {
    window: Option<Duration>,
    max_admissions: Option<usize>,
}

impl GateConfigBuilder {
    /// Rolling window length. Required.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }

    /// Admission limit per window. Required.
    pub fn max_admissions(mut self, max: usize) -> Self {
        self.max_admissions = Some(max);
        self
    }

    /// Validate and build. Missing fields are reported as invalid zero values.
    pub fn build(self) -> Result<GateConfig, ConfigError> {
        GateConfig::new(self.window.unwrap_or(Duration::ZERO), self.max_admissions.unwrap_or(0))
    }
}

#[derive(Serialize, Deserialize)]
struct RawGateConfig {
    window_ms: u64,
    max_admissions: usize,
}

impl TryFrom<RawGateConfig> for GateConfig {
    type Error = ConfigError;

    fn try_from(raw: RawGateConfig) -> Result<Self, Self::Error> {
        GateConfig::new(Duration::from_millis(raw.window_ms), raw.max_admissions)
    }
}

impl From<GateConfig> for RawGateConfig {
    fn from(cfg: GateConfig) -> Self {
        Self {
            window_ms: u64::try_from(cfg.window.as_millis()).unwrap_or(u64::MAX),
            max_admissions: cfg.max_admissions,
        }
    }
}

/// Settings for [`HttpSender`](crate::sender::HttpSender).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderConfig {
    /// Absolute URL documents are POSTed to.
    pub endpoint: String,
    /// Whole-request timeout.
    #[serde(with = "duration_ms", rename = "timeout_ms")]
    pub timeout: Duration,
    /// Optional `User-Agent` header.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self { endpoint: DEFAULT_ENDPOINT.to_string(), timeout: DEFAULT_SEND_TIMEOUT, user_agent: None }
    }
}

impl SenderConfig {
    /// Config pointing at `endpoint`, other fields defaulted.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), ..Self::default() }
    }

    /// Defaults overridden by `DOCGATE_ENDPOINT` and `DOCGATE_TIMEOUT_MS` when set.
    ///
    /// An unparsable timeout is ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(endpoint) = lookup("DOCGATE_ENDPOINT").filter(|s| !s.trim().is_empty()) {
            cfg.endpoint = endpoint;
        }
        if let Some(raw) = lookup("DOCGATE_TIMEOUT_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => cfg.timeout = Duration::from_millis(ms),
                _ => tracing::warn!(value = %raw, "ignoring invalid DOCGATE_TIMEOUT_MS"),
            }
        }
        cfg
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
