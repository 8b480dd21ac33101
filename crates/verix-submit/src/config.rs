//! Submission transport configuration.
//!
//! Loaded from the environment by hosts; tests build it directly. The
//! credential is not part of the configuration: it is passed per session.

use url::Url;

use crate::profile::{ProfileError, RetryProfile};

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where and how to reach the authority.
#[derive(Clone, PartialEq)]
pub struct SubmitConfig {
    /// Submission endpoint.
    pub endpoint: Url,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Retry bounds for sessions started with this configuration.
    pub retry_profile: RetryProfile,
}

impl std::fmt::Debug for SubmitConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut endpoint = self.endpoint.clone();
        if endpoint.password().is_some() {
            let _ = endpoint.set_password(Some("[REDACTED]"));
        }
        f.debug_struct("SubmitConfig")
            .field("endpoint", &endpoint.as_str())
            .field("timeout_secs", &self.timeout_secs)
            .field("retry_profile", &self.retry_profile)
            .finish()
    }
}

impl SubmitConfig {
    /// Configuration with the default timeout and retry profile.
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry_profile: RetryProfile::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `VERIX_ENDPOINT_URL` (required)
    /// - `VERIX_TIMEOUT_SECS` (default: 30)
    /// - `VERIX_RETRY_PROFILE` (`default`, `production` or `fast-test`; default: `default`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = lookup("VERIX_ENDPOINT_URL").ok_or(ConfigError::MissingEndpoint)?;
        let endpoint = Url::parse(raw.trim())
            .map_err(|e| ConfigError::InvalidUrl("VERIX_ENDPOINT_URL".to_string(), e.to_string()))?;

        let timeout_secs = match lookup("VERIX_TIMEOUT_SECS") {
            Some(s) => match s.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => return Err(ConfigError::InvalidTimeout(s)),
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        let retry_profile = match lookup("VERIX_RETRY_PROFILE") {
            Some(name) => RetryProfile::from_preset_name(&name)?,
            None => RetryProfile::default(),
        };

        Ok(Self {
            endpoint,
            timeout_secs,
            retry_profile,
        })
    }

    /// Configuration pointing at a local mock server (for testing).
    pub fn local_mock(port: u16) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(&format!("http://127.0.0.1:{port}/submit"))
            .map_err(|e| ConfigError::InvalidUrl("localhost".to_string(), e.to_string()))?;
        Ok(Self {
            endpoint,
            timeout_secs: 5,
            retry_profile: RetryProfile::fast_test(),
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("VERIX_ENDPOINT_URL environment variable is required")]
    MissingEndpoint,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("VERIX_TIMEOUT_SECS must be a positive integer, got {0:?}")]
    InvalidTimeout(String),
    #[error("retry profile: {0}")]
    Profile(#[from] ProfileError),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}
