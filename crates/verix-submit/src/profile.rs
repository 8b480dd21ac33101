//! # Retry Profiles
//!
//! `RetryProfile` bounds a submission session: how many attempts it may make
//! and how long it may wait between them. Profiles are immutable values;
//! the named presets are pre-filled instances.
//!
//! | Preset | max attempts | base delay | max delay |
//! |--------|--------------|------------|-----------|
//! | `default` | 3 | 2s | 300s |
//! | `production` | 5 | 5s | 600s |
//! | `fast-test` | 2 | 1s | 60s |

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Largest exponent applied to the base delay. `2^32 · base` already exceeds
/// any sane cap; clamping keeps the arithmetic finite.
const MAX_BACKOFF_EXPONENT: u32 = 32;

/// Lower bound of the multiplicative jitter factor.
pub const JITTER_MIN: f64 = 0.75;

/// Upper bound of the multiplicative jitter factor.
pub const JITTER_MAX: f64 = 1.25;

/// Invalid retry profile parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileError {
    /// `max_attempts` must be at least 1.
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    /// `base_delay_secs` must be finite and strictly positive.
    #[error("base_delay_secs must be finite and > 0, got {0}")]
    InvalidBaseDelay(f64),
    /// `max_delay_secs` must be finite and not below the base delay.
    #[error("max_delay_secs ({max}) must be finite and >= base_delay_secs ({base})")]
    InvalidMaxDelay {
        /// Requested base delay.
        base: f64,
        /// Requested max delay.
        max: f64,
    },
    /// `max_delay_secs` does not fit in a `Duration`.
    #[error("max_delay_secs ({0}) is too large to represent as a duration")]
    DelayOutOfRange(f64),
    /// No preset carries this name.
    #[error("unknown retry profile preset {0:?} (expected default, production or fast-test)")]
    UnknownPreset(String),
}

/// Attempt and delay bounds for one submission session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RetryProfileFields")]
pub struct RetryProfile {
    max_attempts: u32,
    base_delay_secs: f64,
    max_delay_secs: f64,
}

impl RetryProfile {
    /// Build a validated profile.
    ///
    /// # Errors
    ///
    /// Returns a [`ProfileError`] unless `max_attempts >= 1`,
    /// `base_delay_secs > 0` and `max_delay_secs >= base_delay_secs`, with
    /// both delays finite. The max delay must also be representable as a
    /// `Duration`; every computed wait is bounded by it.
    pub fn new(
        max_attempts: u32,
        base_delay_secs: f64,
        max_delay_secs: f64,
    ) -> Result<Self, ProfileError> {
        if max_attempts == 0 {
            return Err(ProfileError::ZeroAttempts);
        }
        if !base_delay_secs.is_finite() || base_delay_secs <= 0.0 {
            return Err(ProfileError::InvalidBaseDelay(base_delay_secs));
        }
        if !max_delay_secs.is_finite() || max_delay_secs < base_delay_secs {
            return Err(ProfileError::InvalidMaxDelay {
                base: base_delay_secs,
                max: max_delay_secs,
            });
        }
        if Duration::try_from_secs_f64(max_delay_secs).is_err() {
            return Err(ProfileError::DelayOutOfRange(max_delay_secs));
        }
        Ok(Self {
            max_attempts,
            base_delay_secs,
            max_delay_secs,
        })
    }

    /// `default` preset: 3 attempts, 2s base, 300s cap.
    pub const fn default_profile() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 2.0,
            max_delay_secs: 300.0,
        }
    }

    /// `production` preset: 5 attempts, 5s base, 600s cap.
    pub const fn production() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 5.0,
            max_delay_secs: 600.0,
        }
    }

    /// `fast-test` preset: 2 attempts, 1s base, 60s cap.
    pub const fn fast_test() -> Self {
        Self {
            max_attempts: 2,
            base_delay_secs: 1.0,
            max_delay_secs: 60.0,
        }
    }

    /// Look up a preset by name.
    pub fn from_preset_name(name: &str) -> Result<Self, ProfileError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::default_profile()),
            "production" => Ok(Self::production()),
            "fast-test" | "fast_test" => Ok(Self::fast_test()),
            other => Err(ProfileError::UnknownPreset(other.to_string())),
        }
    }

    /// Maximum number of attempts in a session (at least 1).
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Base delay in seconds.
    pub fn base_delay_secs(&self) -> f64 {
        self.base_delay_secs
    }

    /// Delay cap in seconds.
    pub fn max_delay_secs(&self) -> f64 {
        self.max_delay_secs
    }

    /// The delay cap as a `Duration`.
    pub fn max_delay(&self) -> Duration {
        Duration::from_secs_f64(self.max_delay_secs)
    }

    /// `min(base · 2^attempt, max)` in seconds.
    pub fn exponential_delay_secs(&self, attempt: u32) -> f64 {
        let exponent = attempt.min(MAX_BACKOFF_EXPONENT) as i32;
        (self.base_delay_secs * 2f64.powi(exponent)).min(self.max_delay_secs)
    }

    /// `min(base · 2^attempt, max)` as a `Duration`.
    pub fn exponential_delay(&self, attempt: u32) -> Duration {
        Duration::from_secs_f64(self.exponential_delay_secs(attempt))
    }

    /// Exponential delay scaled by a uniform factor in
    /// [`JITTER_MIN`, `JITTER_MAX`], capped at the max delay.
    pub fn jittered_delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let exponent = attempt.min(MAX_BACKOFF_EXPONENT) as i32;
        let raw = self.base_delay_secs * 2f64.powi(exponent);
        let factor = rng.gen_range(JITTER_MIN..=JITTER_MAX);
        Duration::from_secs_f64((raw * factor).min(self.max_delay_secs))
    }
}

/// Unvalidated wire form; deserialization goes through [`RetryProfile::new`].
#[derive(Deserialize)]
struct RetryProfileFields {
    max_attempts: u32,
    base_delay_secs: f64,
    max_delay_secs: f64,
}

impl TryFrom<RetryProfileFields> for RetryProfile {
    type Error = ProfileError;

    fn try_from(f: RetryProfileFields) -> Result<Self, Self::Error> {
        Self::new(f.max_attempts, f.base_delay_secs, f.max_delay_secs)
    }
}

impl Default for RetryProfile {
    fn default() -> Self {
        Self::default_profile()
    }
}
