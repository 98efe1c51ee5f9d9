//! System configuration parameters
//!
//! All tunable parameters for the KeyGuard controller.
//! Values can be overridden via NVS (see [`ConfigPort`](crate::app::ports::ConfigPort)).

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::layout::MAX_CREDENTIAL_LEN;

/// Core access-control configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    // --- Credential ---
    /// Shortest credential accepted at provisioning
    pub min_credential_len: u8,
    /// Consecutive failures that trigger a lockout
    pub max_attempts: u8,

    // --- Lockout ---
    /// First lockout duration (seconds); also the floor after a success
    pub base_lockout_secs: u32,
    /// Ceiling for the doubling penalty and resume plausibility (seconds)
    pub max_lockout_secs: u32,
    /// Minimum spacing of checkpoint writes while locked (milliseconds)
    pub checkpoint_interval_ms: u32,

    // --- Entry ---
    /// Last symbol is shown unmasked for this long (milliseconds)
    pub mask_window_ms: u32,
    /// Pending entry is discarded after this much silence (milliseconds)
    pub inactivity_timeout_ms: u32,
    /// Confirm must stay asserted across this re-check delay (milliseconds)
    pub confirm_debounce_ms: u32,
    /// Result message hold before returning to the idle prompt (milliseconds)
    pub feedback_hold_ms: u32,

    // --- Timing ---
    /// Main loop poll interval (milliseconds)
    pub poll_interval_ms: u32,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            // Credential
            min_credential_len: 4,
            max_attempts: 3,

            // Lockout
            base_lockout_secs: 30,
            max_lockout_secs: 4000, // ~66 min
            checkpoint_interval_ms: 1000,

            // Entry
            mask_window_ms: 500,
            inactivity_timeout_ms: 8000,
            confirm_debounce_ms: 50,
            feedback_hold_ms: 1500,

            // Timing
            poll_interval_ms: 20, // 50 Hz
        }
    }
}

impl AccessConfig {
    pub fn base_lockout_ms(&self) -> u32 {
        self.base_lockout_secs.saturating_mul(1000)
    }

    pub fn max_lockout_ms(&self) -> u32 {
        self.max_lockout_secs.saturating_mul(1000)
    }

    /// Attempt counter value after a lockout resolves: one strike left.
    pub fn attempts_after_lockout(&self) -> u8 {
        self.max_attempts.saturating_sub(1)
    }

    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_CREDENTIAL_LEN as u8).contains(&self.min_credential_len) {
            return Err(ConfigError::ValidationFailed(
                "min_credential_len must be 1–16",
            ));
        }
        if !(1..=10).contains(&self.max_attempts) {
            return Err(ConfigError::ValidationFailed("max_attempts must be 1–10"));
        }
        if !(1..=3600).contains(&self.base_lockout_secs) {
            return Err(ConfigError::ValidationFailed(
                "base_lockout_secs must be 1–3600",
            ));
        }
        // Upper bound keeps the millisecond value inside a u32.
        if self.max_lockout_secs < self.base_lockout_secs || self.max_lockout_secs > 4_000_000 {
            return Err(ConfigError::ValidationFailed(
                "max_lockout_secs must be >= base_lockout_secs and <= 4000000",
            ));
        }
        if !(100..=60_000).contains(&self.checkpoint_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "checkpoint_interval_ms must be 100–60000",
            ));
        }
        if self.mask_window_ms >= self.inactivity_timeout_ms {
            return Err(ConfigError::ValidationFailed(
                "mask_window_ms must be < inactivity_timeout_ms",
            ));
        }
        if !(1..=500).contains(&self.confirm_debounce_ms) {
            return Err(ConfigError::ValidationFailed(
                "confirm_debounce_ms must be 1–500",
            ));
        }
        if self.feedback_hold_ms > 5000 {
            return Err(ConfigError::ValidationFailed(
                "feedback_hold_ms must be 0–5000",
            ));
        }
        if !(1..=1000).contains(&self.poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms must be 1–1000",
            ));
        }
        Ok(())
    }
}
