//! Unified error types for the KeyGuard firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loop's error handling uniform.  All variants are `Copy` so they
//! pass through the service without allocation.

use core::fmt;

use crate::app::ports::StorageError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The persistent byte store rejected a read or write.
    Storage(StorageError),
    /// A credential candidate was rejected.
    Credential(CredentialError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Credential(e) => write!(f, "credential: {e}"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Credential errors
// ---------------------------------------------------------------------------

/// Recoverable rejections of a provisioning candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    /// Candidate is shorter than the configured minimum.
    TooShort { len: usize, min: usize },
    /// Candidate does not fit the persisted byte range.
    TooLong { len: usize },
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { len, min } => write!(f, "too short ({len} < {min})"),
            Self::TooLong { len } => write!(f, "too long ({len})"),
        }
    }
}

impl From<CredentialError> for Error {
    fn from(e: CredentialError) -> Self {
        Self::Credential(e)
    }
}

// ---------------------------------------------------------------------------
// Self-healed corruption
// ---------------------------------------------------------------------------

/// Inconsistent persisted state that was repaired in place.
///
/// Never returned as an error: the owning component degrades to a safe
/// default and the service reports it as an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corruption {
    /// Stored credential length out of range; the record was wiped.
    Credential,
    /// Stored lockout timing implausible; clamped to safe defaults.
    LockoutTimer,
}

impl fmt::Display for Corruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credential => write!(f, "corrupt credential record"),
            Self::LockoutTimer => write!(f, "corrupt lockout timer"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
