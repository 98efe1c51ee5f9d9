//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AccessService (domain)
//! ```
//!
//! Driven adapters (byte store, clock, keypad, display/buzzer, event log)
//! implement these traits.  The [`AccessService`](super::service::AccessService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.
//!
//! ## Storage notes
//!
//! - **StoragePort** writes MUST be idempotent: writing the value already
//!   stored is a no-op on the medium.  The lockout engine relies on this to
//!   re-assert state every checkpoint without extra wear.
//! - **ConfigPort** implementations MUST validate before persisting.

use crate::config::AccessConfig;

use super::events::AppEvent;
use super::feedback::Feedback;

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ EEPROM / NVS image)
// ───────────────────────────────────────────────────────────────

/// Durable flat byte address space that survives power loss.
///
/// The address map lives in [`crate::layout`].
pub trait StoragePort {
    /// Read one byte.
    fn read_byte(&self, addr: u16) -> Result<u8, StorageError>;

    /// Write one byte.  Unchanged values are a no-op.
    fn write_byte(&mut self, addr: u16, value: u8) -> Result<(), StorageError>;

    /// Read a little-endian `u32` from four consecutive bytes.
    fn read_u32(&self, addr: u16) -> Result<u32, StorageError> {
        let mut buf = [0u8; 4];
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.read_byte(offset(addr, i)?)?;
        }
        Ok(u32::from_le_bytes(buf))
    }

    /// Write a little-endian `u32` to four consecutive bytes.
    fn write_u32(&mut self, addr: u16, value: u32) -> Result<(), StorageError> {
        for (i, b) in value.to_le_bytes().into_iter().enumerate() {
            self.write_byte(offset(addr, i)?, b)?;
        }
        Ok(())
    }
}

fn offset(addr: u16, i: usize) -> Result<u16, StorageError> {
    addr.checked_add(i as u16)
        .ok_or(StorageError::AddressOutOfRange(addr))
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists [`AccessConfig`].
///
/// Implementations MUST validate before persisting.  Invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], not silently clamped,
/// so a bad write can never disable the lockout.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`AccessConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<AccessConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &AccessConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time since boot.  Never wraps within the device lifetime.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Input port (driving adapter: keypad → domain)
// ───────────────────────────────────────────────────────────────

/// Keypad and confirm control.
pub trait InputPort {
    /// Next pending key symbol, one per physical press (no auto-repeat
    /// while held).  `None` when nothing new was pressed.
    fn next_key(&mut self) -> Option<u8>;

    /// Raw, undebounced level of the confirm control.
    fn confirm_asserted(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Feedback port (driven adapter: domain → display / buzzer / strike)
// ───────────────────────────────────────────────────────────────

/// Receives user-facing intents.  How they are rendered is the adapter's
/// business.
pub trait FeedbackPort {
    fn show(&mut self, feedback: &Feedback);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / audit)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Address lies outside the backing image.
    AddressOutOfRange(u16),
    /// Generic I/O error (flash commit failed, bus error).
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AddressOutOfRange(addr) => write!(f, "address {} out of range", addr),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
