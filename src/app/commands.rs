//! Inbound commands to the application service.
//!
//! These represent actions requested from outside the polling loop (a
//! service console, a host test harness) that the
//! [`AccessService`](super::service::AccessService) interprets exactly as if
//! they came from the keypad.

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Append one symbol to the pending entry.
    Key(u8),

    /// Finalize the pending entry.  Already debounced by the sender.
    Confirm,

    /// Wipe the stored credential and return to provisioning.
    /// A running lockout is not cleared.
    FactoryReset,
}
