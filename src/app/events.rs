//! Outbound application events.
//!
//! The [`AccessService`](super::service::AccessService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial or append to an
//! audit trail.

use crate::error::Corruption;
use crate::fsm::StateId;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The application service has started (carries initial state).
    Started(StateId),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// Confirm was held at boot; the credential was wiped.
    FactoryReset,

    /// Persisted state was inconsistent and has been repaired.
    SelfHealed(Corruption),

    /// A new credential of `len` symbols was stored.
    Provisioned { len: usize },

    /// Candidate matched the stored credential.
    AccessGranted,

    /// Candidate did not match; `attempts` consecutive failures so far.
    AccessDenied { attempts: u8 },

    /// A fresh lockout started.
    LockoutEngaged { duration_ms: u32 },

    /// A persisted lockout was resumed at boot.
    LockoutResumed { remaining_ms: u32, total_ms: u32 },

    /// The lockout ran out; the next one will last `next_duration_ms`.
    LockoutExpired { next_duration_ms: u32 },

    /// Pending entry discarded after inactivity.
    EntryTimedOut,
}
