//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to.  It contains the per-tick input snapshot, the pending entry,
//! the attempt counter, and the outputs (feedback intents, storage
//! requests, events) that the application service applies after each tick.
//! Think of it as the "blackboard" in a blackboard architecture.

use log::warn;

use crate::app::events::AppEvent;
use crate::app::feedback::Feedback;
use crate::config::AccessConfig;
use crate::entry::EntryBuffer;
use crate::lockout::LockoutTick;

/// Outbox capacity.  One tick produces at most a handful of intents.
pub const OUTBOX_CAPACITY: usize = 8;

// ---------------------------------------------------------------------------
// Inputs (written by the service before each tick)
// ---------------------------------------------------------------------------

/// Outcome of a confirmed entry, resolved by the service against storage
/// before the FSM sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Candidate equals the stored credential.
    Match,
    Mismatch,
    /// New credential persisted.
    Saved,
    /// Candidate below the minimum length; nothing written.
    TooShort,
    /// Storage refused the write.
    SaveFailed,
}

/// Everything that happened since the previous tick.
#[derive(Debug, Clone, Copy)]
pub struct TickInput {
    /// Key accepted by the input driver this iteration.
    pub key: Option<u8>,
    /// Finalize outcome, present only on the confirm iteration.
    pub verdict: Option<Verdict>,
    /// Lockout engine status for this iteration.
    pub lockout: LockoutTick,
}

impl Default for TickInput {
    fn default() -> Self {
        Self {
            key: None,
            verdict: None,
            lockout: LockoutTick::Idle,
        }
    }
}

// ---------------------------------------------------------------------------
// Requests (written by state handlers; consumed by the service)
// ---------------------------------------------------------------------------

/// Side effects on persistent state that handlers ask the service to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageRequests {
    /// Start a lockout at the current penalty level.
    pub engage_lockout: bool,
    /// Authenticated success: drop the penalty level back to base.
    pub reset_backoff: bool,
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Timing --
    /// Monotonic time of the current loop iteration.
    pub now_ms: u64,

    // -- Inputs --
    pub input: TickInput,
    /// A stored credential exists.
    pub provisioned: bool,

    // -- Entry --
    pub entry: EntryBuffer,
    /// Consecutive failures since the last success or lockout resolution.
    pub attempts: u8,
    /// Whole seconds last shown on the countdown.
    pub countdown_secs: u32,

    // -- Outputs --
    /// Feedback intents to flush this iteration, in order.
    pub outbox: heapless::Vec<Feedback, OUTBOX_CAPACITY>,
    /// Prompt shown once the feedback hold has elapsed.
    pub prompt_after_hold: Option<&'static str>,
    pub requests: StorageRequests,
    pub events: heapless::Vec<AppEvent, 4>,

    // -- Configuration --
    pub config: AccessConfig,
}

impl FsmContext {
    /// Create a new context with the given configuration.
    pub fn new(config: AccessConfig) -> Self {
        Self {
            now_ms: 0,
            input: TickInput::default(),
            provisioned: false,
            entry: EntryBuffer::new(),
            attempts: 0,
            countdown_secs: 0,
            outbox: heapless::Vec::new(),
            prompt_after_hold: None,
            requests: StorageRequests::default(),
            events: heapless::Vec::new(),
            config,
        }
    }

    /// Reset per-tick inputs and set the iteration time.
    pub fn begin_tick(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
        self.input = TickInput::default();
    }

    /// Queue a feedback intent.
    pub fn show(&mut self, feedback: Feedback) {
        if let Err(dropped) = self.outbox.push(feedback) {
            warn!("FSM: feedback outbox full, dropping {:?}", dropped);
        }
    }

    /// Show `prompt` now, or after the feedback hold if something else is
    /// already queued for display this iteration.
    pub fn prompt(&mut self, prompt: &'static str) {
        if self.outbox.is_empty() {
            self.show(Feedback::ShowPrompt(prompt));
        } else {
            self.prompt_after_hold = Some(prompt);
        }
    }

    pub fn emit(&mut self, event: AppEvent) {
        if let Err(dropped) = self.events.push(event) {
            warn!("FSM: event queue full, dropping {:?}", dropped);
        }
    }

    /// The failure limit has been reached.
    pub fn attempts_exhausted(&self) -> bool {
        self.attempts >= self.config.max_attempts
    }
}
