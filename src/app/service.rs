//! Application service, the hexagonal core.
//!
//! [`AccessService`] owns the FSM, its shared context, the credential
//! store, and the lockout engine.  It exposes a hardware-agnostic API;
//! all I/O flows through port traits injected at call sites, making the
//! entire service testable with mock adapters.
//!
//! ```text
//!  InputPort ───▶ ┌──────────────────────────┐ ──▶ FeedbackPort
//!                 │      AccessService       │
//!  StoragePort ◀─▶│  FSM · Credential · Lock │ ──▶ EventSink
//!                 └──────────────────────────┘
//! ```
//!
//! One [`poll`](AccessService::poll) per loop iteration.  The caller reads
//! the clock once and passes the reading in; every decision in that
//! iteration uses it.

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use crate::config::AccessConfig;
use crate::credential::{CredentialRecord, CredentialStore};
use crate::error::{CredentialError, Error};
use crate::fsm::context::{FsmContext, Verdict};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::lockout::{Boot, LockoutEngine, LockoutTick};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::feedback::{Feedback, Tone};
use super::ports::{EventSink, FeedbackPort, InputPort, StoragePort};

// ───────────────────────────────────────────────────────────────
// AccessService
// ───────────────────────────────────────────────────────────────

/// The authentication controller.
pub struct AccessService {
    fsm: Fsm,
    ctx: FsmContext,
    credentials: CredentialStore,
    lockout: LockoutEngine,
    /// Cached copy of the stored credential.
    record: CredentialRecord,
    /// Confirm was accepted and has not been released since.
    confirm_latched: bool,
}

impl AccessService {
    /// Construct the service from configuration.
    ///
    /// Does **not** touch storage; call [`start`](Self::start) next.
    pub fn new(config: AccessConfig) -> Self {
        let credentials = CredentialStore::new(config.min_credential_len);
        let lockout = LockoutEngine::new(&config);
        Self {
            fsm: Fsm::new(build_state_table(), StateId::Provisioning),
            ctx: FsmContext::new(config),
            credentials,
            lockout,
            record: CredentialRecord::unprovisioned(),
            confirm_latched: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Boot sequence: factory-reset check, credential load, lockout resume,
    /// then enter the initial state.
    pub fn start(
        &mut self,
        now_ms: u64,
        store: &mut impl StoragePort,
        input: &mut impl InputPort,
        ui: &mut (impl FeedbackPort + EventSink),
    ) {
        self.ctx.now_ms = now_ms;

        // 1. Confirm held at power-on wipes the credential.
        if input.confirm_asserted() {
            // The press that asked for the reset must not also finalize.
            self.confirm_latched = true;
            self.factory_reset(store, ui);
        }

        // 2. Credential, self-healing a corrupt record.
        match self.credentials.load(store) {
            Ok((record, healed)) => {
                if let Some(c) = healed {
                    ui.emit(&AppEvent::SelfHealed(c));
                }
                self.ctx.provisioned = record.provisioned;
                self.record = record;
            }
            Err(e) => {
                // Fail closed: nothing will match until the store reads again.
                error!("credential load failed: {}", e);
                self.ctx.provisioned = true;
                self.record = CredentialRecord::unprovisioned();
            }
        }

        // 3. Lockout state, resuming a penalty interrupted by power loss.
        let (boot, healed) = self.lockout.init(store, now_ms);
        if let Some(c) = healed {
            ui.emit(&AppEvent::SelfHealed(c));
        }
        if let Boot::Resumed {
            remaining_ms,
            total_ms,
        } = boot
        {
            ui.emit(&AppEvent::LockoutResumed {
                remaining_ms,
                total_ms,
            });
        }

        // 4. Initial state.
        let initial = if self.lockout.is_active() {
            StateId::Locked
        } else if self.ctx.provisioned {
            StateId::AwaitingInput
        } else {
            StateId::Provisioning
        };
        self.fsm = Fsm::new(build_state_table(), initial);
        self.fsm.start(&mut self.ctx);
        ui.emit(&AppEvent::Started(initial));
        info!("AccessService started in {:?}", initial);

        if let Some(prompt) = self.drain(ui) {
            ui.show(&Feedback::ShowPrompt(prompt));
        }
    }

    // ── Per-iteration orchestration ───────────────────────────

    /// Run one loop iteration: lockout timer → input → finalize → FSM →
    /// storage requests → feedback.
    pub fn poll(
        &mut self,
        now_ms: u64,
        store: &mut impl StoragePort,
        input: &mut impl InputPort,
        ui: &mut (impl FeedbackPort + EventSink),
        delay: &mut impl DelayNs,
    ) {
        self.ctx.begin_tick(now_ms);

        // 1. Lockout timer (checkpoint / expiry)
        let tick = self.lockout.tick(store, now_ms);
        if let LockoutTick::Expired { next_duration_ms } = tick {
            ui.emit(&AppEvent::LockoutExpired { next_duration_ms });
        }
        self.ctx.input.lockout = tick;

        // 2. Input.  Keys are drained even while locked so a press made
        //    during the lockout does not surface afterwards.
        let accepts = self.fsm.current_state().accepts_input();
        let key = input.next_key();
        if accepts {
            self.ctx.input.key = key;
        }

        // 3. Confirm.  A key this iteration defers the check to the next.
        if key.is_none() && self.confirm_pressed(input, delay) && accepts {
            self.ctx.input.verdict = self.finalize(store);
        }

        self.step(store, ui, delay);
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an injected command exactly as if it came from the keypad.
    /// Commands are ignored while locked, except for factory reset.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u64,
        store: &mut impl StoragePort,
        ui: &mut (impl FeedbackPort + EventSink),
        delay: &mut impl DelayNs,
    ) {
        let accepts = self.fsm.current_state().accepts_input();
        match cmd {
            AppCommand::Key(symbol) if accepts => {
                self.ctx.begin_tick(now_ms);
                self.ctx.input.key = Some(symbol);
                self.step(store, ui, delay);
            }
            AppCommand::Confirm if accepts => {
                self.ctx.begin_tick(now_ms);
                self.ctx.input.verdict = self.finalize(store);
                self.step(store, ui, delay);
            }
            AppCommand::Key(_) | AppCommand::Confirm => {
                info!("command {:?} ignored while locked", cmd);
            }
            AppCommand::FactoryReset => {
                self.ctx.now_ms = now_ms;
                self.factory_reset(store, ui);
                let prev = self.fsm.current_state();
                if prev != StateId::Locked {
                    self.fsm.force_transition(StateId::Provisioning, &mut self.ctx);
                    if prev != StateId::Provisioning {
                        ui.emit(&AppEvent::StateChanged {
                            from: prev,
                            to: StateId::Provisioning,
                        });
                    }
                }
                if let Some(prompt) = self.drain(ui) {
                    ui.show(&Feedback::ShowPrompt(prompt));
                }
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Consecutive failures counted toward the next lockout.
    pub fn attempts(&self) -> u8 {
        self.ctx.attempts
    }

    pub fn is_provisioned(&self) -> bool {
        self.ctx.provisioned
    }

    /// Symbols currently pending.
    pub fn entry_len(&self) -> usize {
        self.ctx.entry.len()
    }

    /// Duration of the next (or running) lockout.
    pub fn lockout_level_ms(&self) -> u32 {
        self.lockout.total_duration_ms()
    }

    /// Time left in the running lockout, `0` when not locked.
    pub fn lockout_remaining_ms(&self, now_ms: u64) -> u32 {
        self.lockout.remaining_ms(now_ms)
    }

    pub fn config(&self) -> &AccessConfig {
        &self.ctx.config
    }

    // ── Internal ──────────────────────────────────────────────

    /// Edge-triggered, debounced confirm: `true` once per press.
    fn confirm_pressed(&mut self, input: &mut impl InputPort, delay: &mut impl DelayNs) -> bool {
        if !input.confirm_asserted() {
            self.confirm_latched = false;
            return false;
        }
        if self.confirm_latched {
            return false;
        }
        delay.delay_ms(self.ctx.config.confirm_debounce_ms);
        if !input.confirm_asserted() {
            return false;
        }
        self.confirm_latched = true;
        true
    }

    /// Resolve the pending entry against storage.
    fn finalize(&mut self, store: &mut impl StoragePort) -> Option<Verdict> {
        match self.fsm.current_state() {
            StateId::Provisioning => {
                match self.credentials.save(store, self.ctx.entry.as_slice()) {
                    Ok(record) => {
                        self.ctx.emit(AppEvent::Provisioned { len: record.len() });
                        self.record = record;
                        Some(Verdict::Saved)
                    }
                    Err(Error::Credential(CredentialError::TooShort { len, min })) => {
                        info!("provisioning rejected: {} of {} symbols", len, min);
                        Some(Verdict::TooShort)
                    }
                    Err(e) => {
                        warn!("provisioning failed: {}", e);
                        Some(Verdict::SaveFailed)
                    }
                }
            }
            // An empty entry is not a candidate.
            StateId::AwaitingInput if self.ctx.entry.is_empty() => None,
            StateId::AwaitingInput => {
                if self.record.matches(self.ctx.entry.as_slice()) {
                    Some(Verdict::Match)
                } else {
                    Some(Verdict::Mismatch)
                }
            }
            StateId::Locked => None,
        }
    }

    /// FSM tick plus everything it asked for.
    fn step(
        &mut self,
        store: &mut impl StoragePort,
        ui: &mut (impl FeedbackPort + EventSink),
        delay: &mut impl DelayNs,
    ) {
        let prev_state = self.fsm.current_state();

        self.fsm.tick(&mut self.ctx);

        let requests = core::mem::take(&mut self.ctx.requests);
        if requests.reset_backoff {
            self.lockout.reset_backoff(store);
        }
        if requests.engage_lockout {
            let duration_ms = self.lockout.engage(store, self.ctx.now_ms);
            self.ctx.emit(AppEvent::LockoutEngaged { duration_ms });
        }

        let new_state = self.fsm.current_state();
        if new_state != prev_state {
            self.ctx.emit(AppEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }

        if let Some(prompt) = self.drain(ui) {
            delay.delay_ms(self.ctx.config.feedback_hold_ms);
            ui.show(&Feedback::ShowPrompt(prompt));
        }
    }

    /// Flush queued events and feedback.  Returns the prompt that should
    /// follow once the feedback hold has elapsed.
    fn drain(&mut self, ui: &mut (impl FeedbackPort + EventSink)) -> Option<&'static str> {
        for event in self.ctx.events.iter() {
            ui.emit(event);
        }
        self.ctx.events.clear();
        for fb in self.ctx.outbox.iter() {
            ui.show(fb);
        }
        self.ctx.outbox.clear();
        self.ctx.prompt_after_hold.take()
    }

    /// Wipe the credential only.  A running or escalated lockout survives.
    fn factory_reset(&mut self, store: &mut impl StoragePort, ui: &mut (impl FeedbackPort + EventSink)) {
        warn!("factory reset: wiping credential");
        if let Err(e) = self.credentials.wipe(store) {
            error!("factory reset: wipe failed: {}", e);
        }
        self.record = CredentialRecord::unprovisioned();
        self.ctx.provisioned = false;
        self.ctx.attempts = 0;
        ui.emit(&AppEvent::FactoryReset);
        ui.show(&Feedback::PlayTone(Tone::Reset));
    }
}
