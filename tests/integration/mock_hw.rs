//! Mock adapters for integration tests.
//!
//! Records every feedback intent and event so tests can assert on the full
//! history without a display, buzzer, or flash chip.  [`Rig`] wires them to
//! an [`AccessService`] and drives it with a manual clock.

use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use keyguard::app::commands::AppCommand;
use keyguard::app::events::AppEvent;
use keyguard::app::feedback::Feedback;
use keyguard::app::ports::{EventSink, FeedbackPort, InputPort, StorageError, StoragePort};
use keyguard::app::service::AccessService;
use keyguard::config::AccessConfig;
use keyguard::layout::STORE_SIZE;

// ── MemStore ──────────────────────────────────────────────────

/// Flat byte store that can simulate a power cut after N writes.
#[derive(Clone)]
pub struct MemStore {
    pub image: [u8; STORE_SIZE],
    /// Byte writes that changed the image.
    pub writes: usize,
    /// Writes after this many fail and are not applied.
    pub cut_after: Option<usize>,
}

#[allow(dead_code)]
impl MemStore {
    pub fn erased() -> Self {
        Self {
            image: [0xFF; STORE_SIZE],
            writes: 0,
            cut_after: None,
        }
    }

    /// Same image, fresh counters: what the next boot sees.
    pub fn power_cycle(&self) -> Self {
        Self {
            image: self.image,
            writes: 0,
            cut_after: None,
        }
    }
}

impl StoragePort for MemStore {
    fn read_byte(&self, addr: u16) -> Result<u8, StorageError> {
        self.image
            .get(addr as usize)
            .copied()
            .ok_or(StorageError::AddressOutOfRange(addr))
    }

    fn write_byte(&mut self, addr: u16, value: u8) -> Result<(), StorageError> {
        let slot = self
            .image
            .get_mut(addr as usize)
            .ok_or(StorageError::AddressOutOfRange(addr))?;
        if *slot == value {
            return Ok(());
        }
        if self.cut_after.is_some_and(|n| self.writes >= n) {
            return Err(StorageError::IoError);
        }
        *slot = value;
        self.writes += 1;
        Ok(())
    }
}

// ── ScriptedInput ─────────────────────────────────────────────

#[derive(Default)]
pub struct ScriptedInput {
    pub keys: VecDeque<u8>,
    pub confirm: bool,
}

impl InputPort for ScriptedInput {
    fn next_key(&mut self) -> Option<u8> {
        self.keys.pop_front()
    }

    fn confirm_asserted(&mut self) -> bool {
        self.confirm
    }
}

// ── RecordingUi ───────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingUi {
    pub shown: Vec<Feedback>,
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingUi {
    pub fn last_prompt(&self) -> Option<&'static str> {
        self.shown.iter().rev().find_map(|f| match f {
            Feedback::ShowPrompt(p) => Some(*p),
            _ => None,
        })
    }

    pub fn saw(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }

    pub fn clear(&mut self) {
        self.shown.clear();
        self.events.clear();
    }
}

impl FeedbackPort for RecordingUi {
    fn show(&mut self, feedback: &Feedback) {
        self.shown.push(feedback.clone());
    }
}

impl EventSink for RecordingUi {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── RecordingDelay ────────────────────────────────────────────

/// Records requested waits without sleeping.
#[derive(Default)]
pub struct RecordingDelay {
    pub total_ns: u64,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub const POLL_MS: u64 = 20;

/// A booted service plus its mock adapters and a manual clock.
pub struct Rig {
    pub app: AccessService,
    pub store: MemStore,
    pub input: ScriptedInput,
    pub ui: RecordingUi,
    pub delay: RecordingDelay,
    pub now: u64,
}

#[allow(dead_code)]
impl Rig {
    pub fn boot(store: MemStore) -> Self {
        Self::boot_with(store, AccessConfig::default(), false)
    }

    pub fn boot_with(store: MemStore, config: AccessConfig, confirm_held: bool) -> Self {
        let mut rig = Self {
            app: AccessService::new(config),
            store,
            input: ScriptedInput {
                keys: VecDeque::new(),
                confirm: confirm_held,
            },
            ui: RecordingUi::default(),
            delay: RecordingDelay::default(),
            now: 0,
        };
        rig.app
            .start(rig.now, &mut rig.store, &mut rig.input, &mut rig.ui);
        rig
    }

    /// One loop iteration, then advance the clock.
    pub fn poll(&mut self) {
        self.app.poll(
            self.now,
            &mut self.store,
            &mut self.input,
            &mut self.ui,
            &mut self.delay,
        );
        self.now += POLL_MS;
    }

    /// Poll until `ms` of clock time has passed.
    pub fn idle(&mut self, ms: u64) {
        let until = self.now + ms;
        while self.now < until {
            self.poll();
        }
    }

    pub fn press(&mut self, symbols: &[u8]) {
        for &s in symbols {
            self.input.keys.push_back(s);
            self.poll();
        }
    }

    /// Press and release confirm.
    pub fn confirm(&mut self) {
        self.input.confirm = true;
        self.poll();
        self.input.confirm = false;
        self.poll();
    }

    pub fn enter(&mut self, symbols: &[u8]) {
        self.press(symbols);
        self.confirm();
    }

    pub fn command(&mut self, cmd: AppCommand) {
        self.app
            .handle_command(cmd, self.now, &mut self.store, &mut self.ui, &mut self.delay);
    }

    /// Cut power: reboot on the same image with a fresh service.
    pub fn reboot(self) -> Self {
        let config = self.app.config().clone();
        Self::boot_with(self.store.power_cycle(), config, false)
    }
}
