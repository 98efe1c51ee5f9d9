//! Lockout engine: exponential backoff with crash-safe checkpoints.
//!
//! ```text
//!              engage (3rd failure)
//!   UNLOCKED ───────────────────────▶ LOCKED ──┐ tick: checkpoint
//!      ▲                                │  ◀───┘ every interval
//!      └──────── expiry: total *= 2 ────┘
//! ```
//!
//! ## Persistence
//!
//! While locked the engine re-writes the remaining time at most once per
//! checkpoint interval.  After a power cut, [`LockoutEngine::init`] finds the
//! active flag, restores the last checkpoint, and locks again immediately,
//! so a reboot can never shorten or erase a penalty.
//!
//! The penalty level (`total`) is persisted independently of the active
//! flag: it survives expiry and reboots and is only lowered by
//! [`LockoutEngine::reset_backoff`] after an authenticated success.
//!
//! Storage failures are logged and otherwise ignored.  The in-memory state
//! is always updated first, so a failing medium never unlocks the device
//! early within the current power cycle.

use log::{info, warn};

use crate::app::ports::{StorageError, StoragePort};
use crate::config::AccessConfig;
use crate::error::Corruption;
use crate::layout::{
    LOCKOUT_ACTIVE, LOCKOUT_ACTIVE_ADDR, LOCKOUT_INACTIVE, LOCKOUT_REMAINING_ADDR,
    LOCKOUT_TOTAL_ADDR,
};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Mirror of the persisted lockout record plus the checkpoint timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutState {
    pub active: bool,
    /// Remaining time written at the last checkpoint.  Only meaningful
    /// while `active`.
    pub remaining_at_checkpoint_ms: u32,
    /// Current penalty level: the duration of the next (or running) lockout.
    pub total_duration_ms: u32,
    /// Monotonic time of the last checkpoint write.
    pub checkpoint_ms: u64,
}

/// Result of one [`LockoutEngine::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutTick {
    /// Not locked.
    Idle,
    /// Still locked.
    Running { remaining_ms: u32 },
    /// Lockout ended on this tick.  The caller resets its attempt counter.
    Expired { next_duration_ms: u32 },
}

/// What [`LockoutEngine::init`] found in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boot {
    Unlocked,
    /// A lockout was in progress at power loss and is running again.
    Resumed { remaining_ms: u32, total_ms: u32 },
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct LockoutEngine {
    state: LockoutState,
    /// Monotonic time the current lockout (or resume) started.
    started_ms: u64,
    /// Length of the current lockout measured from `started_ms`.
    active_duration_ms: u32,
    base_ms: u32,
    max_ms: u32,
    checkpoint_interval_ms: u64,
}

impl LockoutEngine {
    pub fn new(config: &AccessConfig) -> Self {
        let base_ms = config.base_lockout_ms();
        Self {
            state: LockoutState {
                active: false,
                remaining_at_checkpoint_ms: 0,
                total_duration_ms: base_ms,
                checkpoint_ms: 0,
            },
            started_ms: 0,
            active_duration_ms: 0,
            base_ms,
            max_ms: config.max_lockout_ms(),
            checkpoint_interval_ms: config.checkpoint_interval_ms as u64,
        }
    }

    // ── Boot ──────────────────────────────────────────────────

    /// Restore persisted state.  Call once at boot before the first tick.
    ///
    /// Returns what was found plus any corruption that had to be clamped.
    /// An unreadable medium is treated as a corrupt active record: the
    /// device locks for the base duration rather than trusting nothing.
    pub fn init(&mut self, store: &mut impl StoragePort, now_ms: u64) -> (Boot, Option<Corruption>) {
        match self.read_persisted(store) {
            Ok((false, _, total)) => {
                if (self.base_ms..=self.max_ms).contains(&total) {
                    self.state.total_duration_ms = total;
                    return (Boot::Unlocked, None);
                }
                self.state.total_duration_ms = self.base_ms;
                persist("total", store.write_u32(LOCKOUT_TOTAL_ADDR, self.base_ms));
                // Factory flash reads all ones here; anything else is damage.
                if total == ERASED_U32 {
                    info!("lockout: initialising penalty level to {} ms", self.base_ms);
                    (Boot::Unlocked, None)
                } else {
                    warn!("lockout: implausible level {} ms, using {} ms", total, self.base_ms);
                    (Boot::Unlocked, Some(Corruption::LockoutTimer))
                }
            }
            Ok((true, remaining, total)) => self.resume(store, now_ms, remaining, total),
            Err(e) => {
                warn!("lockout: unreadable record ({}), assuming full penalty", e);
                let (boot, _) = self.resume(store, now_ms, 0, 0);
                (boot, Some(Corruption::LockoutTimer))
            }
        }
    }

    fn read_persisted(&self, store: &impl StoragePort) -> Result<(bool, u32, u32), StorageError> {
        let active = store.read_byte(LOCKOUT_ACTIVE_ADDR)? == LOCKOUT_ACTIVE;
        let remaining = store.read_u32(LOCKOUT_REMAINING_ADDR)?;
        let total = store.read_u32(LOCKOUT_TOTAL_ADDR)?;
        Ok((active, remaining, total))
    }

    fn resume(
        &mut self,
        store: &mut impl StoragePort,
        now_ms: u64,
        stored_remaining: u32,
        stored_total: u32,
    ) -> (Boot, Option<Corruption>) {
        let mut healed = None;

        let remaining = if stored_remaining == 0 || stored_remaining > self.max_ms {
            warn!(
                "lockout: implausible remaining {} ms, using {} ms",
                stored_remaining, self.base_ms
            );
            healed = Some(Corruption::LockoutTimer);
            self.base_ms
        } else {
            stored_remaining
        };

        let total = if stored_total < self.base_ms {
            healed = Some(Corruption::LockoutTimer);
            self.base_ms
        } else if stored_total > self.max_ms {
            healed = Some(Corruption::LockoutTimer);
            self.max_ms
        } else {
            stored_total
        };

        self.state = LockoutState {
            active: true,
            remaining_at_checkpoint_ms: remaining,
            total_duration_ms: total,
            checkpoint_ms: now_ms,
        };
        self.started_ms = now_ms;
        self.active_duration_ms = remaining;

        persist("remaining", store.write_u32(LOCKOUT_REMAINING_ADDR, remaining));
        persist("total", store.write_u32(LOCKOUT_TOTAL_ADDR, total));
        persist("active", store.write_byte(LOCKOUT_ACTIVE_ADDR, LOCKOUT_ACTIVE));

        info!(
            "lockout: resumed, {} ms remaining (level {} ms)",
            remaining, total
        );
        (
            Boot::Resumed {
                remaining_ms: remaining,
                total_ms: total,
            },
            healed,
        )
    }

    // ── Transitions ───────────────────────────────────────────

    /// Start a lockout at the current penalty level.  Returns its duration.
    pub fn engage(&mut self, store: &mut impl StoragePort, now_ms: u64) -> u32 {
        let total = self.state.total_duration_ms;
        self.state.active = true;
        self.state.remaining_at_checkpoint_ms = total;
        self.state.checkpoint_ms = now_ms;
        self.started_ms = now_ms;
        self.active_duration_ms = total;

        // Flag last: a set flag always has valid timing behind it.
        persist("remaining", store.write_u32(LOCKOUT_REMAINING_ADDR, total));
        persist("total", store.write_u32(LOCKOUT_TOTAL_ADDR, total));
        persist("active", store.write_byte(LOCKOUT_ACTIVE_ADDR, LOCKOUT_ACTIVE));

        info!("lockout: engaged for {} ms", total);
        total
    }

    /// Advance the timer.  Checkpoints at most once per interval and
    /// resolves the lockout when its duration has elapsed.
    pub fn tick(&mut self, store: &mut impl StoragePort, now_ms: u64) -> LockoutTick {
        if !self.state.active {
            return LockoutTick::Idle;
        }

        let elapsed = now_ms.saturating_sub(self.started_ms);
        if elapsed >= self.active_duration_ms as u64 {
            return self.expire(store);
        }

        let remaining = (self.active_duration_ms as u64 - elapsed) as u32;
        if now_ms.saturating_sub(self.state.checkpoint_ms) >= self.checkpoint_interval_ms {
            self.state.remaining_at_checkpoint_ms = remaining;
            self.state.checkpoint_ms = now_ms;
            persist("remaining", store.write_u32(LOCKOUT_REMAINING_ADDR, remaining));
            persist(
                "total",
                store.write_u32(LOCKOUT_TOTAL_ADDR, self.state.total_duration_ms),
            );
        }

        LockoutTick::Running {
            remaining_ms: remaining,
        }
    }

    fn expire(&mut self, store: &mut impl StoragePort) -> LockoutTick {
        let next = self.state.total_duration_ms.saturating_mul(2).min(self.max_ms);
        self.state.active = false;
        self.state.remaining_at_checkpoint_ms = 0;
        self.state.total_duration_ms = next;
        self.active_duration_ms = 0;

        persist("active", store.write_byte(LOCKOUT_ACTIVE_ADDR, LOCKOUT_INACTIVE));
        persist("total", store.write_u32(LOCKOUT_TOTAL_ADDR, next));

        info!("lockout: expired, next lockout {} ms", next);
        LockoutTick::Expired {
            next_duration_ms: next,
        }
    }

    /// Drop the penalty level back to base after an authenticated success
    /// and clear any leftover lockout record.
    pub fn reset_backoff(&mut self, store: &mut impl StoragePort) {
        if self.state.total_duration_ms != self.base_ms {
            info!(
                "lockout: backoff reset ({} ms -> {} ms)",
                self.state.total_duration_ms, self.base_ms
            );
        }
        self.state.active = false;
        self.state.remaining_at_checkpoint_ms = 0;
        self.state.total_duration_ms = self.base_ms;
        self.active_duration_ms = 0;

        persist("active", store.write_byte(LOCKOUT_ACTIVE_ADDR, LOCKOUT_INACTIVE));
        persist("remaining", store.write_u32(LOCKOUT_REMAINING_ADDR, 0));
        persist("total", store.write_u32(LOCKOUT_TOTAL_ADDR, self.base_ms));
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn state(&self) -> &LockoutState {
        &self.state
    }

    /// Duration the next lockout would last (or the running one's level).
    pub fn total_duration_ms(&self) -> u32 {
        self.state.total_duration_ms
    }

    /// Time left in the running lockout, `0` when unlocked.
    pub fn remaining_ms(&self, now_ms: u64) -> u32 {
        if !self.state.active {
            return 0;
        }
        let elapsed = now_ms.saturating_sub(self.started_ms);
        (self.active_duration_ms as u64).saturating_sub(elapsed) as u32
    }
}

const ERASED_U32: u32 = 0xFFFF_FFFF;

fn persist(what: &str, result: Result<(), StorageError>) {
    if let Err(e) = result {
        warn!("lockout: failed to persist {}: {}", what, e);
    }
}
