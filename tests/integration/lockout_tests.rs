//! Lockout persistence: checkpoint wear, backoff escalation and reset,
//! and recovery from damaged or interrupted records.

use keyguard::app::commands::AppCommand;
use keyguard::app::events::AppEvent;
use keyguard::app::ports::StoragePort;
use keyguard::error::Corruption;
use keyguard::fsm::StateId;
use keyguard::layout::{
    LOCKOUT_ACTIVE, LOCKOUT_ACTIVE_ADDR, LOCKOUT_REMAINING_ADDR, LOCKOUT_TOTAL_ADDR,
};

use crate::mock_hw::{MemStore, Rig};

fn locked_rig() -> Rig {
    let mut rig = Rig::boot(MemStore::erased());
    rig.enter(b"1234");
    for wrong in [b"0000", b"1111", b"2222"] {
        rig.enter(wrong);
    }
    assert_eq!(rig.app.state(), StateId::Locked);
    rig
}

fn persisted_total(store: &MemStore) -> u32 {
    store.read_u32(LOCKOUT_TOTAL_ADDR).unwrap()
}

// ── Checkpointing ─────────────────────────────────────────────

#[test]
fn checkpoints_are_rate_limited() {
    let mut rig = locked_rig();
    rig.store.writes = 0;

    rig.idle(5_000);

    // At most one checkpoint per second, each at most one u32 of changed bytes.
    assert!(rig.store.writes > 0, "remaining time must be checkpointed");
    assert!(
        rig.store.writes <= 5 * 4,
        "{} byte writes in 5 s",
        rig.store.writes
    );
}

#[test]
fn checkpoint_tracks_remaining_time() {
    let mut rig = locked_rig();
    rig.idle(10_000);

    let stored = rig.store.read_u32(LOCKOUT_REMAINING_ADDR).unwrap();
    let live = rig.app.lockout_remaining_ms(rig.now);
    assert!(stored >= live);
    assert!(stored - live <= rig.app.config().checkpoint_interval_ms + 20);
}

#[test]
fn reboot_mid_lockout_resumes_from_checkpoint() {
    let mut rig = locked_rig();
    rig.idle(12_000);
    let stored = rig.store.read_u32(LOCKOUT_REMAINING_ADDR).unwrap();

    let rig = rig.reboot();
    assert_eq!(rig.app.state(), StateId::Locked);
    assert_eq!(rig.app.lockout_remaining_ms(0), stored);
    assert!(stored < 30_000);
}

// ── Backoff ───────────────────────────────────────────────────

#[test]
fn expiry_doubles_the_next_lockout() {
    let mut rig = locked_rig();
    rig.idle(30_100);

    assert_eq!(rig.app.state(), StateId::AwaitingInput);
    assert_eq!(rig.app.lockout_level_ms(), 60_000);
    assert_eq!(persisted_total(&rig.store), 60_000);
    assert_ne!(rig.store.read_byte(LOCKOUT_ACTIVE_ADDR).unwrap(), LOCKOUT_ACTIVE);
}

#[test]
fn escalated_level_survives_reboot() {
    let mut rig = locked_rig();
    rig.idle(30_100);

    let mut rig = rig.reboot();
    assert_eq!(rig.app.state(), StateId::AwaitingInput);
    assert_eq!(rig.app.lockout_level_ms(), 60_000);

    // Reboot restores a fresh streak, but the level still applies.
    for wrong in [b"0000", b"1111", b"2222"] {
        rig.enter(wrong);
    }
    assert!(rig.ui.saw(&AppEvent::LockoutEngaged { duration_ms: 60_000 }));
}

#[test]
fn success_resets_escalated_backoff() {
    let mut rig = locked_rig();
    rig.idle(30_100);
    assert_eq!(rig.app.lockout_level_ms(), 60_000);

    rig.enter(b"1234");
    assert!(rig.ui.saw(&AppEvent::AccessGranted));
    assert_eq!(rig.app.lockout_level_ms(), 30_000);
    assert_eq!(persisted_total(&rig.store), 30_000);
}

#[test]
fn level_saturates_at_maximum() {
    let mut store = MemStore::erased();
    let max_ms = keyguard::config::AccessConfig::default().max_lockout_ms();
    store.write_u32(LOCKOUT_TOTAL_ADDR, max_ms).unwrap();

    let mut rig = Rig::boot(store);
    rig.enter(b"1234");
    for wrong in [b"0000", b"1111", b"2222"] {
        rig.enter(wrong);
    }
    assert!(rig.ui.saw(&AppEvent::LockoutEngaged { duration_ms: max_ms }));

    // Jump the clock past the lockout instead of polling through an hour.
    rig.now += max_ms as u64;
    rig.poll();
    assert!(rig.ui.saw(&AppEvent::LockoutExpired {
        next_duration_ms: max_ms,
    }));
}

// ── Damaged records ───────────────────────────────────────────

#[test]
fn zero_remaining_resumes_at_base() {
    let mut store = MemStore::erased();
    store.write_u32(LOCKOUT_REMAINING_ADDR, 0).unwrap();
    store.write_u32(LOCKOUT_TOTAL_ADDR, 60_000).unwrap();
    store.write_byte(LOCKOUT_ACTIVE_ADDR, LOCKOUT_ACTIVE).unwrap();

    let rig = Rig::boot(store);
    assert_eq!(rig.app.state(), StateId::Locked);
    assert!(rig.ui.saw(&AppEvent::SelfHealed(Corruption::LockoutTimer)));
    assert!(rig.ui.saw(&AppEvent::LockoutResumed {
        remaining_ms: 30_000,
        total_ms: 60_000,
    }));
}

#[test]
fn implausible_level_is_clamped_on_resume() {
    let mut store = MemStore::erased();
    store.write_u32(LOCKOUT_REMAINING_ADDR, 5_000).unwrap();
    store.write_u32(LOCKOUT_TOTAL_ADDR, 10).unwrap();
    store.write_byte(LOCKOUT_ACTIVE_ADDR, LOCKOUT_ACTIVE).unwrap();

    let rig = Rig::boot(store);
    assert!(rig.ui.saw(&AppEvent::LockoutResumed {
        remaining_ms: 5_000,
        total_ms: 30_000,
    }));
    assert_eq!(persisted_total(&rig.store), 30_000);
}

#[test]
fn erased_flash_boots_unlocked_without_healing() {
    let rig = Rig::boot(MemStore::erased());
    assert_eq!(rig.app.state(), StateId::Provisioning);
    assert!(
        !rig.ui
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::SelfHealed(_)))
    );
    assert_eq!(persisted_total(&rig.store), 30_000);
}

#[test]
fn power_cut_during_engage_never_leaves_flag_without_timing() {
    // Cut power after each possible number of engage writes.
    for budget in 0..=9 {
        let mut rig = Rig::boot(MemStore::erased());
        rig.enter(b"1234");
        rig.enter(b"0000");
        rig.enter(b"1111");
        rig.store.cut_after = Some(rig.store.writes + budget);
        rig.enter(b"2222");

        let rig = rig.reboot();
        if rig.app.state() == StateId::Locked {
            let remaining = rig.app.lockout_remaining_ms(0);
            assert!(remaining > 0 && remaining <= 30_000, "budget {}", budget);
        }
    }
}

// ── Factory reset ─────────────────────────────────────────────

#[test]
fn factory_reset_does_not_lift_lockout() {
    let mut rig = locked_rig();
    rig.command(AppCommand::FactoryReset);

    assert!(rig.ui.saw(&AppEvent::FactoryReset));
    assert_eq!(rig.app.state(), StateId::Locked);
    assert!(!rig.app.is_provisioned());

    rig.idle(30_100);
    assert_eq!(rig.app.state(), StateId::Provisioning);
}

#[test]
fn reset_at_boot_while_locked_stays_locked() {
    let rig = locked_rig();
    let config = rig.app.config().clone();

    let mut rig = Rig::boot_with(rig.store.power_cycle(), config, true);
    assert!(rig.ui.saw(&AppEvent::FactoryReset));
    assert_eq!(rig.app.state(), StateId::Locked);

    rig.input.confirm = false;
    rig.idle(30_100);
    assert_eq!(rig.app.state(), StateId::Provisioning);
}
