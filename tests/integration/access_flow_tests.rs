//! End-to-end access scenarios: provision, grant, deny, lock, reboot,
//! resume, expire, and lock again at the doubled level.

use keyguard::app::commands::AppCommand;
use keyguard::app::events::AppEvent;
use keyguard::app::feedback::{
    Feedback, MaskedText, PROMPT_DENIED, PROMPT_ENTER, PROMPT_GRANTED, PROMPT_LOCKED,
};
use keyguard::app::ports::StoragePort;
use keyguard::fsm::StateId;
use keyguard::layout::LOCKOUT_REMAINING_ADDR;

use crate::mock_hw::{MemStore, Rig};

fn provisioned(pin: &[u8]) -> Rig {
    let mut rig = Rig::boot(MemStore::erased());
    rig.enter(pin);
    assert_eq!(rig.app.state(), StateId::AwaitingInput);
    rig.ui.clear();
    rig
}

fn lock_out(rig: &mut Rig) {
    for wrong in [b"0000", b"1111", b"2222"] {
        rig.enter(wrong);
    }
    assert_eq!(rig.app.state(), StateId::Locked);
}

// ── Happy path ────────────────────────────────────────────────

#[test]
fn correct_pin_grants_access() {
    let mut rig = provisioned(b"1234");
    rig.enter(b"1234");

    assert!(rig.ui.saw(&AppEvent::AccessGranted));
    assert!(rig.ui.shown.contains(&Feedback::GrantAccess));
    assert!(rig.ui.shown.contains(&Feedback::ShowPrompt(PROMPT_GRANTED)));
    assert_eq!(rig.ui.last_prompt(), Some(PROMPT_ENTER));
    assert_eq!(rig.app.attempts(), 0);
    assert_eq!(rig.app.state(), StateId::AwaitingInput);
}

#[test]
fn result_message_is_held_before_idle_prompt() {
    let mut rig = provisioned(b"1234");
    let before = rig.delay.total_ns;
    rig.enter(b"1234");

    let hold_ns = rig.app.config().feedback_hold_ms as u64 * 1_000_000;
    assert!(rig.delay.total_ns - before >= hold_ns);
}

#[test]
fn success_resets_failure_streak() {
    let mut rig = provisioned(b"1234");
    rig.enter(b"0000");
    rig.enter(b"1111");
    assert_eq!(rig.app.attempts(), 2);

    rig.enter(b"1234");
    assert_eq!(rig.app.attempts(), 0);

    // Two more failures must not lock: the streak started over.
    rig.enter(b"0000");
    rig.enter(b"1111");
    assert_eq!(rig.app.state(), StateId::AwaitingInput);
}

#[test]
fn wrong_length_is_a_mismatch() {
    let mut rig = provisioned(b"1234");
    rig.enter(b"12345");
    assert!(rig.ui.saw(&AppEvent::AccessDenied { attempts: 1 }));
    assert!(rig.ui.shown.contains(&Feedback::ShowPrompt(PROMPT_DENIED)));
}

// ── Lockout ───────────────────────────────────────────────────

#[test]
fn third_failure_locks_for_base_duration() {
    let mut rig = provisioned(b"1234");
    lock_out(&mut rig);

    assert!(rig.ui.saw(&AppEvent::LockoutEngaged { duration_ms: 30_000 }));
    assert!(rig.ui.shown.contains(&Feedback::ShowPrompt(PROMPT_LOCKED)));
    assert_eq!(rig.app.lockout_level_ms(), 30_000);

    rig.idle(100);
    assert!(rig.ui.shown.contains(&Feedback::ShowCountdown(30)));
}

#[test]
fn keys_during_lockout_are_discarded() {
    let mut rig = provisioned(b"1234");
    lock_out(&mut rig);

    rig.enter(b"1234");
    assert_eq!(rig.app.state(), StateId::Locked);
    assert!(!rig.ui.saw(&AppEvent::AccessGranted));

    rig.idle(30_100);
    assert_eq!(rig.app.state(), StateId::AwaitingInput);
    assert_eq!(rig.app.entry_len(), 0);
}

#[test]
fn countdown_runs_down_to_one() {
    let mut rig = provisioned(b"1234");
    lock_out(&mut rig);
    rig.idle(30_100);

    assert!(rig.ui.shown.contains(&Feedback::ShowCountdown(1)));
    assert!(!rig.ui.shown.contains(&Feedback::ShowCountdown(0)));
}

#[test]
fn full_access_scenario_with_power_loss() {
    // Provision and authenticate.
    let mut rig = provisioned(b"1234");
    rig.enter(b"1234");
    assert!(rig.ui.saw(&AppEvent::AccessGranted));
    assert_eq!(rig.app.attempts(), 0);

    // Three failures lock at base level.
    lock_out(&mut rig);
    assert_eq!(rig.app.lockout_level_ms(), 30_000);

    // Power is lost with 10 s left on the last checkpoint.
    rig.store.write_u32(LOCKOUT_REMAINING_ADDR, 10_000).unwrap();
    let mut rig = rig.reboot();
    assert_eq!(rig.app.state(), StateId::Locked);
    assert!(rig.ui.saw(&AppEvent::LockoutResumed {
        remaining_ms: 10_000,
        total_ms: 30_000,
    }));

    // Resumed lockout ends after the remaining time, not the full level.
    rig.idle(9_900);
    assert_eq!(rig.app.state(), StateId::Locked);
    rig.idle(200);
    assert_eq!(rig.app.state(), StateId::AwaitingInput);
    assert!(rig.ui.saw(&AppEvent::LockoutExpired {
        next_duration_ms: 60_000,
    }));
    assert_eq!(rig.app.attempts(), 2);

    // One strike left, and the next lockout is twice as long.
    rig.enter(b"9999");
    assert_eq!(rig.app.state(), StateId::Locked);
    assert!(rig.ui.saw(&AppEvent::LockoutEngaged { duration_ms: 60_000 }));
}

// ── Entry handling ────────────────────────────────────────────

#[test]
fn abandoned_entry_is_cleared() {
    let mut rig = provisioned(b"1234");
    rig.press(b"1");
    assert_eq!(rig.app.entry_len(), 1);

    let timeout = rig.app.config().inactivity_timeout_ms as u64;
    rig.idle(timeout + 100);

    assert!(rig.ui.saw(&AppEvent::EntryTimedOut));
    assert_eq!(rig.app.entry_len(), 0);
    assert_eq!(rig.ui.last_prompt(), Some(PROMPT_ENTER));
    assert_eq!(rig.app.attempts(), 0);
}

#[test]
fn key_after_inactivity_window_starts_new_entry() {
    let mut rig = provisioned(b"1234");
    let start = rig.now;
    rig.press(b"9");

    rig.now = start + 7_990;
    rig.poll();
    assert_eq!(rig.app.entry_len(), 1);

    rig.now = start + 8_010;
    rig.press(b"1");
    assert_eq!(rig.app.entry_len(), 1);
    assert!(rig.ui.saw(&AppEvent::EntryTimedOut));

    // The fresh entry is the real candidate.
    rig.press(b"234");
    rig.confirm();
    assert!(rig.ui.saw(&AppEvent::AccessGranted));
}

#[test]
fn late_key_command_starts_new_entry() {
    let mut rig = provisioned(b"1234");
    rig.command(AppCommand::Key(b'9'));

    rig.now += 8_010;
    rig.command(AppCommand::Key(b'1'));
    assert_eq!(rig.app.entry_len(), 1);
    assert!(rig.ui.saw(&AppEvent::EntryTimedOut));
}

#[test]
fn last_symbol_is_masked_after_window() {
    let mut rig = provisioned(b"1234");
    rig.press(b"12");

    let shown = |text: &str| Feedback::ShowMaskedBuffer(MaskedText::try_from(text).unwrap());
    assert!(rig.ui.shown.contains(&shown("1")));
    assert!(rig.ui.shown.contains(&shown("*2")));

    rig.idle(600);
    assert_eq!(rig.ui.shown.last(), Some(&shown("**")));
}

#[test]
fn empty_confirm_is_ignored() {
    let mut rig = provisioned(b"1234");
    rig.confirm();
    assert_eq!(rig.app.attempts(), 0);
    assert!(rig.ui.events.is_empty());
}

#[test]
fn held_confirm_finalizes_once() {
    let mut rig = provisioned(b"1234");
    rig.press(b"0000");
    rig.input.confirm = true;
    rig.idle(200);
    rig.input.confirm = false;
    rig.poll();

    assert_eq!(rig.app.attempts(), 1);
}
