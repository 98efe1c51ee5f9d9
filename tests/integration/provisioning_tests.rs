//! Provisioning flow: first-boot enrolment, length rules, interrupted
//! saves, and the confirm-held factory reset.

use keyguard::app::events::AppEvent;
use keyguard::app::feedback::{
    Feedback, PROMPT_FULL, PROMPT_PROVISION, PROMPT_SAVE_FAILED, PROMPT_SAVED, PROMPT_TOO_SHORT,
    Tone,
};
use keyguard::app::ports::StoragePort;
use keyguard::config::AccessConfig;
use keyguard::credential::CredentialStore;
use keyguard::fsm::StateId;
use keyguard::layout::{CLEARED, MARKER_ADDR, MAX_CREDENTIAL_LEN};

use crate::mock_hw::{MemStore, Rig};

#[test]
fn first_boot_prompts_for_new_pin() {
    let rig = Rig::boot(MemStore::erased());
    assert_eq!(rig.app.state(), StateId::Provisioning);
    assert!(!rig.app.is_provisioned());
    assert_eq!(rig.ui.last_prompt(), Some(PROMPT_PROVISION));
    assert!(rig.ui.saw(&AppEvent::Started(StateId::Provisioning)));
}

#[test]
fn provisioned_pin_survives_reboot() {
    let mut rig = Rig::boot(MemStore::erased());
    rig.enter(b"4321");
    assert!(rig.ui.saw(&AppEvent::Provisioned { len: 4 }));
    assert!(rig.ui.shown.contains(&Feedback::ShowPrompt(PROMPT_SAVED)));

    let mut rig = rig.reboot();
    assert_eq!(rig.app.state(), StateId::AwaitingInput);
    rig.enter(b"4321");
    assert!(rig.ui.saw(&AppEvent::AccessGranted));
}

#[test]
fn short_pin_is_rejected() {
    let mut rig = Rig::boot(MemStore::erased());
    rig.enter(b"12");

    assert_eq!(rig.app.state(), StateId::Provisioning);
    assert!(rig.ui.shown.contains(&Feedback::ShowPrompt(PROMPT_TOO_SHORT)));
    assert_eq!(rig.ui.last_prompt(), Some(PROMPT_PROVISION));
    assert_eq!(rig.app.entry_len(), 0);
    assert_eq!(rig.store.read_byte(MARKER_ADDR).unwrap(), 0xFF);
}

#[test]
fn min_length_follows_config() {
    let config = AccessConfig {
        min_credential_len: 6,
        ..Default::default()
    };
    let mut rig = Rig::boot_with(MemStore::erased(), config, false);
    rig.enter(b"12345");
    assert_eq!(rig.app.state(), StateId::Provisioning);
    rig.enter(b"123456");
    assert_eq!(rig.app.state(), StateId::AwaitingInput);
}

#[test]
fn seventeenth_symbol_is_refused() {
    let mut rig = Rig::boot(MemStore::erased());
    rig.press(b"12345678901234567");

    assert_eq!(rig.app.entry_len(), MAX_CREDENTIAL_LEN);
    assert!(rig.ui.shown.contains(&Feedback::PlayTone(Tone::Error)));
    assert_eq!(rig.ui.last_prompt(), Some(PROMPT_FULL));

    rig.confirm();
    assert!(rig.ui.saw(&AppEvent::Provisioned {
        len: MAX_CREDENTIAL_LEN
    }));
}

#[test]
fn interrupted_save_leaves_no_record() {
    let mut rig = Rig::boot(MemStore::erased());
    rig.press(b"5678");
    rig.store.cut_after = Some(rig.store.writes + 5);
    rig.confirm();

    assert!(rig.ui.shown.contains(&Feedback::ShowPrompt(PROMPT_SAVE_FAILED)));
    assert_eq!(rig.app.state(), StateId::Provisioning);

    let rig = rig.reboot();
    assert_eq!(rig.app.state(), StateId::Provisioning);
}

#[test]
fn confirm_held_at_boot_wipes_credential() {
    let mut store = MemStore::erased();
    CredentialStore::new(4).save(&mut store, b"1234").unwrap();

    let mut rig = Rig::boot_with(store, AccessConfig::default(), true);
    assert!(rig.ui.saw(&AppEvent::FactoryReset));
    assert!(rig.ui.shown.contains(&Feedback::PlayTone(Tone::Reset)));
    assert_eq!(rig.app.state(), StateId::Provisioning);
    assert_eq!(rig.store.read_byte(MARKER_ADDR).unwrap(), CLEARED);

    // The held press is not also taken as a confirm.
    rig.idle(200);
    assert!(!rig.ui.shown.contains(&Feedback::ShowPrompt(PROMPT_TOO_SHORT)));

    rig.input.confirm = false;
    rig.enter(b"8888");
    assert!(rig.ui.saw(&AppEvent::Provisioned { len: 4 }));
}

#[test]
fn corrupt_length_is_healed_to_provisioning() {
    let mut store = MemStore::erased();
    CredentialStore::new(4).save(&mut store, b"1234").unwrap();
    store.write_byte(keyguard::layout::LENGTH_ADDR, 40).unwrap();

    let rig = Rig::boot(store);
    assert_eq!(rig.app.state(), StateId::Provisioning);
    assert!(rig.ui.saw(&AppEvent::SelfHealed(
        keyguard::error::Corruption::Credential
    )));
}
