//! Fuzz target: arbitrary command stream into `AccessService`
//!
//! Each input byte becomes one command (key, confirm, factory reset) or a
//! clock jump, verifying:
//! - No panics under any sequence
//! - The attempt counter never reaches the lockout limit outside `Locked`
//! - Keys never grow the pending entry past 16 symbols
//!
//! cargo fuzz run fuzz_command_stream

#![no_main]

use embedded_hal::delay::DelayNs;
use keyguard::adapters::nvs::NvsAdapter;
use keyguard::app::commands::AppCommand;
use keyguard::app::events::AppEvent;
use keyguard::app::feedback::Feedback;
use keyguard::app::ports::{EventSink, FeedbackPort, InputPort};
use keyguard::app::service::AccessService;
use keyguard::config::AccessConfig;
use keyguard::fsm::StateId;
use keyguard::layout::MAX_CREDENTIAL_LEN;
use libfuzzer_sys::fuzz_target;

struct Sink;

impl FeedbackPort for Sink {
    fn show(&mut self, _feedback: &Feedback) {}
}

impl EventSink for Sink {
    fn emit(&mut self, _event: &AppEvent) {}
}

struct Idle;

impl InputPort for Idle {
    fn next_key(&mut self) -> Option<u8> {
        None
    }

    fn confirm_asserted(&mut self) -> bool {
        false
    }
}

struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

fuzz_target!(|data: &[u8]| {
    let Ok(mut nvs) = NvsAdapter::new() else {
        return;
    };
    let config = AccessConfig::default();
    let mut app = AccessService::new(config.clone());
    let mut now = 0u64;
    app.start(now, &mut nvs, &mut Idle, &mut Sink);

    for &b in data {
        let cmd = match b % 16 {
            d @ 0..=9 => Some(AppCommand::Key(b'0' + d)),
            10 | 11 => Some(AppCommand::Confirm),
            12 => Some(AppCommand::FactoryReset),
            _ => None,
        };
        match cmd {
            Some(cmd) => app.handle_command(cmd, now, &mut nvs, &mut Sink, &mut NoDelay),
            None => {
                now += u64::from(b) * 250;
                app.poll(now, &mut nvs, &mut Idle, &mut Sink, &mut NoDelay);
            }
        }

        assert!(app.entry_len() <= MAX_CREDENTIAL_LEN);
        if app.state() != StateId::Locked {
            assert!(app.attempts() < config.max_attempts);
        }
    }
});
