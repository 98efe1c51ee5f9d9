//! Log-based event sink and feedback adapter.
//!
//! Implements [`EventSink`] and [`FeedbackPort`] by writing single-line
//! records to the ESP-IDF logger (UART / USB-CDC in production).  Boards
//! without a display run with this as their only user interface; a real
//! LCD or buzzer driver would implement [`FeedbackPort`] the same way.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::feedback::Feedback;
use crate::app::ports::{EventSink, FeedbackPort};

/// Adapter that logs every [`AppEvent`] and [`Feedback`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::FactoryReset => {
                warn!("RESET | credential wiped");
            }
            AppEvent::SelfHealed(corruption) => {
                warn!("HEAL  | {}", corruption);
            }
            AppEvent::Provisioned { len } => {
                info!("PROV  | credential stored, len={}", len);
            }
            AppEvent::AccessGranted => {
                info!("AUTH  | granted");
            }
            AppEvent::AccessDenied { attempts } => {
                warn!("AUTH  | denied, consecutive={}", attempts);
            }
            AppEvent::LockoutEngaged { duration_ms } => {
                warn!("LOCK  | engaged for {}s", duration_ms / 1000);
            }
            AppEvent::LockoutResumed {
                remaining_ms,
                total_ms,
            } => {
                warn!(
                    "LOCK  | resumed after power loss, {}s left (level {}s)",
                    remaining_ms / 1000,
                    total_ms / 1000
                );
            }
            AppEvent::LockoutExpired { next_duration_ms } => {
                info!("LOCK  | expired, next lockout {}s", next_duration_ms / 1000);
            }
            AppEvent::EntryTimedOut => {
                info!("ENTRY | timed out");
            }
        }
    }
}

impl FeedbackPort for LogEventSink {
    fn show(&mut self, feedback: &Feedback) {
        match feedback {
            Feedback::ShowPrompt(text) => info!("UI    | {}", text),
            Feedback::ShowMaskedBuffer(text) => info!("UI    | [{}]", text),
            Feedback::ShowCountdown(secs) => info!("UI    | locked {}s", secs),
            Feedback::PlayTone(tone) => info!("TONE  | {:?}", tone),
            Feedback::GrantAccess => info!("GRANT | strike pulsed"),
        }
    }
}
