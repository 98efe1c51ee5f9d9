//! Concrete state handler functions and table builder.
//!
//! Each state is defined by three plain `fn` pointers: no closures, no
//! dynamic dispatch, no heap.  This is the classic embedded C FSM pattern
//! expressed in safe Rust.
//!
//! ```text
//!  PROVISIONING ──[saved]──▶ AWAITING_INPUT ──[3rd mismatch]──▶ LOCKED
//!        ▲                        ▲                               │
//!        │                        └────[expired, credential]──────┤
//!        └─────────────────────────────[expired, no credential]───┘
//! ```
//!
//! Handlers never touch storage.  Finalize outcomes arrive as a
//! [`Verdict`]; lockout start and backoff reset leave as
//! [`StorageRequests`](super::context::StorageRequests).

use super::context::{FsmContext, Verdict};
use super::{StateDescriptor, StateId};
use crate::app::events::AppEvent;
use crate::app::feedback::{
    Feedback, PROMPT_DENIED, PROMPT_ENTER, PROMPT_FULL, PROMPT_GRANTED, PROMPT_LOCKED,
    PROMPT_PROVISION, PROMPT_SAVE_FAILED, PROMPT_SAVED, PROMPT_TOO_SHORT, Tone,
};
use crate::lockout::LockoutTick;
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Provisioning
        StateDescriptor {
            id: StateId::Provisioning,
            name: "Provisioning",
            on_enter: Some(provisioning_enter),
            on_exit: None,
            on_update: provisioning_update,
        },
        // Index 1: AwaitingInput
        StateDescriptor {
            id: StateId::AwaitingInput,
            name: "AwaitingInput",
            on_enter: Some(awaiting_enter),
            on_exit: None,
            on_update: awaiting_update,
        },
        // Index 2: Locked
        StateDescriptor {
            id: StateId::Locked,
            name: "Locked",
            on_enter: Some(locked_enter),
            on_exit: Some(locked_exit),
            on_update: locked_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  Shared entry handling (Provisioning + AwaitingInput)
// ═══════════════════════════════════════════════════════════════════════════

/// Apply the inactivity window, then this tick's key and the mask window.
fn collect_entry(ctx: &mut FsmContext, idle_prompt: &'static str) {
    let now = ctx.now_ms;
    let mask_ms = ctx.config.mask_window_ms;

    // Checked before the key so a late key starts a fresh entry.  A confirm
    // this tick counts as activity: its verdict consumes the entry.
    if ctx.input.verdict.is_none() && ctx.entry.is_abandoned(now, ctx.config.inactivity_timeout_ms)
    {
        info!("entry: {} symbols abandoned, clearing", ctx.entry.len());
        ctx.entry.clear();
        ctx.show(Feedback::PlayTone(Tone::Reset));
        ctx.show(Feedback::ShowPrompt(idle_prompt));
        ctx.emit(AppEvent::EntryTimedOut);
    }

    if let Some(key) = ctx.input.key {
        if ctx.entry.push(key, now) {
            ctx.show(Feedback::PlayTone(Tone::Click));
            let text = ctx.entry.render(now, mask_ms);
            ctx.show(Feedback::ShowMaskedBuffer(text));
        } else {
            ctx.show(Feedback::PlayTone(Tone::Error));
            ctx.show(Feedback::ShowPrompt(PROMPT_FULL));
        }
    } else if ctx.entry.take_mask_expiry(now, mask_ms) {
        let text = ctx.entry.render(now, mask_ms);
        ctx.show(Feedback::ShowMaskedBuffer(text));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  PROVISIONING state: no credential stored yet
// ═══════════════════════════════════════════════════════════════════════════

fn provisioning_enter(ctx: &mut FsmContext) {
    ctx.entry.clear();
    ctx.prompt(PROMPT_PROVISION);
    info!("PROVISIONING: waiting for a new credential");
}

fn provisioning_update(ctx: &mut FsmContext) -> Option<StateId> {
    collect_entry(ctx, PROMPT_PROVISION);

    match ctx.input.verdict? {
        Verdict::Saved => {
            ctx.entry.clear();
            ctx.provisioned = true;
            ctx.show(Feedback::PlayTone(Tone::Success));
            ctx.show(Feedback::ShowPrompt(PROMPT_SAVED));
            Some(StateId::AwaitingInput)
        }
        Verdict::TooShort => {
            ctx.entry.clear();
            ctx.show(Feedback::PlayTone(Tone::Error));
            ctx.show(Feedback::ShowPrompt(PROMPT_TOO_SHORT));
            ctx.prompt(PROMPT_PROVISION);
            None
        }
        Verdict::SaveFailed => {
            ctx.entry.clear();
            ctx.show(Feedback::PlayTone(Tone::Error));
            ctx.show(Feedback::ShowPrompt(PROMPT_SAVE_FAILED));
            ctx.prompt(PROMPT_PROVISION);
            None
        }
        Verdict::Match | Verdict::Mismatch => {
            warn!("PROVISIONING: ignoring verification verdict");
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  AWAITING_INPUT state: credential stored, collecting a candidate
// ═══════════════════════════════════════════════════════════════════════════

fn awaiting_enter(ctx: &mut FsmContext) {
    ctx.entry.clear();
    ctx.prompt(PROMPT_ENTER);
    info!(
        "AWAITING_INPUT: ready ({} of {} attempts used)",
        ctx.attempts, ctx.config.max_attempts
    );
}

fn awaiting_update(ctx: &mut FsmContext) -> Option<StateId> {
    collect_entry(ctx, PROMPT_ENTER);

    match ctx.input.verdict? {
        Verdict::Match => {
            ctx.entry.clear();
            ctx.attempts = 0;
            ctx.requests.reset_backoff = true;
            ctx.show(Feedback::PlayTone(Tone::Success));
            ctx.show(Feedback::GrantAccess);
            ctx.show(Feedback::ShowPrompt(PROMPT_GRANTED));
            ctx.prompt(PROMPT_ENTER);
            ctx.emit(AppEvent::AccessGranted);
            None
        }
        Verdict::Mismatch => {
            ctx.entry.clear();
            ctx.attempts = ctx.attempts.saturating_add(1);
            ctx.show(Feedback::PlayTone(Tone::Error));
            ctx.show(Feedback::ShowPrompt(PROMPT_DENIED));
            ctx.emit(AppEvent::AccessDenied {
                attempts: ctx.attempts,
            });

            if ctx.attempts_exhausted() {
                warn!(
                    "AWAITING_INPUT: {} consecutive failures, locking",
                    ctx.attempts
                );
                ctx.requests.engage_lockout = true;
                return Some(StateId::Locked);
            }
            ctx.prompt(PROMPT_ENTER);
            None
        }
        Verdict::Saved | Verdict::TooShort | Verdict::SaveFailed => {
            warn!("AWAITING_INPUT: ignoring provisioning verdict");
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  LOCKED state: input ignored until the lockout engine releases
// ═══════════════════════════════════════════════════════════════════════════

fn locked_enter(ctx: &mut FsmContext) {
    ctx.entry.clear();
    ctx.countdown_secs = 0;
    ctx.prompt(PROMPT_LOCKED);
    info!("LOCKED: input disabled");
}

fn locked_exit(ctx: &mut FsmContext) {
    // One strike left after any lockout resolution.
    ctx.attempts = ctx.config.attempts_after_lockout();
    info!(
        "LOCKED: released, {} attempt(s) left",
        ctx.config.max_attempts.saturating_sub(ctx.attempts)
    );
}

fn locked_update(ctx: &mut FsmContext) -> Option<StateId> {
    let release = if ctx.provisioned {
        StateId::AwaitingInput
    } else {
        StateId::Provisioning
    };

    match ctx.input.lockout {
        LockoutTick::Running { remaining_ms } => {
            let secs = remaining_ms.div_ceil(1000);
            if secs != ctx.countdown_secs {
                ctx.countdown_secs = secs;
                ctx.show(Feedback::ShowCountdown(secs));
            }
            None
        }
        LockoutTick::Expired { .. } => Some(release),
        LockoutTick::Idle => {
            // Engine is not running a lockout; nothing to wait for.
            warn!("LOCKED: lockout engine idle, releasing");
            Some(release)
        }
    }
}
