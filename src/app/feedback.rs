//! User-facing feedback intents.
//!
//! The core says *what* the user should see or hear; the
//! [`FeedbackPort`](super::ports::FeedbackPort) adapter decides how (LCD,
//! OLED, piezo, relay).

use crate::layout::MAX_CREDENTIAL_LEN;

/// Text rendered for the pending entry, one character per symbol.
pub type MaskedText = heapless::String<MAX_CREDENTIAL_LEN>;

/// Character that replaces a hidden symbol.
pub const MASK_CHAR: char = '*';

// Prompt texts.
pub const PROMPT_ENTER: &str = "Enter PIN";
pub const PROMPT_PROVISION: &str = "Set new PIN";
pub const PROMPT_TOO_SHORT: &str = "PIN too short";
pub const PROMPT_SAVED: &str = "PIN saved";
pub const PROMPT_SAVE_FAILED: &str = "Save failed";
pub const PROMPT_GRANTED: &str = "Access granted";
pub const PROMPT_DENIED: &str = "Access denied";
pub const PROMPT_LOCKED: &str = "Locked";
pub const PROMPT_FULL: &str = "Max length";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Key accepted.
    Click,
    Success,
    Error,
    /// Entry discarded (inactivity or factory reset).
    Reset,
}

/// One display / audio / output intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    ShowPrompt(&'static str),
    ShowMaskedBuffer(MaskedText),
    /// Whole seconds left in the current lockout.
    ShowCountdown(u32),
    PlayTone(Tone),
    /// Pulse the door strike / "access granted" output.
    GrantAccess,
}
