//! Pending-entry buffer.
//!
//! Collects keypad symbols between confirms.  Tracks the time of the most
//! recent symbol so the controller can apply the masking window (last
//! symbol shown in clear for a short while) and the inactivity window
//! (abandoned entries are discarded).

use crate::app::feedback::{MASK_CHAR, MaskedText};
use crate::credential::Symbols;

#[derive(Debug, Clone, Default)]
pub struct EntryBuffer {
    symbols: Symbols,
    last_input_ms: u64,
    /// The last symbol is currently rendered in clear.
    revealed: bool,
}

impl EntryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one symbol.  Returns `false` (and leaves the buffer untouched)
    /// when the buffer is already full.
    pub fn push(&mut self, symbol: u8, now_ms: u64) -> bool {
        if self.symbols.push(symbol).is_err() {
            return false;
        }
        self.last_input_ms = now_ms;
        self.revealed = true;
        true
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
        self.revealed = false;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.symbols.is_full()
    }

    pub fn last_input_ms(&self) -> u64 {
        self.last_input_ms
    }

    /// Display form: every symbol masked except the most recent one while
    /// it is younger than `mask_window_ms`.
    pub fn render(&self, now_ms: u64, mask_window_ms: u32) -> MaskedText {
        let mut out = MaskedText::new();
        let in_window = now_ms.saturating_sub(self.last_input_ms) < mask_window_ms as u64;
        let last = self.symbols.len().saturating_sub(1);
        for (i, &s) in self.symbols.iter().enumerate() {
            let c = if in_window && i == last {
                char::from(s)
            } else {
                MASK_CHAR
            };
            // Capacity matches the buffer; symbols are single-byte ASCII.
            let _ = out.push(c);
        }
        out
    }

    /// `true` exactly once per symbol: when its masking window has just
    /// closed and the display needs a fully masked redraw.
    pub fn take_mask_expiry(&mut self, now_ms: u64, mask_window_ms: u32) -> bool {
        if self.revealed && now_ms.saturating_sub(self.last_input_ms) >= mask_window_ms as u64 {
            self.revealed = false;
            return true;
        }
        false
    }

    /// A non-empty entry untouched for at least `timeout_ms`.
    pub fn is_abandoned(&self, now_ms: u64, timeout_ms: u32) -> bool {
        !self.symbols.is_empty()
            && now_ms.saturating_sub(self.last_input_ms) >= timeout_ms as u64
    }
}
