//! Scanned key-matrix driver with a separate confirm button.
//!
//! ## Hardware
//!
//! Rows are push-pull outputs idling high; columns are inputs with
//! pull-ups.  A scan drives one row low at a time and reads every column:
//! a low column means the key at (row, column) is down.  The confirm
//! button is an active-low momentary switch on its own input.
//!
//! ## Debounce
//!
//! A scan result must repeat on two consecutive polls before it counts.
//! A key is reported once when it goes down; holding it does not repeat.
//! The confirm level is reported raw; the application service debounces
//! it with a re-check delay.

use embedded_hal::digital::{InputPin, OutputPin};
use log::warn;

use crate::app::ports::InputPort;

/// Standard 4x3 telephone layout.
pub const PHONE_KEYMAP: [[u8; 3]; 4] = [
    [b'1', b'2', b'3'],
    [b'4', b'5', b'6'],
    [b'7', b'8', b'9'],
    [b'*', b'0', b'#'],
];

pub struct Keypad<R, C, B, const ROWS: usize, const COLS: usize> {
    rows: [R; ROWS],
    cols: [C; COLS],
    confirm: B,
    keymap: [[u8; COLS]; ROWS],
    /// Result of the previous scan.
    last_scan: Option<u8>,
    /// Key already reported and not yet released.
    held: Option<u8>,
}

impl<R, C, B, const ROWS: usize, const COLS: usize> Keypad<R, C, B, ROWS, COLS>
where
    R: OutputPin,
    C: InputPin,
    B: InputPin,
{
    pub fn new(mut rows: [R; ROWS], cols: [C; COLS], confirm: B, keymap: [[u8; COLS]; ROWS]) -> Self {
        for row in rows.iter_mut() {
            if row.set_high().is_err() {
                warn!("keypad: failed to idle row high");
            }
        }
        Self {
            rows,
            cols,
            confirm,
            keymap,
            last_scan: None,
            held: None,
        }
    }

    /// One pass over the matrix.  Returns the first key found down.
    fn scan(&mut self) -> Option<u8> {
        let mut found = None;
        for (r, row) in self.rows.iter_mut().enumerate() {
            if row.set_low().is_err() {
                continue;
            }
            for (c, col) in self.cols.iter_mut().enumerate() {
                if found.is_none() && col.is_low().unwrap_or(false) {
                    found = Some(self.keymap[r][c]);
                }
            }
            // A row left low would ghost keys onto the next row's read.
            if row.set_high().is_err() {
                warn!("keypad: failed to release row {}", r);
            }
        }
        found
    }
}

impl<R, C, B, const ROWS: usize, const COLS: usize> InputPort for Keypad<R, C, B, ROWS, COLS>
where
    R: OutputPin,
    C: InputPin,
    B: InputPin,
{
    fn next_key(&mut self) -> Option<u8> {
        let scan = self.scan();
        if scan != self.last_scan {
            self.last_scan = scan;
            return None;
        }
        if scan == self.held {
            return None;
        }
        self.held = scan;
        scan
    }

    fn confirm_asserted(&mut self) -> bool {
        self.confirm.is_low().unwrap_or(false)
    }
}
