//! Input drivers and peripheral helpers.

pub mod keypad;
pub mod watchdog;
