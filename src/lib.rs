//! KeyGuard firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod credential;
pub mod entry;
pub mod error;
pub mod fsm;
pub mod layout;
pub mod lockout;

// Adapters and drivers compile on the host too; the hardware-specific
// branches are guarded by cfg attributes inside.
pub mod adapters;
pub mod drivers;
