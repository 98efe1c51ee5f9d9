//! Persistent address map for the KeyGuard byte store.
//!
//! Single source of truth: the credential store and the lockout engine
//! reference this module rather than hard-coding addresses.  The map is
//! frozen: devices in the field carry images written with these offsets.
//!
//! ```text
//!  0      1      2 ............ 17   20       25 ... 28   30 ... 33
//! ┌──────┬──────┬─────────────────┬──────┬────────────┬────────────┐
//! │marker│ len  │ credential[16]  │active│ remaining  │   total    │
//! └──────┴──────┴─────────────────┴──────┴────────────┴────────────┘
//! ```

// ---------------------------------------------------------------------------
// Credential record
// ---------------------------------------------------------------------------

/// Provisioning marker byte.
pub const MARKER_ADDR: u16 = 0;
/// Stored credential length (1..=16).
pub const LENGTH_ADDR: u16 = 1;
/// First byte of the credential symbol range.
pub const CREDENTIAL_ADDR: u16 = 2;

/// Maximum credential length, fixed by the size of the byte range above.
pub const MAX_CREDENTIAL_LEN: usize = 16;

/// Marker value meaning "a complete credential is stored".
pub const PROVISIONED_MARKER: u8 = 0xA5;
/// Neutral value written by a wipe.
pub const CLEARED: u8 = 0x00;

// ---------------------------------------------------------------------------
// Lockout checkpoint
// ---------------------------------------------------------------------------

/// Lockout-active flag.
pub const LOCKOUT_ACTIVE_ADDR: u16 = 20;
/// Remaining lockout time at the last checkpoint (u32 LE, milliseconds).
pub const LOCKOUT_REMAINING_ADDR: u16 = 25;
/// Current penalty level (u32 LE, milliseconds).
pub const LOCKOUT_TOTAL_ADDR: u16 = 30;

/// Only this exact byte reads as "lockout active"; erased flash (`0xFF`)
/// and anything else read as inactive.
pub const LOCKOUT_ACTIVE: u8 = 0x01;
pub const LOCKOUT_INACTIVE: u8 = 0x00;

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

/// Size of the byte image backing the address space.
pub const STORE_SIZE: usize = 64;
