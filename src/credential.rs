//! Credential store.
//!
//! Owns the provisioning marker, the credential length, and the credential
//! symbols in the persistent byte store (see [`crate::layout`]).
//!
//! ## Crash safety
//!
//! The marker is the commit point.  `save` clears it before touching the
//! symbol range and sets it only after length and symbols are written, so a
//! power cut at any byte boundary leaves either the old complete record or
//! no record, never `provisioned` with partial bytes.
//!
//! ## Self-healing
//!
//! A recognised marker with an out-of-range length means the image is
//! corrupt.  `load` wipes the record back to factory state and reports
//! [`Corruption::Credential`] instead of comparing against garbage.

use core::fmt;

use log::{info, warn};

use crate::app::ports::StoragePort;
use crate::error::{Corruption, CredentialError, Result};
use crate::layout::{
    CLEARED, CREDENTIAL_ADDR, LENGTH_ADDR, MARKER_ADDR, MAX_CREDENTIAL_LEN, PROVISIONED_MARKER,
};

/// Fixed-capacity symbol buffer shared by candidates and records.
pub type Symbols = heapless::Vec<u8, MAX_CREDENTIAL_LEN>;

// ---------------------------------------------------------------------------
// CredentialRecord
// ---------------------------------------------------------------------------

/// In-memory view of the persisted credential.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialRecord {
    pub provisioned: bool,
    symbols: Symbols,
}

impl CredentialRecord {
    /// Factory state: nothing stored.
    pub fn unprovisioned() -> Self {
        Self::default()
    }

    fn provisioned(symbols: Symbols) -> Self {
        Self {
            provisioned: true,
            symbols,
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.symbols
    }

    /// Exact comparison: same length and every symbol equal.
    ///
    /// Symbols are folded without early exit so timing does not reveal the
    /// position of the first wrong digit.
    pub fn matches(&self, candidate: &[u8]) -> bool {
        if !self.provisioned || candidate.len() != self.symbols.len() {
            return false;
        }
        let diff = self
            .symbols
            .iter()
            .zip(candidate)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));
        diff == 0
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("provisioned", &self.provisioned)
            .field("len", &self.symbols.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// CredentialStore
// ---------------------------------------------------------------------------

/// Reads and writes the single device credential.
pub struct CredentialStore {
    min_len: usize,
}

impl CredentialStore {
    pub fn new(min_len: u8) -> Self {
        Self {
            min_len: min_len as usize,
        }
    }

    /// `true` iff the persisted marker equals the provisioned sentinel.
    pub fn is_provisioned(&self, store: &impl StoragePort) -> Result<bool> {
        Ok(store.read_byte(MARKER_ADDR)? == PROVISIONED_MARKER)
    }

    /// Read the stored credential.
    ///
    /// Returns the record plus the corruption that was repaired, if any.
    pub fn load(
        &self,
        store: &mut impl StoragePort,
    ) -> Result<(CredentialRecord, Option<Corruption>)> {
        if !self.is_provisioned(store)? {
            return Ok((CredentialRecord::unprovisioned(), None));
        }

        let len = store.read_byte(LENGTH_ADDR)? as usize;
        if len == 0 || len > MAX_CREDENTIAL_LEN {
            warn!("credential: stored length {} out of range, wiping", len);
            self.wipe(store)?;
            return Ok((CredentialRecord::unprovisioned(), Some(Corruption::Credential)));
        }

        let mut symbols = Symbols::new();
        for i in 0..len {
            // Capacity is MAX_CREDENTIAL_LEN and len was bounded above.
            let _ = symbols.push(store.read_byte(CREDENTIAL_ADDR + i as u16)?);
        }
        Ok((CredentialRecord::provisioned(symbols), None))
    }

    /// Persist `candidate` as the new credential, replacing any old one.
    pub fn save(
        &self,
        store: &mut impl StoragePort,
        candidate: &[u8],
    ) -> Result<CredentialRecord> {
        if candidate.len() < self.min_len {
            return Err(CredentialError::TooShort {
                len: candidate.len(),
                min: self.min_len,
            }
            .into());
        }
        let symbols = Symbols::from_slice(candidate)
            .map_err(|()| CredentialError::TooLong {
                len: candidate.len(),
            })?;

        // Uncommit first so an interrupted overwrite reads as "no record".
        store.write_byte(MARKER_ADDR, CLEARED)?;
        store.write_byte(LENGTH_ADDR, symbols.len() as u8)?;
        for i in 0..MAX_CREDENTIAL_LEN {
            let b = symbols.get(i).copied().unwrap_or(CLEARED);
            store.write_byte(CREDENTIAL_ADDR + i as u16, b)?;
        }
        store.write_byte(MARKER_ADDR, PROVISIONED_MARKER)?;

        info!("credential: stored {} symbols", symbols.len());
        Ok(CredentialRecord::provisioned(symbols))
    }

    /// Erase marker, length, and the full symbol range.
    pub fn wipe(&self, store: &mut impl StoragePort) -> Result<()> {
        store.write_byte(MARKER_ADDR, CLEARED)?;
        store.write_byte(LENGTH_ADDR, CLEARED)?;
        for i in 0..MAX_CREDENTIAL_LEN {
            store.write_byte(CREDENTIAL_ADDR + i as u16, CLEARED)?;
        }
        info!("credential: wiped");
        Ok(())
    }
}
