// src/models/status_list.rs
//! Bit-indexed status storage.
//!
//! A [`StatusList`] records the binary status (e.g. revoked/active) of many
//! credentials, one bit per credential, in a plain byte buffer. Bit `i`
//! lives at byte `i / 8`, bit offset `i % 8`, least-significant-bit first
//! within a byte. The list grows one whole byte (8 bits) at a time and
//! never shrinks, so the bit count is always a multiple of 8.

use crate::errors::StatusError;

/// A fixed-granularity boolean array addressed by bit index.
///
/// Owns the raw byte buffer. Freshly added bytes are zeroed, so every bit
/// defaults to `false` until explicitly set; no resize ever clears a bit
/// that was already written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusList {
    /// Packed status bits, LSB-first within each byte.
    statuses: Vec<u8>,
}

impl StatusList {
    /// Creates an empty status list with zero bits.
    pub fn new() -> Self {
        StatusList { statuses: Vec::new() }
    }

    /// Adopts an already-decoded byte buffer as a status list.
    ///
    /// Used after [`crate::utils::codec::decode`] to rehydrate a stored
    /// list; the buffer is taken as-is.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        StatusList { statuses: bytes }
    }

    /// Number of addressable bits (always `byte length * 8`).
    pub fn bit_count(&self) -> usize {
        self.statuses.len() * 8
    }

    /// Raw packed bytes, for encoding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.statuses
    }

    /// Appends a new status slot and returns its index.
    ///
    /// Appends one fresh zero byte (8 new bits, all `false`) and writes
    /// `value` into the first of them. The returned index is
    /// `old byte count * 8`, so indices grow monotonically per list and
    /// are never reused.
    pub fn add_status(&mut self, value: bool) -> usize {
        let index = self.statuses.len() * 8;
        self.statuses.push(0);

        if value {
            // Index was just made addressable, cannot fail.
            let _ = self.set_status(index, true);
        }

        index
    }

    /// Sets or clears the status bit at `index`.
    ///
    /// # Errors
    /// Returns [`StatusError::IndexOutOfRange`] if `index` is not below
    /// [`Self::bit_count`]. All other bits in the touched byte are left
    /// unchanged.
    pub fn set_status(&mut self, index: usize, value: bool) -> Result<(), StatusError> {
        let byte_index = index / 8;
        let bit_index = index % 8;

        if byte_index >= self.statuses.len() {
            return Err(StatusError::IndexOutOfRange);
        }

        if value {
            self.statuses[byte_index] |= 1 << bit_index;
        } else {
            self.statuses[byte_index] &= !(1 << bit_index);
        }

        Ok(())
    }

    /// Reads the status bit at `index`.
    ///
    /// # Errors
    /// Returns [`StatusError::IndexOutOfRange`] under the same bounds rule
    /// as [`Self::set_status`].
    pub fn get_status(&self, index: usize) -> Result<bool, StatusError> {
        let byte_index = index / 8;
        let bit_index = index % 8;

        if byte_index >= self.statuses.len() {
            return Err(StatusError::IndexOutOfRange);
        }

        Ok(self.statuses[byte_index] & (1 << bit_index) != 0)
    }
}

impl Default for StatusList {
    fn default() -> Self {
        Self::new()
    }
}
