// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Transfer header, also persisted to flash once an image has been verified.

use crate::checksum::DIGEST_LEN;
use crate::protocol::METADATA_MAGIC;

// --- TransferMetadata (repr(C), 24 bytes) ---

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferMetadata {
    pub magic: u32,               // METADATA_MAGIC
    pub size: u32,                // image length in bytes
    pub digest: [u8; DIGEST_LEN], // digest of the image bytes only
}

// Compile-time layout checks: the record is programmed word by word.
const _: () = assert!(core::mem::size_of::<TransferMetadata>() == TransferMetadata::SIZE);
const _: () = assert!(TransferMetadata::SIZE % 4 == 0);

impl TransferMetadata {
    /// Length of the header on the wire and in flash.
    pub const SIZE: usize = 4 + 4 + DIGEST_LEN;

    /// Header describing an image of `size` bytes with the given digest.
    pub const fn new(size: u32, digest: [u8; DIGEST_LEN]) -> Self {
        Self {
            magic: METADATA_MAGIC,
            size,
            digest,
        }
    }

    /// All-zero record, used before any header has been received.
    pub const fn empty() -> Self {
        Self {
            magic: 0,
            size: 0,
            digest: [0; DIGEST_LEN],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == METADATA_MAGIC
    }

    /// Decode a header from its little-endian wire form.
    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&bytes[8..]);
        Self {
            magic: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            size: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            digest,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.size.to_le_bytes());
        bytes[8..].copy_from_slice(&self.digest);
        bytes
    }

    /// The record as little-endian words, in programming order.
    pub fn words(&self) -> impl Iterator<Item = u32> {
        let bytes = self.to_bytes();
        (0..Self::SIZE / 4).map(move |i| {
            u32::from_le_bytes([
                bytes[i * 4],
                bytes[i * 4 + 1],
                bytes[i * 4 + 2],
                bytes[i * 4 + 3],
            ])
        })
    }

    /// Read a persisted record from memory-mapped flash via volatile reads.
    ///
    /// # Safety
    /// `addr` must point to a readable, 4-byte aligned region of at least
    /// [`Self::SIZE`] bytes.
    pub unsafe fn read_from(addr: u32) -> Self {
        let mut bytes = [0u8; Self::SIZE];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = ((addr as usize + i) as *const u8).read_volatile();
        }
        Self::from_bytes(&bytes)
    }
}

impl Default for TransferMetadata {
    fn default() -> Self {
        Self::empty()
    }
}
