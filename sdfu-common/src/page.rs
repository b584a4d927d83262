// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Single-page accumulator batching received bytes into page writes.

/// One flash page worth of bytes.
///
/// Only the prefix written since the last flush is meaningful; the rest is
/// whatever the buffer held before (zeros after a [`clear`](Self::clear)).
pub struct PageBuffer<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> PageBuffer<N> {
    const WORD_ALIGNED: () = assert!(
        N % 4 == 0 && N > 0,
        "page size must be a non-zero multiple of 4"
    );

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::WORD_ALIGNED;
        Self { bytes: [0; N] }
    }

    /// Store `byte` at `offset`, which must be below `N`.
    pub fn set(&mut self, offset: usize, byte: u8) {
        self.bytes[offset] = byte;
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    /// Contents as little-endian words, in address order.
    pub fn words(&self) -> impl Iterator<Item = u32> + '_ {
        self.bytes
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
    }

    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }
}

impl<const N: usize> Default for PageBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
