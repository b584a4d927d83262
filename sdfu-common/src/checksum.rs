// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Incremental image checksum.

use md5::{Digest, Md5};

/// Length of the digest carried in a transfer header.
pub const DIGEST_LEN: usize = 16;

/// Streaming hash folded over the image one byte at a time.
///
/// `finalize` is terminal: the instance must be [`init`](Self::init)-ed again
/// before it is reused.
pub trait Checksum {
    fn init(&mut self);
    fn update(&mut self, byte: u8);
    fn finalize(&mut self) -> [u8; DIGEST_LEN];
}

/// MD5, the digest senders put in the header.
#[derive(Clone, Default)]
pub struct Md5Checksum {
    hasher: Md5,
}

impl Md5Checksum {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Checksum for Md5Checksum {
    fn init(&mut self) {
        Digest::reset(&mut self.hasher);
    }

    fn update(&mut self, byte: u8) {
        Digest::update(&mut self.hasher, [byte]);
    }

    fn finalize(&mut self) -> [u8; DIGEST_LEN] {
        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(&self.hasher.finalize_reset());
        out
    }
}

/// Digest of a whole buffer, starting from a fresh state.
pub fn digest_of(checksum: &mut impl Checksum, data: &[u8]) -> [u8; DIGEST_LEN] {
    checksum.init();
    for &byte in data {
        checksum.update(byte);
    }
    checksum.finalize()
}
