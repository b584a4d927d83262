// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Target addresses for image and metadata writes.

use crate::protocol::{APP_BASE, METADATA_ADDR};

/// Where an accepted transfer is written.
///
/// The state machine never checks an image's size against the space behind
/// `app_base`; the layout itself must leave room for the largest image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashLayout {
    /// First page of the application region.
    pub app_base: u32,
    /// Page holding the last accepted [`TransferMetadata`](crate::TransferMetadata).
    pub metadata_addr: u32,
}

impl FlashLayout {
    pub const fn new(app_base: u32, metadata_addr: u32) -> Self {
        Self {
            app_base,
            metadata_addr,
        }
    }

    /// Layout of the RP2040 reference board.
    pub const fn reference() -> Self {
        Self::new(APP_BASE, METADATA_ADDR)
    }

    pub fn is_page_aligned(&self, page_size: u32) -> bool {
        self.app_base % page_size == 0 && self.metadata_addr % page_size == 0
    }
}

impl Default for FlashLayout {
    fn default() -> Self {
        Self::reference()
    }
}
