// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Wire constants and flash layout of the reference board.
//!
//! The protocol is a raw byte stream: the sender opens a transfer with
//! [`START_TRANSFER_CMD`], sends a [`TransferMetadata`](crate::TransferMetadata)
//! header, then the image bytes. The device answers with single [`ACK`] or
//! [`NACK`] bytes.

// --- Wire bytes ---

/// Sender -> device: begin a transfer.
pub const START_TRANSFER_CMD: u8 = 0xA5;
/// Device -> sender: continue.
pub const ACK: u8 = 0x79;
/// Device -> sender: transfer aborted, resend from the start.
pub const NACK: u8 = 0x1F;

/// Sentinel opening every well-formed transfer header.
pub const METADATA_MAGIC: u32 = 0xB007_10AD;

/// The device acknowledges every `ACK_WINDOW` image bytes. The sender must
/// not go past a window boundary before that ACK arrives.
pub const ACK_WINDOW: u32 = 1024;

// --- Flash layout constants (RP2040 reference board) ---

pub const FLASH_BASE: u32 = 0x1000_0000;
pub const METADATA_ADDR: u32 = 0x1000_C000;
pub const APP_BASE: u32 = 0x1001_0000;

/// Erase granularity, and therefore the page size the state machine buffers.
pub const FLASH_PAGE_SIZE: u32 = 4096;
/// Program granularity of the QSPI flash ROM routines.
pub const FLASH_PROGRAM_SIZE: u32 = 256;

/// Number of ACKs a sender collects after the start command's ACK for a
/// successful transfer of `size` bytes.
///
/// One for the header, one per completed [`ACK_WINDOW`], one for a trailing
/// partial page and one for the verified image.
pub const fn expected_acks(size: u32, page_size: u32) -> u32 {
    let partial = if size % page_size != 0 { 1 } else { 0 };
    1 + size / ACK_WINDOW + partial + 1
}

const _: () = assert!(METADATA_ADDR % FLASH_PAGE_SIZE == 0);
const _: () = assert!(APP_BASE % FLASH_PAGE_SIZE == 0);
const _: () = assert!(FLASH_PAGE_SIZE % FLASH_PROGRAM_SIZE == 0);
