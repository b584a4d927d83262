// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Common types and the transfer state machine for the serial DFU bootloader.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - Default: `no_std` mode for embedded targets
//! - `std` feature: Enables the in-memory flash simulator used by host tools and tests
//! - `embedded` feature: Enables embedded-hal helpers for board code
//! - `defmt` feature: Logs protocol events through defmt

#![cfg_attr(not(feature = "std"), no_std)]

pub mod checksum;
pub mod layout;
pub mod metadata;
pub mod nvm;
pub mod page;
pub mod protocol;
pub mod service;
pub mod terminal;

// Re-export commonly used types
pub use checksum::{digest_of, Checksum, Md5Checksum, DIGEST_LEN};
pub use layout::FlashLayout;
pub use metadata::TransferMetadata;
pub use nvm::MemoryDriver;
pub use page::PageBuffer;
pub use protocol::{ACK, ACK_WINDOW, METADATA_MAGIC, NACK, START_TRANSFER_CMD};
pub use protocol::{APP_BASE, FLASH_BASE, FLASH_PAGE_SIZE, FLASH_PROGRAM_SIZE, METADATA_ADDR};
pub use terminal::{Board, DataTerminal, Indicator, TransferError, TransferState};

#[cfg(feature = "std")]
pub use nvm::sim::{FlashOp, SimFlash};

// Embedded-specific exports (only with embedded feature)
#[cfg(feature = "embedded")]
use embedded_hal::delay::DelayNs;
#[cfg(feature = "embedded")]
use embedded_hal::digital::OutputPin;

/// Blink an LED a specified number of times.
#[cfg(feature = "embedded")]
pub fn blink(led: &mut impl OutputPin, timer: &mut impl DelayNs, count: u32, period_ms: u32) {
    for _ in 0..count {
        led.set_high().ok();
        timer.delay_ms(period_ms);
        led.set_low().ok();
        timer.delay_ms(period_ms);
    }
}
