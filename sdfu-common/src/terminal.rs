// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Receive-side transfer state machine.
//!
//! A transfer on the wire:
//! - `START_TRANSFER_CMD`, answered by ACK
//! - a [`TransferMetadata`] header, answered by ACK once its magic checks out
//! - exactly `size` image bytes, with an ACK after every [`ACK_WINDOW`] bytes,
//!   one after a trailing partial page and one once the digest matches
//!
//! Image bytes are buffered a page at a time and programmed as each page
//! fills. On success the metadata is persisted and the device resets; any
//! protocol violation answers NACK and returns to [`TransferState::Waiting`].

use core::fmt;

use crate::checksum::Checksum;
use crate::layout::FlashLayout;
use crate::metadata::TransferMetadata;
use crate::nvm::MemoryDriver;
use crate::page::PageBuffer;
use crate::protocol::{ACK, ACK_WINDOW, NACK, START_TRANSFER_CMD};

/// Status outputs driven by the state machine. Both off means idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Indicator {
    /// A transfer has been opened and not yet finished or aborted.
    Transfer,
    /// Image bytes are being received.
    Block,
}

/// Device-side collaborators of the state machine.
pub trait Board {
    /// Transmit one reply byte.
    fn send(&mut self, byte: u8);

    fn indicate(&mut self, _indicator: Indicator, _on: bool) {}

    /// Restart the system. Does not return on hardware.
    fn reset(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferState {
    Waiting,
    ReceivingHeader,
    ReceivingBlock,
}

/// Protocol violation. The transfer has already been aborted with a NACK
/// by the time one is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError {
    /// Unexpected byte while waiting for a transfer to start.
    Framing(u8),
    /// Header with a bad magic; carries the magic received.
    Metadata(u32),
    /// Well-formed header announcing a zero-length image.
    EmptyImage,
    /// Image digest does not match the header.
    Integrity,
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Framing(byte) => write!(f, "unexpected byte 0x{byte:02x} outside a transfer"),
            Self::Metadata(magic) => write!(f, "rejected header (magic 0x{magic:08x})"),
            Self::EmptyImage => f.write_str("header announces an empty image"),
            Self::Integrity => f.write_str("image digest mismatch"),
        }
    }
}

/// The update protocol handler, one per device.
///
/// `PAGE` is the erase granularity of the target memory; both layout
/// addresses must be aligned to it.
pub struct DataTerminal<M, H, const PAGE: usize> {
    layout: FlashLayout,
    flash: M,
    checksum: H,
    state: TransferState,
    byte_count: u32,
    header: [u8; TransferMetadata::SIZE],
    metadata: TransferMetadata,
    page: PageBuffer<PAGE>,
    write_address: u32,
}

impl<M: MemoryDriver, H: Checksum, const PAGE: usize> DataTerminal<M, H, PAGE> {
    const PAGE_SIZE: u32 = PAGE as u32;

    pub fn new(layout: FlashLayout, flash: M, checksum: H) -> Self {
        assert!(
            layout.is_page_aligned(Self::PAGE_SIZE),
            "flash layout must be page aligned"
        );
        Self {
            layout,
            flash,
            checksum,
            state: TransferState::Waiting,
            byte_count: 0,
            header: [0; TransferMetadata::SIZE],
            metadata: TransferMetadata::empty(),
            page: PageBuffer::new(),
            write_address: layout.app_base,
        }
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Bytes of the current header or image received so far.
    pub fn bytes_received(&self) -> u32 {
        self.byte_count
    }

    pub fn write_address(&self) -> u32 {
        self.write_address
    }

    /// Last header accepted, or being received.
    pub fn metadata(&self) -> &TransferMetadata {
        &self.metadata
    }

    pub fn flash(&self) -> &M {
        &self.flash
    }

    /// Feed the next received byte, in arrival order.
    ///
    /// An `Err` reports a transfer that was just aborted; the NACK has been
    /// sent and the terminal is back in [`TransferState::Waiting`].
    pub fn process_byte(&mut self, byte: u8, board: &mut impl Board) -> Result<(), TransferError> {
        let result = match self.state {
            TransferState::Waiting => self.start_transfer(byte, board),
            TransferState::ReceivingHeader => self.receive_header(byte, board),
            TransferState::ReceivingBlock => self.receive_image(byte, board),
        };
        if result.is_err() {
            self.fail(board);
        }
        result
    }

    /// Abort whatever is in progress through the failure path.
    pub fn abort(&mut self, board: &mut impl Board) {
        self.fail(board);
    }

    fn start_transfer(&mut self, byte: u8, board: &mut impl Board) -> Result<(), TransferError> {
        if byte != START_TRANSFER_CMD {
            return Err(TransferError::Framing(byte));
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("Receiving metadata");
        self.state = TransferState::ReceivingHeader;
        self.byte_count = 0;
        board.indicate(Indicator::Transfer, true);
        board.send(ACK);
        Ok(())
    }

    fn receive_header(&mut self, byte: u8, board: &mut impl Board) -> Result<(), TransferError> {
        self.header[self.byte_count as usize] = byte;
        self.byte_count += 1;
        if self.byte_count as usize != TransferMetadata::SIZE {
            return Ok(());
        }

        self.metadata = TransferMetadata::from_bytes(&self.header);
        if !self.metadata.is_valid() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Bad metadata magic 0x{:08x}", self.metadata.magic);
            return Err(TransferError::Metadata(self.metadata.magic));
        }
        if self.metadata.size == 0 {
            #[cfg(feature = "defmt")]
            defmt::warn!("Header announces an empty image");
            return Err(TransferError::EmptyImage);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("Expecting {} bytes", self.metadata.size);
        self.state = TransferState::ReceivingBlock;
        self.byte_count = 0;
        self.write_address = self.layout.app_base;
        self.checksum.init();
        self.flash.unlock();
        board.send(ACK);
        Ok(())
    }

    fn receive_image(&mut self, byte: u8, board: &mut impl Board) -> Result<(), TransferError> {
        self.checksum.update(byte);
        if self.byte_count == 0 {
            board.indicate(Indicator::Block, true);
        }

        self.page.set(self.byte_count as usize % PAGE, byte);
        self.byte_count += 1;

        if self.byte_count % Self::PAGE_SIZE == 0 {
            self.flush_page();
        }

        if self.byte_count % ACK_WINDOW == 0 {
            #[cfg(feature = "defmt")]
            defmt::trace!("Window ACK at {}", self.byte_count);
            board.send(ACK);
        }

        if self.byte_count == self.metadata.size {
            return self.finish_transfer(board);
        }
        Ok(())
    }

    fn finish_transfer(&mut self, board: &mut impl Board) -> Result<(), TransferError> {
        if self.metadata.size % Self::PAGE_SIZE != 0 {
            self.flush_page();
            board.send(ACK);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("Received {} bytes", self.metadata.size);
        board.indicate(Indicator::Transfer, false);
        self.state = TransferState::Waiting;

        let digest = self.checksum.finalize();
        if digest != self.metadata.digest {
            #[cfg(feature = "defmt")]
            defmt::warn!("Digest mismatch");
            return Err(TransferError::Integrity);
        }

        #[cfg(feature = "defmt")]
        defmt::info!("Digest match, committing metadata");
        board.send(ACK);
        self.persist_metadata();
        self.flash.lock();
        self.byte_count = 0;
        board.reset();
        Ok(())
    }

    /// Shared failure path. Pages already programmed stay as they are.
    fn fail(&mut self, board: &mut impl Board) {
        self.byte_count = 0;
        self.state = TransferState::Waiting;
        board.indicate(Indicator::Transfer, false);
        board.indicate(Indicator::Block, false);
        self.flash.lock();
        board.send(NACK);
    }

    /// Erase the page at the write cursor, program the buffer into it and
    /// advance the cursor.
    fn flush_page(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::trace!("Writing flash page at 0x{:08x}", self.write_address);
        self.flash.erase_page(self.write_address);
        for (address, word) in (self.write_address..).step_by(4).zip(self.page.words()) {
            self.flash.program_word(address, word);
        }
        self.write_address = self.write_address.wrapping_add(Self::PAGE_SIZE);
        self.page.clear();
    }

    fn persist_metadata(&mut self) {
        let base = self.layout.metadata_addr;
        self.flash.erase_page(base);
        for (address, word) in (base..).step_by(4).zip(self.metadata.words()) {
            self.flash.program_word(address, word);
        }
    }
}
