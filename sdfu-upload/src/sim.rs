// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! In-process device: the bootloader state machine over simulated flash.

use std::collections::VecDeque;

use anyhow::{anyhow, Result};

use sdfu_common::{
    Board, DataTerminal, FlashLayout, Indicator, Md5Checksum, SimFlash, TransferError,
    TransferState,
};

use crate::sender::Link;

/// Board whose replies are queued for the sender to read back.
#[derive(Default)]
pub struct SimBoard {
    replies: VecDeque<u8>,
    resets: usize,
    indicators: Vec<(Indicator, bool)>,
}

impl Board for SimBoard {
    fn send(&mut self, byte: u8) {
        self.replies.push_back(byte);
    }

    fn indicate(&mut self, indicator: Indicator, on: bool) {
        self.indicators.push((indicator, on));
    }

    fn reset(&mut self) {
        self.resets += 1;
    }
}

/// [`Link`] delivering every written byte straight to a simulated device.
pub struct SimLink<const PAGE: usize> {
    terminal: DataTerminal<SimFlash, Md5Checksum, PAGE>,
    board: SimBoard,
    errors: Vec<TransferError>,
}

impl<const PAGE: usize> SimLink<PAGE> {
    pub fn new(layout: FlashLayout) -> Self {
        Self {
            terminal: DataTerminal::new(layout, SimFlash::new(PAGE as u32), Md5Checksum::new()),
            board: SimBoard::default(),
            errors: Vec::new(),
        }
    }

    pub fn flash(&self) -> &SimFlash {
        self.terminal.flash()
    }

    pub fn state(&self) -> TransferState {
        self.terminal.state()
    }

    pub fn resets(&self) -> usize {
        self.board.resets
    }

    pub fn pending_replies(&self) -> &VecDeque<u8> {
        &self.board.replies
    }

    /// Indicator changes in the order the device made them.
    pub fn indicators(&self) -> &[(Indicator, bool)] {
        &self.board.indicators
    }

    /// Aborts reported by the device so far.
    pub fn errors(&self) -> &[TransferError] {
        &self.errors
    }
}

impl<const PAGE: usize> Link for SimLink<PAGE> {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        for &byte in data {
            if let Err(e) = self.terminal.process_byte(byte, &mut self.board) {
                self.errors.push(e);
            }
        }
        Ok(())
    }

    fn read_reply(&mut self) -> Result<u8> {
        self.board
            .replies
            .pop_front()
            .ok_or_else(|| anyhow!("device sent no reply"))
    }
}
