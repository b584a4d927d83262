// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Test doubles for the flash driver and the board.

#![allow(dead_code)]

use std::collections::BTreeMap;

use sdfu_common::{digest_of, Board, Indicator, MemoryDriver, Md5Checksum, TransferMetadata};
use sdfu_common::START_TRANSFER_CMD;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Unlock,
    Lock,
    Erase(u32),
    Program(u32, u32),
}

/// Flash that records every call and keeps programmed bytes.
pub struct MockFlash {
    pub page_size: u32,
    pub unlocked: bool,
    pub ops: Vec<Op>,
    pub memory: BTreeMap<u32, u8>,
}

impl MockFlash {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            unlocked: false,
            ops: Vec::new(),
            memory: BTreeMap::new(),
        }
    }

    pub fn erases(&self) -> Vec<u32> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Erase(addr) => Some(*addr),
                _ => None,
            })
            .collect()
    }

    pub fn programs(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Op::Program(..)))
            .count()
    }

    pub fn read(&self, addr: u32, len: usize) -> Vec<u8> {
        (0..len as u32)
            .map(|i| *self.memory.get(&(addr + i)).unwrap_or(&0xFF))
            .collect()
    }
}

impl MemoryDriver for MockFlash {
    fn unlock(&mut self) {
        self.unlocked = true;
        self.ops.push(Op::Unlock);
    }

    fn lock(&mut self) {
        self.unlocked = false;
        self.ops.push(Op::Lock);
    }

    fn erase_page(&mut self, address: u32) {
        assert!(self.unlocked, "erase while locked");
        assert_eq!(address % self.page_size, 0);
        for offset in 0..self.page_size {
            self.memory.insert(address + offset, 0xFF);
        }
        self.ops.push(Op::Erase(address));
    }

    fn program_word(&mut self, address: u32, word: u32) {
        assert!(self.unlocked, "program while locked");
        assert_eq!(address % 4, 0);
        for (i, b) in word.to_le_bytes().iter().enumerate() {
            let cell = self.memory.get_mut(&(address + i as u32)).expect("page not erased");
            assert_eq!(*cell, 0xFF, "word programmed twice");
            *cell = *b;
        }
        self.ops.push(Op::Program(address, word));
    }
}

/// Board recording replies, indicator changes and resets.
#[derive(Default)]
pub struct MockBoard {
    pub replies: Vec<u8>,
    pub resets: usize,
    pub transfer_led: bool,
    pub block_led: bool,
}

impl MockBoard {
    pub fn take_replies(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.replies)
    }
}

impl Board for MockBoard {
    fn send(&mut self, byte: u8) {
        self.replies.push(byte);
    }

    fn indicate(&mut self, indicator: Indicator, on: bool) {
        match indicator {
            Indicator::Transfer => self.transfer_led = on,
            Indicator::Block => self.block_led = on,
        }
    }

    fn reset(&mut self) {
        self.resets += 1;
    }
}

/// Deterministic, non-repeating test image.
pub fn image(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + i / 251) as u8).collect()
}

pub fn header_for(image: &[u8]) -> TransferMetadata {
    TransferMetadata::new(image.len() as u32, digest_of(&mut Md5Checksum::new(), image))
}

/// Start command, header and image, as a sender puts them on the wire.
pub fn transfer_bytes(header: &TransferMetadata, image: &[u8]) -> Vec<u8> {
    let mut bytes = vec![START_TRANSFER_CMD];
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(image);
    bytes
}
